//! Access manager: filter construction, decision resolution and limits
//! building for catalog resources.

use std::sync::Arc;

use tracing::{debug, info};

use geogate_rule_model::{AccessInfo, CatalogMode, Principal, RequestContext, RuleFilter};
use geogate_rule_reader::{CachedRuleReader, RuleBackend, RuleCache, RuleReader};

use crate::catalog::{CatalogResource, ResourceCatalog};
use crate::config::AccessConfig;
use crate::errors::AccessError;
use crate::geometry::{DefaultGeometryAdapter, GeometryAdapter};
use crate::limits::{build_access_limits, AccessLimits};
use crate::predicate::Predicate;

/// Workspace-level permissions. Finer per-workspace rules are
/// intentionally not consulted on this path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkspaceAccess {
    pub catalog_mode: CatalogMode,
    pub readable: bool,
    pub writable: bool,
}

/// Front door of the engine: resolves access limits for catalog
/// resources. Principal and request context are explicit arguments on
/// every call; the manager keeps no per-request state.
pub struct AccessManager {
    pub(crate) reader: Arc<dyn RuleReader>,
    pub(crate) catalog: Arc<dyn ResourceCatalog>,
    pub(crate) geometry: Arc<dyn GeometryAdapter>,
    pub(crate) config: AccessConfig,
}

impl AccessManager {
    pub fn new(
        reader: Arc<dyn RuleReader>,
        catalog: Arc<dyn ResourceCatalog>,
        geometry: Arc<dyn GeometryAdapter>,
        config: AccessConfig,
    ) -> Self {
        info!(instance = %config.instance_name, "initializing the geogate access manager");
        Self {
            reader,
            catalog,
            geometry,
            config,
        }
    }

    /// Wire a manager from a rule backend, using the configured cache TTL
    /// and capacity and the bundled geometry adapter.
    pub fn from_backend(
        backend: Arc<dyn RuleBackend>,
        catalog: Arc<dyn ResourceCatalog>,
        config: AccessConfig,
    ) -> Self {
        let cache = RuleCache::with_ttl(backend, config.cache_ttl(), config.cache_capacity);
        Self::new(
            Arc::new(CachedRuleReader::new(cache)),
            catalog,
            Arc::new(DefaultGeometryAdapter),
            config,
        )
    }

    pub fn config(&self) -> &AccessConfig {
        &self.config
    }

    pub fn is_admin(&self, principal: &Principal) -> bool {
        principal.is_admin(&self.config.admin_roles)
    }

    /// Resolve limits for a named catalog layer. `None` means the caller
    /// is an administrator and no restriction applies.
    pub async fn resource_limits(
        &self,
        principal: &Principal,
        ctx: &RequestContext,
        layer: &str,
    ) -> Result<Option<AccessLimits>, AccessError> {
        if self.is_admin(principal) {
            debug!(layer, "admin level access, returning full rights");
            return Ok(None);
        }
        let resource = self
            .catalog
            .layer_resource(layer)
            .await
            .ok_or_else(|| AccessError::UnknownLayer(layer.to_string()))?;
        let limits = self.limits_for_resource(principal, ctx, &resource).await?;
        Ok(Some(limits))
    }

    /// Resolve limits for an already-looked-up resource.
    pub async fn limits_for_resource(
        &self,
        principal: &Principal,
        ctx: &RequestContext,
        resource: &CatalogResource,
    ) -> Result<AccessLimits, AccessError> {
        let filter = RuleFilter::for_request(
            principal,
            ctx,
            &self.config.instance_name,
            &resource.workspace,
            &resource.name,
        );
        debug!(?filter, "resource access filter");

        let mut access = self.resolve(&filter).await?;
        let mut limits = build_access_limits(
            resource,
            &mut access,
            self.geometry.as_ref(),
            self.config.catalog_mode,
        )?;

        // Unauthenticated callers never gain write access.
        if principal.is_anonymous() {
            if let AccessLimits::Vector(vector) = &mut limits {
                vector.write_filter = Predicate::Exclude;
            }
        }

        debug!(
            layer = %resource.name,
            user = ?principal.name(),
            granted = limits.grants_read(),
            "resolved access limits"
        );
        Ok(limits)
    }

    /// Resolve the access decision for `filter`. Absence of any matching
    /// rule is an implicit deny.
    pub async fn resolve(&self, filter: &RuleFilter) -> Result<AccessInfo, AccessError> {
        let access = self.reader.access_info(filter).await?;
        Ok(access.unwrap_or_else(AccessInfo::deny_all))
    }

    /// Workspace-level access: admins read and write, everyone else
    /// reads.
    pub fn workspace_access(&self, principal: &Principal) -> WorkspaceAccess {
        let writable = self.is_admin(principal);
        WorkspaceAccess {
            catalog_mode: self.config.catalog_mode,
            readable: true,
            writable,
        }
    }
}
