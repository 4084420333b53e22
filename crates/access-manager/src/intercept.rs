//! Dispatch-time enforcement for map and legend rendering: per-layer
//! style validation, default-style override, and the remote-layer and
//! dynamic-style gates.

use std::sync::Arc;

use tracing::debug;

use geogate_rule_model::{AccessInfo, Principal, RequestContext, RuleFilter};

use crate::catalog::StyleDef;
use crate::errors::{AccessError, DispatchError, Rejection};
use crate::manager::AccessManager;

/// One layer of a map-rendering request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MapLayer {
    /// Layer published in the local catalog.
    Catalog(String),
    /// Remote or inline source outside the catalog.
    Remote(String),
}

/// Mutable view of a map-rendering request. Style slots are overwritten
/// in place when a rule imposes a default style.
#[derive(Clone, Debug, Default)]
pub struct MapRenderRequest {
    pub layers: Vec<MapLayer>,
    /// Explicitly requested style per layer; `None` slots take defaults.
    pub styles: Vec<Option<String>>,
    /// Reference to a remote styled-layer-descriptor document.
    pub sld: Option<String>,
    /// Inline styled-layer-descriptor body.
    pub sld_body: Option<String>,
}

impl MapRenderRequest {
    pub fn new(layers: Vec<MapLayer>) -> Self {
        Self {
            layers,
            ..Self::default()
        }
    }

    pub fn with_style(mut self, index: usize, style: impl Into<String>) -> Self {
        if self.styles.len() <= index {
            self.styles.resize(index + 1, None);
        }
        self.styles[index] = Some(style.into());
        self
    }

    pub fn with_sld(mut self, reference: impl Into<String>) -> Self {
        self.sld = Some(reference.into());
        self
    }

    pub fn with_sld_body(mut self, body: impl Into<String>) -> Self {
        self.sld_body = Some(body.into());
        self
    }

    fn uses_dynamic_style(&self) -> bool {
        self.sld.is_some() || self.sld_body.is_some()
    }
}

/// Legend request for a single layer.
#[derive(Clone, Debug)]
pub struct LegendRenderRequest {
    pub layer: String,
    pub style: Option<String>,
}

impl LegendRenderRequest {
    pub fn new(layer: impl Into<String>) -> Self {
        Self {
            layer: layer.into(),
            style: None,
        }
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }
}

/// Re-validates per-layer style and layer choices when a rendering
/// operation is dispatched.
pub struct RequestInterceptor {
    manager: Arc<AccessManager>,
}

impl RequestInterceptor {
    pub fn new(manager: Arc<AccessManager>) -> Self {
        Self { manager }
    }

    /// Enforce style and layer policy on a map-render operation.
    pub async fn intercept_map_render(
        &self,
        principal: &Principal,
        ctx: &RequestContext,
        request: &mut MapRenderRequest,
    ) -> Result<(), DispatchError> {
        if self.manager.is_admin(principal) {
            debug!("admin level access, leaving the request unchanged");
            return Ok(());
        }

        // A submission naming no layers and carrying no style document
        // would dodge every per-layer check below.
        if request.layers.is_empty() && !request.uses_dynamic_style() {
            return Err(Rejection::NoLayersRequested.into());
        }

        if request.uses_dynamic_style() && !self.manager.config.allow_dynamic_styles {
            return Err(Rejection::DynamicStyleForbidden.into());
        }

        if request.styles.len() < request.layers.len() {
            request.styles.resize(request.layers.len(), None);
        }

        for index in 0..request.layers.len() {
            let layer = request.layers[index].clone();
            let access = self.layer_access(principal, ctx, &layer).await?;
            match request.styles[index].clone() {
                Some(style) => check_style_allowed(&access, &style)?,
                None => {
                    if let Some(style) = self.load_default_style(&access).await? {
                        debug!(layer = ?layer, style = %style.name, "applying the rule's default style");
                        request.styles[index] = Some(style.name);
                    }
                }
            }
        }
        Ok(())
    }

    /// Enforce style policy on a legend-render operation.
    pub async fn intercept_legend_render(
        &self,
        principal: &Principal,
        ctx: &RequestContext,
        request: &mut LegendRenderRequest,
    ) -> Result<(), DispatchError> {
        if self.manager.is_admin(principal) {
            debug!("admin level access, leaving the request unchanged");
            return Ok(());
        }

        let layer = MapLayer::Catalog(request.layer.clone());
        let access = self.layer_access(principal, ctx, &layer).await?;
        match &request.style {
            Some(style) => check_style_allowed(&access, style)?,
            None => {
                if let Some(style) = self.load_default_style(&access).await? {
                    request.style = Some(style.name);
                }
            }
        }
        Ok(())
    }

    async fn layer_access(
        &self,
        principal: &Principal,
        ctx: &RequestContext,
        layer: &MapLayer,
    ) -> Result<AccessInfo, DispatchError> {
        let instance = &self.manager.config.instance_name;
        let filter = match layer {
            MapLayer::Catalog(name) => {
                let resource = self
                    .manager
                    .catalog
                    .layer_resource(name)
                    .await
                    .ok_or_else(|| AccessError::UnknownLayer(name.clone()))?;
                RuleFilter::for_request(principal, ctx, instance, &resource.workspace, &resource.name)
            }
            MapLayer::Remote(source) => {
                if !self.manager.config.allow_remote_and_inline_layers {
                    return Err(Rejection::RemoteLayerForbidden.into());
                }
                debug!(source = %source, "resolving access for a non-catalog layer");
                RuleFilter::for_dispatch(principal, ctx, instance)
            }
        };
        debug!(?filter, "getting access decision for rendering");
        Ok(self.manager.resolve(&filter).await?)
    }

    async fn load_default_style(
        &self,
        access: &AccessInfo,
    ) -> Result<Option<StyleDef>, DispatchError> {
        let Some(name) = &access.default_style else {
            return Ok(None);
        };
        let style = self
            .manager
            .catalog
            .style_by_name(name)
            .await
            .ok_or_else(|| AccessError::MissingStyle(name.clone()))?;
        Ok(Some(style))
    }
}

fn check_style_allowed(access: &AccessInfo, style: &str) -> Result<(), DispatchError> {
    if access.permits_style(style) {
        Ok(())
    } else {
        Err(Rejection::StyleNotAllowed(style.to_string()).into())
    }
}
