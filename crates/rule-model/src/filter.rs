//! Per-request query descriptor selecting candidate authorization rules.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::context::{Principal, RequestContext};

/// How a single filter dimension constrains candidate rules.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DimensionFilter {
    /// Wildcard: the dimension is ignored during matching.
    Any,
    /// Matches only rules declaring no constraint on the dimension.
    Default,
    /// Matches unconstrained rules and rules constrained to this value.
    Name(String),
}

impl DimensionFilter {
    pub fn name(value: impl Into<String>) -> Self {
        Self::Name(value.into())
    }

    /// Normalize an optional request value: `"*"` is a wildcard, an
    /// absent value matches only unconstrained rules.
    pub fn from_request_value(value: Option<&str>) -> Self {
        match value {
            Some("*") => Self::Any,
            Some(value) => Self::Name(value.to_string()),
            None => Self::Default,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Self::Name(_))
    }
}

/// Source-address dimension: a literal client address, wildcard, or unset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressFilter {
    Any,
    /// No address could be established; matches only rules without an
    /// address range.
    Unset,
    Literal(IpAddr),
}

/// Immutable query descriptor over the seven matching dimensions plus the
/// source address. Built fresh per request and compared structurally, so
/// semantically identical lookups share a cache entry.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleFilter {
    pub user: DimensionFilter,
    pub role: DimensionFilter,
    pub instance: DimensionFilter,
    pub service: DimensionFilter,
    pub request: DimensionFilter,
    pub workspace: DimensionFilter,
    pub layer: DimensionFilter,
    pub source_address: AddressFilter,
}

impl RuleFilter {
    /// A filter with every dimension wildcarded; matches every rule.
    pub fn any() -> Self {
        Self {
            user: DimensionFilter::Any,
            role: DimensionFilter::Any,
            instance: DimensionFilter::Any,
            service: DimensionFilter::Any,
            request: DimensionFilter::Any,
            workspace: DimensionFilter::Any,
            layer: DimensionFilter::Any,
            source_address: AddressFilter::Any,
        }
    }

    /// Filter for a dispatched operation with no target resource yet:
    /// workspace and layer stay wildcarded.
    pub fn for_dispatch(principal: &Principal, ctx: &RequestContext, instance: &str) -> Self {
        let mut filter = Self::any();
        filter.user = match principal.name() {
            Some(name) => DimensionFilter::name(name),
            None => DimensionFilter::Default,
        };
        filter.instance = DimensionFilter::name(instance);
        filter.service = DimensionFilter::from_request_value(ctx.service.as_deref());
        filter.request = DimensionFilter::from_request_value(ctx.request.as_deref());
        filter.source_address = match ctx.source_address() {
            Some(address) => AddressFilter::Literal(address),
            None => AddressFilter::Unset,
        };
        filter
    }

    /// Filter for an access check against a concrete catalog resource.
    pub fn for_request(
        principal: &Principal,
        ctx: &RequestContext,
        instance: &str,
        workspace: &str,
        layer: &str,
    ) -> Self {
        let mut filter = Self::for_dispatch(principal, ctx, instance);
        filter.workspace = DimensionFilter::name(workspace);
        filter.layer = DimensionFilter::name(layer);
        filter
    }
}
