//! Fatal errors and policy rejections raised by the access engine.
//!
//! The two kinds stay distinct so callers can tell "block and alert the
//! operator" apart from "block and tell the user why".

use thiserror::Error;

use geogate_rule_reader::StoreError;

use crate::geometry::GeometryError;

/// Fatal misconfiguration or lookup failure. Surfaces as a 5xx-class
/// service error and is never converted into a plain allow or deny.
#[derive(Debug, Error, Clone)]
pub enum AccessError {
    #[error("invalid cql filter `{filter}`: {reason}")]
    InvalidCqlFilter { filter: String, reason: String },

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error("style `{0}` referenced by a rule is missing from the registry")]
    MissingStyle(String),

    #[error("layer `{0}` is not registered in the catalog")]
    UnknownLayer(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Expected policy refusal, with a reason the caller can relay to the
/// user.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("map requests without explicit layers, an sld reference or an inline sld body are forbidden")]
    NoLayersRequested,

    #[error("dynamic style usage is forbidden")]
    DynamicStyleForbidden,

    #[error("remote and inline layers are not allowed")]
    RemoteLayerForbidden,

    #[error("style `{0}` is not available on this layer")]
    StyleNotAllowed(String),
}

/// Outcome of a dispatch-time interception.
#[derive(Debug, Error, Clone)]
pub enum DispatchError {
    #[error(transparent)]
    Rejected(#[from] Rejection),

    #[error(transparent)]
    Failed(#[from] AccessError),
}

impl DispatchError {
    /// Whether this is an expected policy refusal rather than an
    /// operator-facing failure.
    pub fn is_rejection(&self) -> bool {
        matches!(self, DispatchError::Rejected(_))
    }
}
