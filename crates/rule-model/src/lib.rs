//! Data model shared by the geogate authorization crates: the per-request
//! rule filter, stored rule records with their matching semantics, and the
//! access decision resolved from a matched rule.

pub mod access;
pub mod context;
pub mod filter;
pub mod rule;

pub use access::{AccessInfo, AttributeAccess, CatalogMode, GrantType, LayerAttribute};
pub use context::{Principal, RequestContext};
pub use filter::{AddressFilter, DimensionFilter, RuleFilter};
pub use rule::{best_match, RuleArea, RuleRecord};
