//! Access decisions resolved from a matched rule.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Grant carried by a rule: allow with optional restrictions, or absolute
/// deny.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GrantType {
    Allow,
    Deny,
}

/// How denial is reported upstream by the serving framework.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CatalogMode {
    #[default]
    Hide,
    Mixed,
    Challenge,
}

/// Per-attribute access level. `None` hides the attribute entirely.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttributeAccess {
    None,
    ReadOnly,
    ReadWrite,
}

/// Visibility of a single feature attribute.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerAttribute {
    pub name: String,
    pub access: AttributeAccess,
}

impl LayerAttribute {
    pub fn new(name: impl Into<String>, access: AttributeAccess) -> Self {
        Self {
            name: name.into(),
            access,
        }
    }

    pub fn readable(&self) -> bool {
        matches!(
            self.access,
            AttributeAccess::ReadOnly | AttributeAccess::ReadWrite
        )
    }

    pub fn writable(&self) -> bool {
        self.access == AttributeAccess::ReadWrite
    }
}

/// The resolved outcome of a rule match. Treated as a value: the engine
/// clones it out of the cache before any mutation (area reprojection
/// writes into the copy, never the cached original).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessInfo {
    pub grant: GrantType,
    pub cql_filter_read: Option<String>,
    pub cql_filter_write: Option<String>,
    /// Restricted area, when the rule carries one.
    pub area_wkt: Option<String>,
    /// Spatial reference of `area_wkt`, as an EPSG code.
    pub area_srid: Option<i32>,
    pub default_style: Option<String>,
    /// Empty set means unrestricted style choice.
    pub allowed_styles: BTreeSet<String>,
    /// `None` leaves every attribute visible.
    pub attributes: Option<Vec<LayerAttribute>>,
}

impl AccessInfo {
    /// Unrestricted access.
    pub fn allow_all() -> Self {
        Self {
            grant: GrantType::Allow,
            cql_filter_read: None,
            cql_filter_write: None,
            area_wkt: None,
            area_srid: None,
            default_style: None,
            allowed_styles: BTreeSet::new(),
            attributes: None,
        }
    }

    /// Absolute denial; carries no filters.
    pub fn deny_all() -> Self {
        Self {
            grant: GrantType::Deny,
            ..Self::allow_all()
        }
    }

    /// Union of the default style and the allowed set; empty means
    /// unrestricted.
    pub fn allowed_style_union(&self) -> BTreeSet<String> {
        let mut styles = self.allowed_styles.clone();
        if let Some(default) = &self.default_style {
            styles.insert(default.clone());
        }
        styles
    }

    /// Whether `style` may be requested explicitly under this decision.
    pub fn permits_style(&self, style: &str) -> bool {
        let union = self.allowed_style_union();
        union.is_empty() || union.contains(style)
    }
}
