//! Feature predicates and the AND-merge laws used by the limits builder.

use serde::{Deserialize, Serialize};

use crate::errors::AccessError;

/// Empty property name; the serving framework resolves it to the
/// resource's default geometry.
pub const DEFAULT_GEOMETRY_PROPERTY: &str = "";

/// A read or write constraint over a resource's features. CQL text is
/// carried opaquely and evaluated downstream by the serving framework.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Predicate {
    /// Every feature passes.
    Include,
    /// No feature passes.
    Exclude,
    /// Opaque CQL expression.
    Cql(String),
    /// Spatial intersection against a property geometry.
    Intersects { property: String, area_wkt: String },
    And(Box<Predicate>, Box<Predicate>),
}

impl Predicate {
    /// AND-merge two predicates: Exclude short-circuits, Include is the
    /// identity.
    pub fn and(self, other: Predicate) -> Predicate {
        match (self, other) {
            (Predicate::Exclude, _) | (_, Predicate::Exclude) => Predicate::Exclude,
            (Predicate::Include, other) => other,
            (this, Predicate::Include) => this,
            (this, other) => Predicate::And(Box::new(this), Box::new(other)),
        }
    }

    /// Intersection with an area, against the default geometry property.
    pub fn intersects_area(area_wkt: impl Into<String>) -> Predicate {
        Predicate::Intersects {
            property: DEFAULT_GEOMETRY_PROPERTY.to_string(),
            area_wkt: area_wkt.into(),
        }
    }

    /// Whether the predicate can ever accept a feature.
    pub fn grants_access(&self) -> bool {
        !matches!(self, Predicate::Exclude)
    }
}

/// Validate a rule-authored CQL expression. A malformed expression must
/// fail the request rather than widen access, so this raises a fatal
/// configuration error.
pub fn parse_cql(text: &str) -> Result<Predicate, AccessError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(invalid(text, "empty expression"));
    }

    let mut depth = 0i32;
    let mut in_literal = false;
    for ch in trimmed.chars() {
        match ch {
            '\'' => in_literal = !in_literal,
            '(' if !in_literal => depth += 1,
            ')' if !in_literal => {
                depth -= 1;
                if depth < 0 {
                    return Err(invalid(text, "unbalanced parentheses"));
                }
            }
            _ => {}
        }
    }
    if in_literal {
        return Err(invalid(text, "unterminated string literal"));
    }
    if depth != 0 {
        return Err(invalid(text, "unbalanced parentheses"));
    }

    Ok(Predicate::Cql(trimmed.to_string()))
}

fn invalid(filter: &str, reason: &str) -> AccessError {
    AccessError::InvalidCqlFilter {
        filter: filter.to_string(),
        reason: reason.to_string(),
    }
}
