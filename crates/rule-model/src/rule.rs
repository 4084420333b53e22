//! Stored authorization rules and best-match selection.

use std::collections::BTreeSet;

use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};

use crate::access::{AccessInfo, GrantType, LayerAttribute};
use crate::filter::{AddressFilter, DimensionFilter, RuleFilter};

/// Restricted-area payload carried by a rule: WKT plus its spatial
/// reference.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleArea {
    pub wkt: String,
    pub srid: i32,
}

impl RuleArea {
    pub fn new(wkt: impl Into<String>, srid: i32) -> Self {
        Self {
            wkt: wkt.into(),
            srid,
        }
    }
}

/// A single authorization rule as returned by the rule store. A `None`
/// dimension declares no constraint and matches any request value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleRecord {
    pub id: u64,
    /// Explicit ordering among equally specific rules; lower wins.
    pub priority: i64,
    pub user: Option<String>,
    pub role: Option<String>,
    pub instance: Option<String>,
    pub service: Option<String>,
    pub request: Option<String>,
    pub workspace: Option<String>,
    pub layer: Option<String>,
    /// Client network the rule is scoped to; `None` matches any origin.
    pub source_range: Option<IpNetwork>,
    pub grant: GrantType,
    pub cql_filter_read: Option<String>,
    pub cql_filter_write: Option<String>,
    pub area: Option<RuleArea>,
    pub default_style: Option<String>,
    pub allowed_styles: BTreeSet<String>,
    pub attributes: Option<Vec<LayerAttribute>>,
}

impl RuleRecord {
    pub fn new(id: u64, priority: i64, grant: GrantType) -> Self {
        Self {
            id,
            priority,
            user: None,
            role: None,
            instance: None,
            service: None,
            request: None,
            workspace: None,
            layer: None,
            source_range: None,
            grant,
            cql_filter_read: None,
            cql_filter_write: None,
            area: None,
            default_style: None,
            allowed_styles: BTreeSet::new(),
            attributes: None,
        }
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    pub fn with_request(mut self, request: impl Into<String>) -> Self {
        self.request = Some(request.into());
        self
    }

    pub fn with_workspace(mut self, workspace: impl Into<String>) -> Self {
        self.workspace = Some(workspace.into());
        self
    }

    pub fn with_layer(mut self, layer: impl Into<String>) -> Self {
        self.layer = Some(layer.into());
        self
    }

    pub fn with_source_range(mut self, range: IpNetwork) -> Self {
        self.source_range = Some(range);
        self
    }

    pub fn with_cql_read(mut self, cql: impl Into<String>) -> Self {
        self.cql_filter_read = Some(cql.into());
        self
    }

    pub fn with_cql_write(mut self, cql: impl Into<String>) -> Self {
        self.cql_filter_write = Some(cql.into());
        self
    }

    pub fn with_area(mut self, area: RuleArea) -> Self {
        self.area = Some(area);
        self
    }

    pub fn with_default_style(mut self, style: impl Into<String>) -> Self {
        self.default_style = Some(style.into());
        self
    }

    pub fn with_allowed_style(mut self, style: impl Into<String>) -> Self {
        self.allowed_styles.insert(style.into());
        self
    }

    pub fn with_attribute(mut self, attribute: LayerAttribute) -> Self {
        self.attributes.get_or_insert_with(Vec::new).push(attribute);
        self
    }

    /// Whether every dimension of `filter` accepts this rule.
    pub fn matches(&self, filter: &RuleFilter) -> bool {
        dimension_matches(self.user.as_deref(), &filter.user)
            && dimension_matches(self.role.as_deref(), &filter.role)
            && dimension_matches(self.instance.as_deref(), &filter.instance)
            && dimension_matches(self.service.as_deref(), &filter.service)
            && dimension_matches(self.request.as_deref(), &filter.request)
            && dimension_matches(self.workspace.as_deref(), &filter.workspace)
            && dimension_matches(self.layer.as_deref(), &filter.layer)
            && self.address_matches(&filter.source_address)
    }

    /// Number of dimensions matched on an explicit literal value. Rules
    /// matching on strictly more literals always beat less specific ones.
    pub fn specificity(&self, filter: &RuleFilter) -> u32 {
        let mut score = 0;
        for (constraint, dimension) in [
            (self.user.as_deref(), &filter.user),
            (self.role.as_deref(), &filter.role),
            (self.instance.as_deref(), &filter.instance),
            (self.service.as_deref(), &filter.service),
            (self.request.as_deref(), &filter.request),
            (self.workspace.as_deref(), &filter.workspace),
            (self.layer.as_deref(), &filter.layer),
        ] {
            if let (Some(constraint), DimensionFilter::Name(value)) = (constraint, dimension) {
                if constraint == value {
                    score += 1;
                }
            }
        }
        if let (Some(range), AddressFilter::Literal(address)) =
            (self.source_range, &filter.source_address)
        {
            if range.contains(*address) {
                score += 1;
            }
        }
        score
    }

    fn address_matches(&self, filter: &AddressFilter) -> bool {
        match filter {
            AddressFilter::Any => true,
            AddressFilter::Unset => self.source_range.is_none(),
            AddressFilter::Literal(address) => self
                .source_range
                .map_or(true, |range| range.contains(*address)),
        }
    }

    /// Render the rule's payload as an access decision. Denials are
    /// absolute and never carry filters.
    pub fn access_info(&self) -> AccessInfo {
        if self.grant == GrantType::Deny {
            return AccessInfo::deny_all();
        }
        AccessInfo {
            grant: self.grant,
            cql_filter_read: self.cql_filter_read.clone(),
            cql_filter_write: self.cql_filter_write.clone(),
            area_wkt: self.area.as_ref().map(|area| area.wkt.clone()),
            area_srid: self.area.as_ref().map(|area| area.srid),
            default_style: self.default_style.clone(),
            allowed_styles: self.allowed_styles.clone(),
            attributes: self.attributes.clone(),
        }
    }
}

fn dimension_matches(constraint: Option<&str>, dimension: &DimensionFilter) -> bool {
    match dimension {
        DimensionFilter::Any => true,
        DimensionFilter::Default => constraint.is_none(),
        DimensionFilter::Name(value) => constraint.map_or(true, |constraint| constraint == value),
    }
}

/// Pick the single best rule for `filter`: most literal dimension matches
/// first, ties broken by ascending priority, then by rule id, so the
/// outcome never depends on storage order.
pub fn best_match<'a>(rules: &'a [RuleRecord], filter: &RuleFilter) -> Option<&'a RuleRecord> {
    rules
        .iter()
        .filter(|rule| rule.matches(filter))
        .min_by(|a, b| {
            b.specificity(filter)
                .cmp(&a.specificity(filter))
                .then_with(|| a.priority.cmp(&b.priority))
                .then_with(|| a.id.cmp(&b.id))
        })
}
