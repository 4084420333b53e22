//! Principal and request context passed explicitly into every resolution
//! call.

use std::collections::BTreeSet;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// The established caller of a request: a named identity with roles, or
/// anonymous.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    name: Option<String>,
    roles: BTreeSet<String>,
}

impl Principal {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            roles: BTreeSet::new(),
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.insert(role.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn roles(&self) -> &BTreeSet<String> {
        &self.roles
    }

    pub fn is_anonymous(&self) -> bool {
        self.name.is_none()
    }

    /// Administrator predicate over the caller's role set.
    pub fn is_admin(&self, admin_roles: &[String]) -> bool {
        admin_roles.iter().any(|role| self.roles.contains(role))
    }
}

/// Dispatch-time context of one operation: service and request identity
/// plus the network origin of the caller.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    pub service: Option<String>,
    pub request: Option<String>,
    /// Raw `X-Forwarded-For`-style header value, when a front proxy set one.
    pub forwarded_for: Option<String>,
    pub peer_address: Option<IpAddr>,
}

impl RequestContext {
    pub fn for_operation(service: impl Into<String>, request: impl Into<String>) -> Self {
        Self {
            service: Some(service.into()),
            request: Some(request.into()),
            ..Self::default()
        }
    }

    pub fn with_forwarded_for(mut self, header: impl Into<String>) -> Self {
        self.forwarded_for = Some(header.into());
        self
    }

    pub fn with_peer_address(mut self, address: IpAddr) -> Self {
        self.peer_address = Some(address);
        self
    }

    /// The first forwarded hop when a forwarding header is present, else
    /// the direct peer. A malformed header degrades to unset instead of
    /// failing the request.
    pub fn source_address(&self) -> Option<IpAddr> {
        if let Some(header) = &self.forwarded_for {
            let first = header.split(',').next().map(str::trim).unwrap_or("");
            return match first.parse::<IpAddr>() {
                Ok(address) => Some(address),
                Err(err) => {
                    warn!(header = %header, %err, "failed to resolve the forwarded client address");
                    None
                }
            };
        }
        self.peer_address
    }
}
