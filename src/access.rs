//! Caller identity and feature permissions
//!
//! Session handling lives in front of this service; requests arrive with an
//! already-validated identity in a header. This module only answers whether
//! that identity may use a feature.

use async_trait::async_trait;
use axum::http::HeaderMap;

use crate::config::{AccessConfig, AccessGrant};
use crate::error::{AppError, AppResult};

/// Grant entry matching every identity or every feature
pub const WILDCARD: &str = "*";

/// Validated caller identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity(String);

impl Identity {
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(trimmed.to_string()))
    }

    /// Read the identity from `header_name`; missing, blank or non-ASCII values yield `None`
    pub fn from_headers(headers: &HeaderMap, header_name: &str) -> Option<Self> {
        let value = headers.get(header_name)?.to_str().ok()?;
        Self::new(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Permission predicate
#[async_trait]
pub trait PermissionCheck: Send + Sync {
    async fn has_permission(&self, identity: &Identity, feature: &str) -> bool;
}

/// Permissions from the static grant list in configuration
pub struct ConfigPermissions {
    grants: Vec<AccessGrant>,
}

impl ConfigPermissions {
    pub fn new(grants: Vec<AccessGrant>) -> Self {
        Self { grants }
    }

    pub fn from_config(config: &AccessConfig) -> Self {
        Self::new(config.grants.clone())
    }
}

#[async_trait]
impl PermissionCheck for ConfigPermissions {
    async fn has_permission(&self, identity: &Identity, feature: &str) -> bool {
        self.grants.iter().any(|grant| {
            (grant.identity == WILDCARD || grant.identity == identity.as_str())
                && grant
                    .features
                    .iter()
                    .any(|f| f == WILDCARD || f == feature)
        })
    }
}

/// Resolve the caller and check it may use `feature`
///
/// # Errors
/// `Unauthenticated` when no identity is present, `Forbidden` when the
/// identity has no grant for the feature.
pub async fn authorize(
    headers: &HeaderMap,
    config: &AccessConfig,
    permissions: &dyn PermissionCheck,
    feature: &str,
) -> AppResult<Identity> {
    let identity =
        Identity::from_headers(headers, &config.identity_header).ok_or(AppError::Unauthenticated)?;

    if !permissions.has_permission(&identity, feature).await {
        tracing::info!(identity = %identity, feature = %feature, "Permission denied");
        return Err(AppError::Forbidden {
            feature: feature.to_string(),
        });
    }

    Ok(identity)
}
