//! Authorization context: resolves the calling user from a session token.
//!
//! Handlers never see an unauthenticated caller. [`CurrentUser`] rejects the
//! request with `401` before the handler body (and therefore any store access)
//! runs.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use serde::{Deserialize, Serialize};
use shelf_http::AppError;
use shelf_kernel::{settings::AuthSettings, InitCtx, Module};
use thiserror::Error;

/// Identifier of an authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing session credentials")]
    MissingCredentials,
    #[error("session is not recognised")]
    UnknownSession,
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::unauthorized(err.to_string())
    }
}

/// Resolves a session token into the user it belongs to.
#[async_trait]
pub trait SessionResolver: Send + Sync {
    async fn resolve(&self, token: &str) -> Result<UserId, AuthError>;
}

/// Session table loaded from configuration (`auth.sessions`).
#[derive(Debug, Clone, Default)]
pub struct StaticSessions {
    sessions: HashMap<String, UserId>,
}

impl StaticSessions {
    pub fn from_settings(settings: &AuthSettings) -> Self {
        settings
            .sessions
            .iter()
            .map(|(token, user)| (token.clone(), UserId::new(user.clone())))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl FromIterator<(String, UserId)> for StaticSessions {
    fn from_iter<I: IntoIterator<Item = (String, UserId)>>(iter: I) -> Self {
        Self {
            sessions: iter.into_iter().collect(),
        }
    }
}

#[async_trait]
impl SessionResolver for StaticSessions {
    async fn resolve(&self, token: &str) -> Result<UserId, AuthError> {
        self.sessions
            .get(token)
            .cloned()
            .ok_or(AuthError::UnknownSession)
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Resolve the caller behind a request's headers.
pub async fn authenticate(
    resolver: &dyn SessionResolver,
    headers: &HeaderMap,
) -> Result<UserId, AuthError> {
    let token = bearer_token(headers).ok_or(AuthError::MissingCredentials)?;
    resolver.resolve(token).await
}

/// The authenticated caller of the current request.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserId);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    Arc<dyn SessionResolver>: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let resolver = Arc::<dyn SessionResolver>::from_ref(state);
        match authenticate(resolver.as_ref(), &parts.headers).await {
            Ok(user) => Ok(CurrentUser(user)),
            Err(err) => {
                tracing::debug!(error = %err, path = %parts.uri.path(), "rejecting unauthenticated request");
                Err(err.into())
            }
        }
    }
}

/// Core module announcing the session table at startup.
pub struct AuthzModule {
    sessions: Arc<StaticSessions>,
}

impl AuthzModule {
    pub fn new(sessions: Arc<StaticSessions>) -> Self {
        Self { sessions }
    }
}

#[async_trait]
impl Module for AuthzModule {
    fn name(&self) -> &'static str {
        "authz"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        if self.sessions.is_empty() {
            tracing::warn!(
                environment = ?ctx.settings.environment,
                "no sessions configured; every request will be rejected"
            );
        } else {
            tracing::info!(sessions = self.sessions.len(), "authz module initialized");
        }
        Ok(())
    }
}
