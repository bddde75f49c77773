//! # Authorization Gate
//!
//! Resolves a bearer credential to a [`Session`] and decides whether the
//! session may perform a requested [`Action`].
//!
//! ## Token Format
//!
//! ```text
//! Bearer {role}.{phone}.{expires_unix}.{signature}
//! ```
//!
//! `signature` is the hex HMAC-SHA256 of `{role}.{phone}.{expires_unix}`
//! under the server's token secret. Signatures are compared in constant
//! time.
//!
//! ## Roles and capabilities
//!
//! Roles form a small partial order (`admin` covers `user`). Each action has
//! a required role and an ownership rule; see [`Action::capability`]. The
//! gate is a pure function of `(credential, now)` and the session is passed
//! explicitly into every lifecycle call.

use std::sync::Arc;

use axum::extract::Request;
use axum::http::header;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use hmac::{Hmac, Mac};
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;
use utoipa::ToSchema;
use zeroize::{Zeroize, ZeroizeOnDrop};

use campus_core::{Phone, Timestamp};

use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

// ── Role ────────────────────────────────────────────────────────────────────

/// Caller roles.
///
/// Deliberately not `Ord`: privilege is expressed through [`Role::covers`],
/// so adding a role never silently changes existing comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A community member who publishes resources.
    User,
    /// A moderator who reviews submissions.
    Admin,
}

impl Role {
    /// Return the string representation of this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }

    /// Parse a role name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "user" => Some(Self::User),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    /// Whether a holder of `self` satisfies a requirement for `required`.
    pub fn covers(self, required: Role) -> bool {
        matches!(
            (self, required),
            (Self::User, Self::User) | (Self::Admin, Self::User) | (Self::Admin, Self::Admin)
        )
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Actions & capabilities ──────────────────────────────────────────────────

/// Every operation the lifecycle manager exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Create a draft.
    Create,
    /// Read a single resource.
    Read,
    /// Edit descriptive fields.
    Update,
    /// Hard-delete a resource.
    Delete,
    /// Move to `archived`.
    Archive,
    /// Submit for moderation.
    SubmitReview,
    /// Approve or reject.
    Review,
    /// List the caller's own resources.
    ListMine,
    /// List the moderation queue.
    ListPending,
    /// Read the review ledger of one resource.
    ReadHistory,
}

/// Who may act on a resource once the role requirement is met.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// No per-resource check.
    None,
    /// Only the publisher.
    OwnerOnly,
    /// The publisher, or any admin.
    OwnerOrAdmin,
}

/// Requirement pair for one action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capability {
    /// Role the caller must cover.
    pub required: Role,
    /// Per-resource ownership rule.
    pub ownership: Ownership,
}

/// Access-policy switches that widen the capability table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccessPolicy {
    /// Let admins edit resources they do not own.
    pub admin_may_update: bool,
}

impl Action {
    /// Verb used in messages and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Archive => "archive",
            Self::SubmitReview => "submit-review",
            Self::Review => "review",
            Self::ListMine => "list-mine",
            Self::ListPending => "list-pending",
            Self::ReadHistory => "read-history",
        }
    }

    /// The capability table.
    pub fn capability(self, policy: &AccessPolicy) -> Capability {
        let (required, ownership) = match self {
            Self::Create | Self::ListMine => (Role::User, Ownership::None),
            Self::Read | Self::Delete | Self::Archive | Self::ReadHistory => {
                (Role::User, Ownership::OwnerOrAdmin)
            }
            Self::Update if policy.admin_may_update => (Role::User, Ownership::OwnerOrAdmin),
            Self::Update | Self::SubmitReview => (Role::User, Ownership::OwnerOnly),
            Self::Review | Self::ListPending => (Role::Admin, Ownership::None),
        };
        Capability {
            required,
            ownership,
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Errors ──────────────────────────────────────────────────────────────────

/// Authentication and authorization failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No bearer credential was supplied.
    #[error("missing bearer credential")]
    MissingCredential,

    /// The credential does not have the expected shape.
    #[error("malformed bearer credential: {0}")]
    Malformed(&'static str),

    /// The signature does not match.
    #[error("invalid credential signature")]
    BadSignature,

    /// The credential's expiry instant has passed.
    #[error("credential expired")]
    Expired,

    /// The signed role is not one this service knows.
    #[error("unknown role: {0}")]
    UnknownRole(String),

    /// The HMAC implementation refused the configured key.
    #[error("token secret rejected by HMAC")]
    InvalidKey,

    /// The caller's role does not cover the action's requirement.
    #[error("role '{required}' required to {action}, caller has '{actual}'")]
    InsufficientRole {
        /// The attempted action.
        action: Action,
        /// Required role.
        required: Role,
        /// Caller's role.
        actual: Role,
    },

    /// The action is restricted to the resource's owner.
    #[error("only the owner may {action} this resource")]
    NotOwner {
        /// The attempted action.
        action: Action,
    },

    /// The action is restricted to the owner or an admin.
    #[error("only the owner or an admin may {action} this resource")]
    NotOwnerOrAdmin {
        /// The attempted action.
        action: Action,
    },
}

impl AuthError {
    /// Whether this failure means "who are you?" (401) rather than
    /// "you may not" (403).
    pub fn is_unauthenticated(&self) -> bool {
        matches!(
            self,
            Self::MissingCredential
                | Self::Malformed(_)
                | Self::BadSignature
                | Self::Expired
                | Self::UnknownRole(_)
                | Self::InvalidKey
        )
    }
}

// ── Session ─────────────────────────────────────────────────────────────────

/// The resolved caller: identity plus role.
///
/// Injected into request extensions by [`auth_middleware`] and extracted by
/// handlers through `FromRequestParts`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// The caller's phone identity.
    pub identity: Phone,
    /// The caller's role.
    pub role: Role,
}

impl Session {
    /// Construct a session.
    pub fn new(identity: Phone, role: Role) -> Self {
        Self { identity, role }
    }

    /// Whether the caller holds the admin role.
    pub fn is_admin(&self) -> bool {
        self.role.covers(Role::Admin)
    }

    /// Check the role half of `action`'s capability.
    pub fn require_role(&self, action: Action, policy: &AccessPolicy) -> Result<(), AuthError> {
        let cap = action.capability(policy);
        if self.role.covers(cap.required) {
            Ok(())
        } else {
            Err(AuthError::InsufficientRole {
                action,
                required: cap.required,
                actual: self.role,
            })
        }
    }

    /// Check the ownership half of `action`'s capability against `owner`.
    pub fn require_access(
        &self,
        action: Action,
        owner: &Phone,
        policy: &AccessPolicy,
    ) -> Result<(), AuthError> {
        let is_owner = &self.identity == owner;
        match action.capability(policy).ownership {
            Ownership::None => Ok(()),
            Ownership::OwnerOnly if is_owner => Ok(()),
            Ownership::OwnerOnly => Err(AuthError::NotOwner { action }),
            Ownership::OwnerOrAdmin if is_owner || self.is_admin() => Ok(()),
            Ownership::OwnerOrAdmin => Err(AuthError::NotOwnerOrAdmin { action }),
        }
    }
}

/// Axum `FromRequestParts` implementation for `Session`.
///
/// Returns 401 if no session is present (middleware didn't run or failed).
#[axum::async_trait]
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for Session {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("no session in request context".into()))
    }
}

// ── Identity providers ──────────────────────────────────────────────────────

/// Resolves a bearer credential to a session at an explicit instant.
pub trait IdentityProvider: Send + Sync {
    /// Resolve `credential` as of `now`.
    fn resolve_at(&self, credential: &str, now: Timestamp) -> Result<Session, AuthError>;
}

/// HMAC key for signing bearer tokens. Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct TokenSecret(Vec<u8>);

impl TokenSecret {
    /// Minimum accepted key length in bytes.
    pub const MIN_LEN: usize = 16;

    /// Wrap caller-supplied key material. Returns `None` if shorter than
    /// [`TokenSecret::MIN_LEN`].
    pub fn new(bytes: impl Into<Vec<u8>>) -> Option<Self> {
        let bytes = bytes.into();
        (bytes.len() >= Self::MIN_LEN).then_some(Self(bytes))
    }

    /// Generate 32 random bytes from the operating system.
    pub fn generate() -> Self {
        let mut bytes = vec![0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for TokenSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TokenSecret([REDACTED])")
    }
}

/// Issues and verifies HMAC-signed bearer tokens.
#[derive(Debug, Clone)]
pub struct SignedTokenProvider {
    secret: TokenSecret,
}

impl SignedTokenProvider {
    /// Create a provider over `secret`.
    pub fn new(secret: TokenSecret) -> Self {
        Self { secret }
    }

    /// Issue a token for `phone` in `role`, valid until `expires_at`.
    pub fn issue(
        &self,
        role: Role,
        phone: &Phone,
        expires_at: Timestamp,
    ) -> Result<String, AuthError> {
        let payload = format!("{}.{}.{}", role.as_str(), phone, expires_at.unix_seconds());
        let signature = self.sign(payload.as_bytes())?;
        Ok(format!("{payload}.{}", hex::encode(signature)))
    }

    fn sign(&self, payload: &[u8]) -> Result<Vec<u8>, AuthError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|_| AuthError::InvalidKey)?;
        mac.update(payload);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

impl IdentityProvider for SignedTokenProvider {
    fn resolve_at(&self, credential: &str, now: Timestamp) -> Result<Session, AuthError> {
        let parts: Vec<&str> = credential.split('.').collect();
        let &[role, phone, expires, signature] = parts.as_slice() else {
            return Err(AuthError::Malformed(
                "expected {role}.{phone}.{expires_unix}.{signature}",
            ));
        };

        let provided = hex::decode(signature).map_err(|_| AuthError::Malformed("signature"))?;
        let payload_len = credential.len() - signature.len() - 1;
        let expected = self.sign(&credential.as_bytes()[..payload_len])?;
        if !constant_time_eq(&provided, &expected) {
            return Err(AuthError::BadSignature);
        }

        let role = Role::from_name(role).ok_or_else(|| AuthError::UnknownRole(role.to_string()))?;
        let identity = Phone::new(phone).map_err(|_| AuthError::Malformed("phone"))?;
        let expires: i64 = expires
            .parse()
            .map_err(|_| AuthError::Malformed("expiry"))?;
        if now.unix_seconds() >= expires {
            return Err(AuthError::Expired);
        }

        Ok(Session { identity, role })
    }
}

/// Constant-time comparison of signature bytes.
///
/// When lengths differ, performs a dummy comparison to avoid leaking length
/// information through timing variance.
fn constant_time_eq(provided: &[u8], expected: &[u8]) -> bool {
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

// ── Middleware ───────────────────────────────────────────────────────────────

/// Auth configuration injected into request extensions.
#[derive(Clone)]
pub struct AuthConfig {
    /// The configured identity provider.
    pub provider: Arc<dyn IdentityProvider>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("provider", &"[REDACTED]")
            .finish()
    }
}

/// Extract and resolve the Bearer credential from the Authorization header.
///
/// On success the resolved [`Session`] is inserted into request extensions.
/// Every failure is a 401 with the standard error envelope.
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let Some(config) = request.extensions().get::<AuthConfig>().cloned() else {
        tracing::error!("auth middleware mounted without AuthConfig");
        return AppError::Internal("authentication is not configured".into()).into_response();
    };

    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let credential = match auth_header {
        Some(value) => match value.strip_prefix("Bearer ") {
            Some(token) => token.trim().to_string(),
            None => {
                tracing::warn!("authentication failed: non-Bearer authorization scheme");
                return AppError::Unauthorized(
                    "authorization header must use Bearer scheme".into(),
                )
                .into_response();
            }
        },
        None => {
            tracing::warn!("authentication failed: missing authorization header");
            return AppError::from(AuthError::MissingCredential).into_response();
        }
    };

    match config.provider.resolve_at(&credential, Timestamp::now()) {
        Ok(session) => {
            request.extensions_mut().insert(session);
            next.run(request).await
        }
        Err(err) => {
            tracing::warn!(reason = %err, "authentication failed: invalid bearer credential");
            AppError::from(err).into_response()
        }
    }
}
