use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    error::{ApiError, ApiResult},
    repository::RepositoryState,
};

/// Header carrying the caller's active organization.
pub const ORGANIZATION_HEADER: &str = "x-organization-id";
/// Query parameter fallback for the active organization.
pub const ORGANIZATION_PARAM: &str = "organizationId";

/// Claims
///
/// Payload of the session JWT issued by the auth provider.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user's UUID in `squeak_users`.
    pub sub: Uuid,
    pub exp: usize,
    pub iat: usize,
}

/// AuthUser
///
/// A resolved, existing user. Carries no role: roles are scoped to an
/// organization and resolved by the gate.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
}

impl AuthUser {
    /// authenticate
    ///
    /// 1. `Env::Local` only: an `x-user-id` header naming an existing user.
    /// 2. Otherwise `Authorization: Bearer <jwt>`, signature and `exp` checked.
    /// 3. The subject must still exist in `squeak_users`.
    ///
    /// `Ok(None)` when the request carries no usable session. `Err` only when
    /// the user lookup itself fails.
    pub async fn authenticate<S>(parts: &Parts, state: &S) -> ApiResult<Option<AuthUser>>
    where
        S: Send + Sync,
        RepositoryState: FromRef<S>,
        AppConfig: FromRef<S>,
    {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        if config.env == Env::Local {
            let bypass_id = parts
                .headers
                .get("x-user-id")
                .and_then(|value| value.to_str().ok())
                .and_then(|id| Uuid::parse_str(id).ok());
            if let Some(user_id) = bypass_id {
                if let Some(user) = repo.get_user(user_id).await? {
                    return Ok(Some(AuthUser { id: user.id, email: user.email }));
                }
            }
        }

        let Some(token) = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
        else {
            return Ok(None);
        };

        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
        let mut validation = Validation::default();
        validation.validate_exp = true;

        let token_data = match decode::<Claims>(token, &decoding_key, &validation) {
            Ok(data) => data,
            Err(e) => {
                tracing::debug!("rejected session token: {:?}", e.kind());
                return Ok(None);
            }
        };

        // The token may outlive the user.
        let user = repo.get_user(token_data.claims.sub).await?;
        Ok(user.map(|user| AuthUser { id: user.id, email: user.email }))
    }
}

/// AuthUser Extractor
///
/// Requires a session: 401 without one, 500 when the user lookup fails.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Self::authenticate(parts, state).await {
            Ok(Some(user)) => Ok(user),
            Ok(None) => Err(StatusCode::UNAUTHORIZED),
            Err(e) => {
                tracing::error!("user lookup failed: {:?}", e);
                Err(e.status())
            }
        }
    }
}

/// RequestContext
///
/// Everything a handler knows about the caller, resolved once per request:
/// the user (if the request authenticates) and the active organization (if the
/// request names one). A missing or invalid session is not an error here;
/// handlers decide what is required. Store failures still propagate.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub user: Option<AuthUser>,
    pub organization_id: Option<String>,
}

impl RequestContext {
    pub async fn resolve<S>(parts: &Parts, state: &S) -> ApiResult<Self>
    where
        S: Send + Sync,
        RepositoryState: FromRef<S>,
        AppConfig: FromRef<S>,
    {
        Ok(Self {
            user: AuthUser::authenticate(parts, state).await?,
            organization_id: organization_from_parts(parts),
        })
    }

    pub fn require_organization(&self) -> ApiResult<&str> {
        self.organization_id
            .as_deref()
            .ok_or(ApiError::MissingField(ORGANIZATION_PARAM))
    }
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Self::resolve(parts, state).await
    }
}

/// organization_from_parts
///
/// `x-organization-id` header first, then the `organizationId` query
/// parameter. Blank values count as absent.
pub fn organization_from_parts(parts: &Parts) -> Option<String> {
    let from_header = parts
        .headers
        .get(ORGANIZATION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string);
    if from_header.is_some() {
        return from_header;
    }

    let query = parts.uri.query()?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == ORGANIZATION_PARAM)
        .map(|(_, value)| value.trim().to_string())
        .filter(|id| !id.is_empty())
}
