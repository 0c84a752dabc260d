//! Authorization & Config Gate.
//!
//! Given a caller and an organization, decide the caller's role there and what
//! part of the organization's config they may see. Stateless: every decision
//! is made per request from a single role lookup.

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

use crate::{
    auth::{AuthUser, ORGANIZATION_PARAM, RequestContext},
    config::AppConfig,
    error::{ApiError, ApiResult},
    models::{PublicConfig, SqueakConfig},
    repository::{Repository, RepositoryState},
};

/// Role
///
/// A caller's standing in one organization. `Anonymous` covers both "not
/// signed in" and "signed in without a role row here".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    Admin,
    Member,
    Anonymous,
}

impl Role {
    /// Maps a stored `squeak_roles.role` value. Unknown values grant nothing.
    pub fn from_stored(value: &str) -> Role {
        match value {
            "admin" => Role::Admin,
            "member" => Role::Member,
            other => {
                tracing::warn!(role = other, "unrecognised stored role, treating as anonymous");
                Role::Anonymous
            }
        }
    }

    /// resolve
    ///
    /// No user ⇒ `Anonymous`. A user without a role row in this organization
    /// is also `Anonymous`, not an error.
    pub async fn resolve(
        repo: &dyn Repository,
        organization_id: &str,
        user: Option<&AuthUser>,
    ) -> ApiResult<Role> {
        let Some(user) = user else {
            return Ok(Role::Anonymous);
        };
        let stored = repo.get_user_role(organization_id, user.id).await?;
        Ok(stored.as_deref().map_or(Role::Anonymous, Role::from_stored))
    }

    pub fn require_admin(self) -> ApiResult<()> {
        match self {
            Role::Admin => Ok(()),
            Role::Member | Role::Anonymous => Err(ApiError::Forbidden),
        }
    }
}

/// ConfigView
///
/// The config as a given role is allowed to see it. Serialized untagged, so
/// the public variant carries no trace of the hidden fields.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
#[serde(untagged)]
pub enum ConfigView {
    Full(SqueakConfig),
    Public(PublicConfig),
}

impl ConfigView {
    pub fn project(config: SqueakConfig, role: Role) -> Self {
        match role {
            Role::Admin => ConfigView::Full(config),
            Role::Member | Role::Anonymous => ConfigView::Public(config.into()),
        }
    }
}

/// read_config
///
/// The read half of the gate: validate the organization id, resolve the role,
/// load the row and project it.
pub async fn read_config(
    repo: &dyn Repository,
    organization_id: Option<&str>,
    user: Option<&AuthUser>,
) -> ApiResult<ConfigView> {
    let organization_id = organization_id
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or(ApiError::MissingField(ORGANIZATION_PARAM))?;

    let role = Role::resolve(repo, organization_id, user).await?;
    let config = repo
        .get_config(organization_id)
        .await?
        .ok_or(ApiError::NotFound("Config"))?;

    tracing::debug!(organization_id, ?role, "config read");
    Ok(ConfigView::project(config, role))
}

/// OrgAdmin
///
/// Extractor for every administrative endpoint: the request must name an
/// organization (400) and the caller must be an admin of it (403). Store
/// failures while resolving either surface as 500.
#[derive(Debug, Clone)]
pub struct OrgAdmin {
    pub organization_id: String,
    pub user: AuthUser,
}

impl<S> FromRequestParts<S> for OrgAdmin
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let ctx = RequestContext::resolve(parts, state).await?;
        let organization_id = ctx.require_organization()?.to_string();

        let repo = RepositoryState::from_ref(state);
        let role = Role::resolve(repo.as_ref(), &organization_id, ctx.user.as_ref()).await?;
        role.require_admin()?;

        // Admin implies a resolved user.
        let user = ctx.user.ok_or(ApiError::Forbidden)?;
        Ok(OrgAdmin { organization_id, user })
    }
}
