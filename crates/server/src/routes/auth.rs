use std::{path::PathBuf, sync::Arc};

use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{header, request::Parts, HeaderMap},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header as JwtHeader, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use service::{
    access::{Identity, Role},
    branding::BrandingService,
    uploads::LogoStorage,
};

use crate::errors::JsonApiError;

/// Cookie carrying the session token when no `Authorization` header is sent.
pub const AUTH_COOKIE: &str = "auth_token";

#[derive(Clone)]
pub struct ServerAuthConfig {
    pub jwt_secret: String,
}

/// Claims of the session token issued by the identity provider.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
    pub exp: usize,
}

impl ServerAuthConfig {
    /// Verify an HS256 token (signature and expiry) and turn its claims into an identity.
    pub fn verify(&self, token: &str) -> Result<Identity, jsonwebtoken::errors::Error> {
        let key = DecodingKey::from_secret(self.jwt_secret.as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        let data = decode::<Claims>(token, &key, &validation)?;
        let claims = data.claims;
        let email = claims.email.filter(|e| !e.trim().is_empty()).unwrap_or(claims.sub);
        let name = claims.name.filter(|n| !n.trim().is_empty()).unwrap_or_else(|| email.clone());
        Ok(Identity::new(email, name, claims.picture))
    }

    /// Sign a token for `identity` valid for `ttl`. Used by the sign-in bridge and tests.
    pub fn issue_token(&self, identity: &Identity, ttl: chrono::Duration) -> Result<String, jsonwebtoken::errors::Error> {
        let exp = (chrono::Utc::now() + ttl).timestamp().max(0) as usize;
        let claims = Claims {
            sub: identity.email.clone(),
            email: Some(identity.email.clone()),
            name: Some(identity.name.clone()),
            picture: identity.avatar_url.clone(),
            exp,
        };
        encode(&JwtHeader::default(), &claims, &EncodingKey::from_secret(self.jwt_secret.as_bytes()))
    }
}

/// Where uploaded logos live on disk and under which URL prefix they are served.
#[derive(Clone, Debug)]
pub struct UploadSettings {
    pub dir: PathBuf,
    pub public_prefix: String,
    pub max_bytes: u64,
}

#[derive(Clone)]
pub struct ServerState {
    pub branding: Arc<BrandingService>,
    pub logos: Arc<dyn LogoStorage>,
    pub auth: ServerAuthConfig,
    pub uploads: UploadSettings,
}

/// The caller's verified identity, if any.
///
/// Reads `Authorization: Bearer <token>` and falls back to the `auth_token`
/// cookie. No token means an anonymous caller; a malformed, forged or expired
/// token is rejected with 401.
#[derive(Debug, Clone)]
pub struct CallerIdentity(pub Option<Identity>);

impl CallerIdentity {
    pub fn identity(&self) -> Option<&Identity> {
        self.0.as_ref()
    }
}

fn extract_token(headers: &HeaderMap) -> Result<Option<String>, JsonApiError> {
    if let Some(h) = headers.get(header::AUTHORIZATION) {
        let value = h
            .to_str()
            .map_err(|_| JsonApiError::unauthorized("invalid Authorization header"))?;
        let token = value
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                warn!("invalid Authorization format (expect Bearer)");
                JsonApiError::unauthorized("expected a Bearer token")
            })?;
        return Ok(Some(token.to_string()));
    }

    let jar = CookieJar::from_headers(headers);
    Ok(jar
        .get(AUTH_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|t| !t.is_empty()))
}

#[async_trait]
impl FromRequestParts<ServerState> for CallerIdentity {
    type Rejection = JsonApiError;

    async fn from_request_parts(parts: &mut Parts, state: &ServerState) -> Result<Self, Self::Rejection> {
        let Some(token) = extract_token(&parts.headers)? else {
            return Ok(Self(None));
        };
        match state.auth.verify(&token) {
            Ok(identity) => {
                debug!(email = %identity.email, "caller identified");
                Ok(Self(Some(identity)))
            }
            Err(e) => {
                warn!(path = %parts.uri.path(), err = %e, "token validation failed");
                Err(JsonApiError::unauthorized("invalid or expired token"))
            }
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct MeOutput {
    pub email: String,
    pub name: String,
    pub avatar_url: Option<String>,
    pub role: Role,
}

#[utoipa::path(get, path = "/auth/me", tag = "auth", responses((status = 200, description = "Current identity"), (status = 401, description = "Unauthorized")))]
pub async fn me(State(state): State<ServerState>, caller: CallerIdentity) -> Result<Json<MeOutput>, JsonApiError> {
    let role = state.branding.role_of(caller.identity());
    let identity = state.branding.gate().require_user(caller.identity())?;
    Ok(Json(MeOutput {
        email: identity.email.clone(),
        name: identity.name.clone(),
        avatar_url: identity.avatar_url.clone(),
        role,
    }))
}
