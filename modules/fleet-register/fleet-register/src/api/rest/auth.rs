//! Bearer authentication and role-hint resolution.
//!
//! For each request:
//! 1. skips CORS preflight requests;
//! 2. without an `Authorization` header, inserts an anonymous `SecurityContext`;
//! 3. otherwise maps the bearer token to a party username, loads the party and
//!    inserts its `SecurityContext`, carrying the role-hint header as received.
//!
//! Unknown tokens, and tokens naming a party that does not exist, are rejected
//! with 401.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderName, Method, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use fleet_register_sdk::Party;
use fleet_security::SecurityContext;

use super::error::domain_error_to_problem;
use super::problem::Problem;
use crate::config::AuthnConfig;
use crate::module::ConcreteAppServices;

/// Shared state for the authentication middleware.
#[derive(Clone)]
pub struct AuthState {
    services: Arc<ConcreteAppServices>,
    authn: Arc<AuthnConfig>,
    role_header: HeaderName,
}

impl AuthState {
    pub(crate) fn new(
        services: Arc<ConcreteAppServices>,
        authn: AuthnConfig,
        role_header: HeaderName,
    ) -> Self {
        Self {
            services,
            authn: Arc::new(authn),
            role_header,
        }
    }
}

pub async fn authn_middleware(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Response {
    // Skip CORS preflight
    if is_preflight_request(req.method(), req.headers()) {
        return next.run(req).await;
    }

    let hint = req
        .headers()
        .get(&state.role_header)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    // Owned so the request is not borrowed across the lookup.
    let token = extract_bearer_token(req.headers()).map(str::to_owned);
    let ctx = match token {
        None => SecurityContext::anonymous(),
        Some(token) => match resolve_party(&state, &token).await {
            Ok(party) => context_for(&party, hint.as_deref()),
            Err(response) => return response,
        },
    };

    req.extensions_mut().insert(ctx);
    next.run(req).await
}

async fn resolve_party(state: &AuthState, token: &str) -> Result<Party, Response> {
    let Some(username) = state.authn.username_for(token) else {
        tracing::debug!("AuthN rejected: unknown token");
        return Err(unauthorized());
    };

    match state.services.parties.find_by_username(username).await {
        Ok(Some(party)) => Ok(party),
        Ok(None) => {
            tracing::debug!(username, "AuthN rejected: token names an unknown party");
            Err(unauthorized())
        }
        Err(err) => Err(domain_error_to_problem(&err, "/").into_response()),
    }
}

fn context_for(party: &Party, hint: Option<&str>) -> SecurityContext {
    SecurityContext::builder()
        .subject_id(party.id)
        .username(&party.username)
        .staff(party.is_staff)
        .memberships(party.roles.clone())
        .role_hint(hint)
        .build()
}

fn unauthorized() -> Response {
    Problem::new(
        StatusCode::UNAUTHORIZED,
        "Unauthorized",
        "Authentication failed",
    )
    .into_response()
}

/// Extract Bearer token from Authorization header.
///
/// A header that is present but not a bearer credential yields an empty token,
/// which no configuration accepts.
fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?;
    Some(
        value
            .to_str()
            .ok()
            .and_then(|s| s.strip_prefix("Bearer "))
            .map_or("", str::trim),
    )
}

/// Check if this is a CORS preflight request
///
/// Preflight requests are OPTIONS requests with:
/// - Origin header present
/// - Access-Control-Request-Method header present
fn is_preflight_request(method: &Method, headers: &HeaderMap) -> bool {
    method == Method::OPTIONS
        && headers.contains_key(header::ORIGIN)
        && headers.contains_key(header::ACCESS_CONTROL_REQUEST_METHOD)
}
