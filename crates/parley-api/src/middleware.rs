use axum::{
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::Response,
};

use crate::state::AppState;
use crate::token::decode_access_token;

/// Identity of the authenticated caller, injected into request extensions
/// by [`require_auth`].
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub username: String,
}

/// Extract and validate the bearer token from the Authorization header,
/// then resolve the subject against the user store.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let claims = decode_access_token(token, &state.secret_key, state.algorithm)
        .ok_or(StatusCode::UNAUTHORIZED)?;

    if !state.users.contains(&claims.sub) {
        return Err(StatusCode::UNAUTHORIZED);
    }

    req.extensions_mut().insert(CurrentUser {
        username: claims.sub,
    });
    Ok(next.run(req).await)
}
