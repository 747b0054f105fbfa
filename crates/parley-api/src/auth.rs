use axum::{
    Extension, Form, Json,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{error, info};

use parley_types::api::{LoginForm, Token};

use crate::middleware::CurrentUser;
use crate::state::AppState;
use crate::{password, token};

/// Exchange an OAuth2 password form for a bearer token.
pub async fn login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Response {
    let Some(user) = state.users.get(&form.username) else {
        return unauthorized();
    };
    if !password::verify_password(&form.password, &user.password_hash) {
        return unauthorized();
    }

    match token::create_access_token(
        &user.username,
        &state.secret_key,
        state.algorithm,
        state.token_ttl_minutes,
    ) {
        Ok(access_token) => {
            info!("{} logged in", user.username);
            Json(Token {
                access_token,
                token_type: "bearer".to_string(),
            })
            .into_response()
        }
        Err(e) => {
            error!("failed to issue token for {}: {}", user.username, e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Auth smoke endpoint: greets whoever the middleware authenticated.
pub async fn protected_route(Extension(user): Extension<CurrentUser>) -> impl IntoResponse {
    Json(json!({
        "message": format!("Hello, {}! This is a protected route.", user.username)
    }))
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, "Bearer")],
        "Incorrect username or password.",
    )
        .into_response()
}
