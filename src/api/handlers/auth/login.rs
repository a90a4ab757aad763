//! SRP login endpoints.

use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use tracing::error;
use uuid::Uuid;

use super::{
    types::{LoginFinishRequest, LoginFinishResponse, LoginStartRequest, LoginStartResponse},
    utils::{decode_base64_field, encode_base64, normalize_email, valid_email},
};
use crate::api::state::AppState;
use crate::srp::{ExchangeStart, SrpError};
use crate::users::IdentityLookup;

#[utoipa::path(
    post,
    path = "/v1/auth/login/start",
    request_body = LoginStartRequest,
    responses(
        (status = 200, description = "SRP exchange started", body = LoginStartResponse),
        (status = 400, description = "Validation error", body = String),
        (status = 500, description = "Login failed", body = String)
    ),
    tag = "auth"
)]
pub async fn login_start(
    state: Extension<Arc<AppState>>,
    payload: Option<Json<LoginStartRequest>>,
) -> impl IntoResponse {
    let request: LoginStartRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return (StatusCode::BAD_REQUEST, "Invalid email".to_string()).into_response();
    }

    // Unknown identities get the identical fake flow so the response shape
    // and timing never answer "does this user exist".
    let start = match state.users().lookup(&email).await {
        Ok(Some(user)) => state.srp().begin_exchange(user).await,
        Ok(None) => state.srp().fake_exchange().await,
        Err(err) => {
            error!("Login lookup failed: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Login failed".to_string(),
            )
                .into_response();
        }
    };

    match start {
        Ok(start) => (StatusCode::OK, Json(start_response(&start))).into_response(),
        Err(err) => {
            error!("Failed to start SRP exchange: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Login failed".to_string(),
            )
                .into_response()
        }
    }
}

fn start_response(start: &ExchangeStart) -> LoginStartResponse {
    LoginStartResponse {
        session_id: start.session_id.to_string(),
        server_public_ephemeral: encode_base64(&start.server_public_ephemeral),
    }
}

#[utoipa::path(
    post,
    path = "/v1/auth/login/finish",
    request_body = LoginFinishRequest,
    responses(
        (status = 200, description = "Login success", body = LoginFinishResponse),
        (status = 400, description = "Validation error", body = String),
        (status = 401, description = "Unauthorized", body = String),
        (status = 500, description = "Login failed", body = String)
    ),
    tag = "auth"
)]
pub async fn login_finish(
    state: Extension<Arc<AppState>>,
    payload: Option<Json<LoginFinishRequest>>,
) -> impl IntoResponse {
    let request: LoginFinishRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    // Session ids are opaque server-side references; reject anything malformed.
    let Ok(session_id) = Uuid::parse_str(request.session_id.trim()) else {
        return (StatusCode::BAD_REQUEST, "Invalid session id".to_string()).into_response();
    };

    let client_public = match decode_base64_field(
        &request.client_public_ephemeral,
        "client_public_ephemeral",
    ) {
        Ok(bytes) => bytes,
        Err(err) => return (StatusCode::BAD_REQUEST, err).into_response(),
    };
    let client_proof = match decode_base64_field(&request.client_proof, "client_proof") {
        Ok(bytes) => bytes,
        Err(err) => return (StatusCode::BAD_REQUEST, err).into_response(),
    };

    match state
        .srp()
        .complete_exchange(session_id, &client_public, &client_proof)
        .await
    {
        Ok(result) => {
            let response = LoginFinishResponse {
                user_id: result.user.id.to_string(),
                email: result.user.email.clone(),
                verified: result.user.verified,
                server_proof: encode_base64(&result.server_proof),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        // Handshake miss and proof mismatch both read as 401 out here; the
        // distinction exists at the coordinator for callers that need it.
        Err(SrpError::HandshakeNotFound | SrpError::InvalidClientProof) => {
            (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()).into_response()
        }
        Err(err) => {
            error!("Failed to complete SRP exchange: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Login failed".to_string(),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::state::AppState;
    use crate::srp::{PgSessionStore, SrpService};
    use crate::users::PgUserStore;
    use anyhow::Result;
    use axum::{http::StatusCode, response::IntoResponse};
    use sqlx::postgres::PgPoolOptions;

    fn app_state() -> Result<Arc<AppState>> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let state = AppState::new(
            SrpService::new(PgSessionStore::new(pool.clone())),
            PgUserStore::new(pool),
        );
        Ok(Arc::new(state))
    }

    #[tokio::test]
    async fn login_start_missing_payload() -> Result<()> {
        let state = app_state()?;
        let response = login_start(Extension(state), None).await.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn login_start_invalid_email() -> Result<()> {
        let state = app_state()?;
        let response = login_start(
            Extension(state),
            Some(Json(LoginStartRequest {
                email: "not-an-email".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn login_finish_missing_payload() -> Result<()> {
        let state = app_state()?;
        let response = login_finish(Extension(state), None).await.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn login_finish_malformed_session_id() -> Result<()> {
        let state = app_state()?;
        let response = login_finish(
            Extension(state),
            Some(Json(LoginFinishRequest {
                session_id: "not-a-uuid".to_string(),
                client_public_ephemeral: "AA==".to_string(),
                client_proof: "AA==".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn login_finish_bad_base64() -> Result<()> {
        let state = app_state()?;
        let response = login_finish(
            Extension(state),
            Some(Json(LoginFinishRequest {
                session_id: Uuid::new_v4().to_string(),
                client_public_ephemeral: "not base64!!!".to_string(),
                client_proof: "AA==".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }
}
