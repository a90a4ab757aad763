//! Account lifecycle endpoints: registration, verification, recovery.
//!
//! The password payload (salt + verifier) is derived client-side; these
//! handlers only ever move opaque bytes into the user store.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use tracing::error;
use uuid::Uuid;

use super::{
    types::{RecoverRequest, RegisterRequest, UserResponse, VerifyRequest},
    utils::{decode_base64_field, normalize_email, valid_email},
};
use crate::api::state::AppState;
use crate::users::{CreateOutcome, PasswordPayload, VerifyOutcome};

fn decode_password_payload(salt: &str, verifier: &str) -> Result<PasswordPayload, String> {
    let salt = decode_base64_field(salt, "salt")?;
    let verifier = decode_base64_field(verifier, "verifier")?;
    if salt.is_empty() || verifier.is_empty() {
        return Err("Empty salt or verifier".to_string());
    }
    Ok(PasswordPayload { salt, verifier })
}

#[utoipa::path(
    post,
    path = "/v1/users",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registration successful", body = UserResponse),
        (status = 400, description = "Validation error", body = String),
        (status = 409, description = "User already exists", body = String),
        (status = 500, description = "Registration failed", body = String)
    ),
    tag = "users"
)]
pub async fn register(
    state: Extension<Arc<AppState>>,
    payload: Option<Json<RegisterRequest>>,
) -> impl IntoResponse {
    let request: RegisterRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return (StatusCode::BAD_REQUEST, "Invalid email".to_string()).into_response();
    }

    let password = match decode_password_payload(&request.salt, &request.verifier) {
        Ok(password) => password,
        Err(err) => return (StatusCode::BAD_REQUEST, err).into_response(),
    };

    let custom_attributes = match request.custom_attributes {
        None => serde_json::Map::new(),
        Some(serde_json::Value::Object(map)) => map,
        Some(_) => {
            return (
                StatusCode::BAD_REQUEST,
                "custom_attributes must be an object".to_string(),
            )
                .into_response();
        }
    };

    match state
        .users()
        .create(&email, &password, &custom_attributes)
        .await
    {
        Ok(CreateOutcome::Created(user)) => {
            let response = UserResponse {
                user_id: user.id.to_string(),
                email: user.email,
                verified: user.verified,
            };
            (StatusCode::CREATED, Json(response)).into_response()
        }
        Ok(CreateOutcome::Conflict) => {
            (StatusCode::CONFLICT, "User already exists".to_string()).into_response()
        }
        Err(err) => {
            error!("Failed to register user: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Registration failed".to_string(),
            )
                .into_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/v1/users/{id}",
    params(
        ("id" = String, Path, description = "User id")
    ),
    responses(
        (status = 200, description = "User found", body = UserResponse),
        (status = 400, description = "Malformed user id", body = String),
        (status = 404, description = "Unknown user", body = String)
    ),
    tag = "users"
)]
pub async fn get_user(
    state: Extension<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let Ok(id) = Uuid::parse_str(id.trim()) else {
        return (StatusCode::BAD_REQUEST, "Invalid user id".to_string()).into_response();
    };

    match state.users().by_id(id).await {
        Ok(Some(user)) => {
            let response = UserResponse {
                user_id: user.id.to_string(),
                email: user.email,
                verified: user.verified,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Ok(None) => (StatusCode::NOT_FOUND, "Unknown user".to_string()).into_response(),
        Err(err) => {
            error!("Failed to fetch user: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Lookup failed".to_string(),
            )
                .into_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/v1/users/verify",
    request_body = VerifyRequest,
    responses(
        (status = 204, description = "User marked as verified"),
        (status = 400, description = "Validation error", body = String),
        (status = 404, description = "Unknown user", body = String),
        (status = 409, description = "Already verified", body = String)
    ),
    tag = "users"
)]
pub async fn verify(
    state: Extension<Arc<AppState>>,
    payload: Option<Json<VerifyRequest>>,
) -> impl IntoResponse {
    let request: VerifyRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return (StatusCode::BAD_REQUEST, "Invalid email".to_string()).into_response();
    }

    match state.users().mark_verified(&email).await {
        Ok(VerifyOutcome::Verified) => StatusCode::NO_CONTENT.into_response(),
        Ok(VerifyOutcome::AlreadyVerified) => {
            (StatusCode::CONFLICT, "Already verified".to_string()).into_response()
        }
        Ok(VerifyOutcome::Unknown) => {
            (StatusCode::NOT_FOUND, "Unknown user".to_string()).into_response()
        }
        Err(err) => {
            error!("Failed to verify user: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Verification failed".to_string(),
            )
                .into_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/v1/users/recover",
    request_body = RecoverRequest,
    responses(
        (status = 204, description = "Password payload replaced"),
        (status = 400, description = "Validation error", body = String),
        (status = 404, description = "Unknown user", body = String)
    ),
    tag = "users"
)]
pub async fn recover(
    state: Extension<Arc<AppState>>,
    payload: Option<Json<RecoverRequest>>,
) -> impl IntoResponse {
    let request: RecoverRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return (StatusCode::BAD_REQUEST, "Invalid email".to_string()).into_response();
    }

    let password = match decode_password_payload(&request.salt, &request.verifier) {
        Ok(password) => password,
        Err(err) => return (StatusCode::BAD_REQUEST, err).into_response(),
    };

    match state.users().reset_password(&email, &password).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => (StatusCode::NOT_FOUND, "Unknown user".to_string()).into_response(),
        Err(err) => {
            error!("Failed to reset password payload: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Recovery failed".to_string(),
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
    async fn register_missing_payload() -> Result<()> {
        let state = app_state()?;
        let response = register(Extension(state), None).await.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn register_rejects_non_object_attributes() -> Result<()> {
        let state = app_state()?;
        let response = register(
            Extension(state),
            Some(Json(RegisterRequest {
                email: "alice@example.com".to_string(),
                salt: "c2FsdA==".to_string(),
                verifier: "dmVyaWZpZXI=".to_string(),
                custom_attributes: Some(serde_json::json!("not an object")),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn register_rejects_empty_salt() -> Result<()> {
        let state = app_state()?;
        let response = register(
            Extension(state),
            Some(Json(RegisterRequest {
                email: "alice@example.com".to_string(),
                salt: String::new(),
                verifier: "dmVyaWZpZXI=".to_string(),
                custom_attributes: None,
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn get_user_malformed_id() -> Result<()> {
        let state = app_state()?;
        let response = get_user(Extension(state), Path("not-a-uuid".to_string()))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn verify_invalid_email() -> Result<()> {
        let state = app_state()?;
        let response = verify(
            Extension(state),
            Some(Json(VerifyRequest {
                email: "nope".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn recover_bad_base64() -> Result<()> {
        let state = app_state()?;
        let response = recover(
            Extension(state),
            Some(Json(RecoverRequest {
                email: "alice@example.com".to_string(),
                salt: "!!!".to_string(),
                verifier: "dmVyaWZpZXI=".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }
}
