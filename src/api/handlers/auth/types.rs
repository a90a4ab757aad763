//! Request/response types for auth endpoints.
//!
//! All binary protocol values (salts, verifiers, ephemerals, proofs) travel
//! as standard base64.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginStartRequest {
    pub email: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginStartResponse {
    pub session_id: String,
    pub server_public_ephemeral: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginFinishRequest {
    pub session_id: String,
    pub client_public_ephemeral: String,
    pub client_proof: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginFinishResponse {
    pub user_id: String,
    pub email: String,
    pub verified: bool,
    pub server_proof: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RegisterRequest {
    pub email: String,
    pub salt: String,
    pub verifier: String,
    #[serde(default)]
    pub custom_attributes: Option<serde_json::Value>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct UserResponse {
    pub user_id: String,
    pub email: String,
    pub verified: bool,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct VerifyRequest {
    pub email: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RecoverRequest {
    pub email: String,
    pub salt: String,
    pub verifier: String,
}
