pub mod auth;
pub mod health;

use axum::response::IntoResponse;

// Root is intentionally undocumented in the OpenAPI spec.
pub async fn root() -> impl IntoResponse {
    concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"))
}
