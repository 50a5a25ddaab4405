use axum::http::StatusCode;

pub const WELCOME: &str = "Welcome to the employee directory API!";

pub async fn home() -> &'static str {
    WELCOME
}

pub async fn health() -> StatusCode {
    StatusCode::OK
}
