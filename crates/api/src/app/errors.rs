use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use roster_infra::ServiceError;

use crate::app::dto::ErrorBody;

/// Map a service failure onto an HTTP response.
///
/// Client mistakes are 400, a missing record is 404 with a JSON `null` body and
/// every backend failure is 500.
pub fn service_error_to_response(err: ServiceError, id: Option<&str>) -> axum::response::Response {
    match err {
        ServiceError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, id, msg),
        ServiceError::InvalidIdentifier(msg) => json_error(StatusCode::BAD_REQUEST, id, msg),
        ServiceError::NotFound => (StatusCode::NOT_FOUND, Json(serde_json::Value::Null)).into_response(),
        ServiceError::Store(e) => json_error(StatusCode::INTERNAL_SERVER_ERROR, id, e.to_string()),
    }
}

pub fn json_error(
    status: StatusCode,
    id: Option<&str>,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        Json(ErrorBody {
            id: id.map(str::to_string),
            message: message.into(),
        }),
    )
        .into_response()
}
