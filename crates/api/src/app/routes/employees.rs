use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use roster_infra::{CrudService, EmployeeStore};

use crate::app::{dto, errors};

pub async fn list_employees<S: EmployeeStore>(
    Extension(service): Extension<Arc<CrudService<S>>>,
) -> axum::response::Response {
    match service.list_employees().await {
        Ok(employees) => (StatusCode::OK, Json(employees)).into_response(),
        Err(e) => errors::service_error_to_response(e, None),
    }
}

pub async fn get_employee<S: EmployeeStore>(
    Extension(service): Extension<Arc<CrudService<S>>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    match service.get_employee(&id).await {
        Ok(employee) => (StatusCode::OK, Json(employee)).into_response(),
        Err(e) => errors::service_error_to_response(e, Some(&id)),
    }
}

pub async fn create_employee<S: EmployeeStore>(
    Extension(service): Extension<Arc<CrudService<S>>>,
    body: Bytes,
) -> axum::response::Response {
    let fields = match dto::decode_fields(&body) {
        Ok(f) => f,
        Err(e) => return errors::service_error_to_response(e, None),
    };

    match service.create_employee(fields).await {
        Ok(employee) => (StatusCode::CREATED, Json(employee)).into_response(),
        Err(e) => errors::service_error_to_response(e, None),
    }
}

pub async fn update_employee<S: EmployeeStore>(
    Extension(service): Extension<Arc<CrudService<S>>>,
    Path(id): Path<String>,
    body: Bytes,
) -> axum::response::Response {
    // Identifier first: a bad id is reported even when the body is bad too.
    if let Err(e) = service.parse_id(&id) {
        return errors::service_error_to_response(e, Some(&id));
    }
    let patch = match dto::decode_fields(&body) {
        Ok(f) => f,
        Err(e) => return errors::service_error_to_response(e, Some(&id)),
    };

    match service.update_employee(&id, patch).await {
        Ok(receipt) => (StatusCode::OK, Json(dto::UpdateResponse::from(receipt))).into_response(),
        Err(e) => errors::service_error_to_response(e, Some(&id)),
    }
}

pub async fn delete_employee<S: EmployeeStore>(
    Extension(service): Extension<Arc<CrudService<S>>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    match service.delete_employee(&id).await {
        Ok(receipt) => (StatusCode::OK, Json(dto::DeleteResponse::from(receipt))).into_response(),
        Err(e) => errors::service_error_to_response(e, Some(&id)),
    }
}
