use axum::{
    routing::{get, post},
    Router,
};

use roster_infra::EmployeeStore;

pub mod employees;
pub mod system;

/// Router for the employee endpoints, generic over the active store.
///
/// Expects an `Extension<Arc<CrudService<S>>>` layered on top.
pub fn router<S: EmployeeStore>() -> Router {
    Router::new()
        .route("/employees", get(employees::list_employees::<S>))
        .route("/employee", post(employees::create_employee::<S>))
        .route(
            "/employee/:id",
            get(employees::get_employee::<S>)
                .put(employees::update_employee::<S>)
                .delete(employees::delete_employee::<S>),
        )
}
