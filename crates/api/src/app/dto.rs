use axum::body::Bytes;
use serde::Serialize;
use serde_json::Value as JsonValue;

use roster_core::EmployeeFields;
use roster_infra::{DeleteReceipt, ServiceError, UpdateReceipt};

// -------------------------
// Request decoding
// -------------------------

/// Decode a create/update body into employee attributes.
///
/// An empty body means "no attributes supplied". Anything that is not a JSON
/// object, or carries a non-string attribute value, is a validation error.
/// Keys other than the known attributes are ignored.
pub fn decode_fields(body: &Bytes) -> Result<EmployeeFields, ServiceError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(EmployeeFields::default());
    }

    let value: JsonValue = serde_json::from_slice(body)
        .map_err(|e| ServiceError::Validation(format!("malformed JSON body: {e}")))?;
    if !value.is_object() {
        return Err(ServiceError::Validation(
            "request body must be a JSON object".to_string(),
        ));
    }

    serde_json::from_value(value)
        .map_err(|e| ServiceError::Validation(format!("invalid employee attributes: {e}")))
}

// -------------------------
// Response bodies
// -------------------------

#[derive(Debug, Serialize)]
pub struct UpdateResponse<I> {
    pub id: I,
    pub message: String,
    pub matched_count: u64,
    pub modified_count: u64,
}

impl<I> From<UpdateReceipt<I>> for UpdateResponse<I> {
    fn from(r: UpdateReceipt<I>) -> Self {
        let message = if r.matched_count == 0 {
            "no employee matched the identifier".to_string()
        } else {
            format!(
                "employee updated, {} matched, {} modified",
                r.matched_count, r.modified_count
            )
        };
        Self {
            id: r.id,
            message,
            matched_count: r.matched_count,
            modified_count: r.modified_count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse<I> {
    pub id: I,
    pub message: String,
    pub deleted_count: u64,
}

impl<I> From<DeleteReceipt<I>> for DeleteResponse<I> {
    fn from(r: DeleteReceipt<I>) -> Self {
        let message = if r.deleted_count == 0 {
            "no employee matched the identifier".to_string()
        } else {
            format!("employee deleted, {} removed", r.deleted_count)
        };
        Self {
            id: r.id,
            message,
            deleted_count: r.deleted_count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub message: String,
}
