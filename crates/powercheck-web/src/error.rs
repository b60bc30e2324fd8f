use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use powercheck_core::PowercheckError;

pub(crate) fn error_response(
    err: &PowercheckError,
    operation: &str,
    resource: Option<String>,
) -> Response {
    let status = status_for(err);
    let payload = err.to_payload(operation, resource);
    (status, Json(payload)).into_response()
}

fn status_for(err: &PowercheckError) -> StatusCode {
    match err {
        PowercheckError::MalformedInput(_)
        | PowercheckError::InvalidIdentifier(_)
        | PowercheckError::Validation(_) => StatusCode::BAD_REQUEST,
        PowercheckError::NotFound(_) => StatusCode::NOT_FOUND,
        PowercheckError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        PowercheckError::Json(_) | PowercheckError::Bson(_) | PowercheckError::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
