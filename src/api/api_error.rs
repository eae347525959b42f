use crate::error::Error;
use axum::extract::rejection::PathRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

pub(crate) struct APIError(anyhow::Error);

impl IntoResponse for APIError {
    fn into_response(self) -> Response {
        let any_err = self.0;
        let status = match any_err.downcast_ref::<Error>() {
            Some(
                Error::NotFound { .. }
                | Error::Render(_)
                | Error::UnknownGroup(_)
                | Error::EmptyGroup(_)
                | Error::UnknownMenu(_),
            ) => StatusCode::NOT_FOUND,
            Some(Error::InvalidHexAddr(_) | Error::InvalidAddr(_)) => StatusCode::BAD_REQUEST,
            None if any_err.is::<PathRejection>() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(json!({
            "error": format!("{any_err}"),
        }));
        (status, body).into_response()
    }
}

impl<E> From<E> for APIError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
