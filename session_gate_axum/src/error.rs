use http::{Result as HttpResponse, StatusCode};
use session_gate::{ProviderError, SessionError};

/// Helper trait for converting errors to a standard response error format
pub trait IntoResponseError<T> {
    fn into_response_error(self) -> Result<T, (StatusCode, String)>;
}

pub(crate) fn status_for(err: &SessionError) -> StatusCode {
    match err {
        SessionError::MissingSession | SessionError::UserUnresolvable(_) => StatusCode::UNAUTHORIZED,
        SessionError::Provider(ProviderError::Rejected { .. })
        | SessionError::Provider(ProviderError::NoSessionReturned) => StatusCode::UNAUTHORIZED,
        SessionError::Provider(e) if e.is_transient() => StatusCode::BAD_GATEWAY,
        SessionError::Cookie(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl<T> IntoResponseError<T> for Result<T, SessionError> {
    fn into_response_error(self) -> Result<T, (StatusCode, String)> {
        self.map_err(|e| (status_for(&e), e.to_string()))
    }
}

/// Implementation for http::Error (used by Response::builder())
impl<T> IntoResponseError<T> for HttpResponse<T> {
    fn into_response_error(self) -> Result<T, (StatusCode, String)> {
        self.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
    }
}
