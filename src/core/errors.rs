use spin_sdk::http::Response;
use std::fmt;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized,
    InvalidCredentials,
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    MethodNotAllowed,
    InternalError(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            ApiError::Unauthorized => write!(f, "Unauthorized"),
            ApiError::InvalidCredentials => write!(f, "Invalid username and/or password."),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::MethodNotAllowed => write!(f, "Invalid request method."),
            ApiError::InternalError(msg) => write!(f, "Internal Error: {}", msg),
        }
    }
}

fn json_error(status: u16, msg: &str) -> Response {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&serde_json::json!({"error": msg})).unwrap())
        .build()
}

impl From<ApiError> for Response {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::BadRequest(msg) => json_error(400, &msg),
            ApiError::Unauthorized => json_error(401, "Unauthorized"),
            ApiError::InvalidCredentials => json_error(401, "Invalid username and/or password."),
            ApiError::Forbidden(msg) => json_error(403, &msg),
            ApiError::NotFound(msg) => json_error(404, &msg),
            ApiError::Conflict(msg) => json_error(409, &msg),
            ApiError::MethodNotAllowed => json_error(405, "Invalid request method."),
            ApiError::InternalError(msg) => json_error(500, &msg),
        }
    }
}

impl std::error::Error for ApiError {}

// Storage and serialization failures surface as 500s.
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::InternalError(err.to_string())
    }
}
