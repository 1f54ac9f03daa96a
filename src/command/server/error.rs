use std::fmt;

use hyper::StatusCode;
use serde_json::json;

use crate::command::server::auth::keystone;

#[derive(Debug, PartialEq)]
pub enum Error {
    Initialization(String),
    Execution(String),
    // mappable to classical HTTP responses
    AuthenticationRequired { auth_url: String },
    Unauthorized(String),
    BadRequest(String),
    BadGateway(String),
    Internal(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Initialization(err) | Error::Execution(err) => write!(f, "{err}"),
            Error::AuthenticationRequired { auth_url } => {
                write!(f, "Authentication required (auth url: {auth_url})")
            }
            Error::Unauthorized(err) => write!(f, "Unauthorized: {err}"),
            Error::BadRequest(err) => write!(f, "Bad Request: {err}"),
            Error::BadGateway(err) => write!(f, "Bad Gateway: {err}"),
            Error::Internal(err) => write!(f, "Internal Server Error: {err}"),
        }
    }
}

impl From<keystone::Error> for Error {
    fn from(error: keystone::Error) -> Self {
        match error {
            keystone::Error::Provider(_) => {
                Error::BadGateway("Identity service unavailable".to_string())
            }
            keystone::Error::Configuration(_) => {
                Error::Internal("Identity service misconfigured".to_string())
            }
            error => Error::Internal(error.to_string()),
        }
    }
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::AuthenticationRequired { .. } | Error::Unauthorized(_) => {
                StatusCode::UNAUTHORIZED
            }
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::BadGateway(_) => StatusCode::BAD_GATEWAY,
            Error::Initialization(_) | Error::Execution(_) | Error::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn as_json(&self, request_id: Option<&String>) -> serde_json::Value {
        let (code, message) = match self {
            Error::AuthenticationRequired { .. } => ("UNAUTHORIZED", "Authentication required"),
            Error::Unauthorized(msg) => ("UNAUTHORIZED", msg.as_str()),
            Error::BadRequest(msg) => ("BAD_REQUEST", msg.as_str()),
            Error::BadGateway(msg) => ("BAD_GATEWAY", msg.as_str()),
            Error::Initialization(msg) | Error::Execution(msg) | Error::Internal(msg) => {
                ("INTERNAL_SERVER_ERROR", msg.as_str())
            }
        };

        if let Some(request_id) = request_id {
            json!({
                "errors": [{
                    "code": code,
                    "message": message,
                    "detail": { "request_id": request_id }
                }]
            })
        } else {
            json!({
                "errors": [{
                    "code": code,
                    "message": message,
                }]
            })
        }
    }
}
