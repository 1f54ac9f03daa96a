use std::fmt;

/// Outcome classes of a negotiation with the identity service.
#[derive(Debug, PartialEq)]
pub enum Error {
    /// The identity endpoint is missing or unusable.
    Configuration(String),
    /// Neither a token nor a complete key pair was supplied.
    InvalidCredentials(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    /// The service answered but did not issue a token.
    AuthorizationFailure(String),
    /// Transport failure, unexpected status or unreadable response.
    Provider(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Configuration(err) => write!(f, "Configuration error: {err}"),
            Error::InvalidCredentials(err) => write!(f, "Invalid credentials: {err}"),
            Error::Unauthorized(err) => write!(f, "Unauthorized: {err}"),
            Error::Forbidden(err) => write!(f, "Forbidden: {err}"),
            Error::NotFound(err) => write!(f, "Not Found: {err}"),
            Error::AuthorizationFailure(err) => write!(f, "Authorization failure: {err}"),
            Error::Provider(err) => write!(f, "Identity provider error: {err}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Error::Provider(format!("Identity service request timed out: {error}"))
        } else {
            Error::Provider(format!("Identity service request failed: {error}"))
        }
    }
}

impl Error {
    /// Whether the service (or the caller) rejected the credentials themselves, as opposed
    /// to the exchange failing for operational reasons.
    pub fn is_credential_rejection(&self) -> bool {
        matches!(
            self,
            Error::InvalidCredentials(_)
                | Error::Unauthorized(_)
                | Error::Forbidden(_)
                | Error::NotFound(_)
                | Error::AuthorizationFailure(_)
        )
    }

    pub fn metric_label(&self) -> &'static str {
        match self {
            Error::Configuration(_) => "configuration",
            Error::InvalidCredentials(_) => "invalid_credentials",
            Error::Unauthorized(_) => "unauthorized",
            Error::Forbidden(_) => "forbidden",
            Error::NotFound(_) => "not_found",
            Error::AuthorizationFailure(_) => "authorization_failure",
            Error::Provider(_) => "provider_error",
        }
    }
}
