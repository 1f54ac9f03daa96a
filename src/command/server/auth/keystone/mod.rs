//! Token negotiation against a Keystone v2 identity service.
//!
//! A key pair is first sent as `apiAccessKeyCredentials` (access key / secret key). When
//! the service answers 401 the same pair is sent once more as native
//! `passwordCredentials`, so clients may supply either kind of credential in the same
//! slots. Token requests are never retried.

mod access;
mod error;
mod payload;
#[cfg(test)]
pub mod tests;

use std::time::Duration;

use chrono::Utc;
use reqwest::header::ACCEPT;
use reqwest::redirect::Policy;
use reqwest::{Client, Response, StatusCode};
use tracing::{debug, info, instrument, warn};

pub use access::AccessInfo;
use access::{ErrorResponse, TokenResponse};
pub use error::Error;
pub use payload::{AuthRequest, Scope};
use payload::{Credentials, Scheme};

use crate::metrics_provider::KEYSTONE_AUTH_ATTEMPTS;

static X_AUTH_TOKEN: &str = "X-Auth-Token";

pub struct CredentialNegotiator {
    client: Client,
}

impl CredentialNegotiator {
    pub fn new(timeout: Duration) -> Result<Self, Error> {
        let client = Client::builder()
            .redirect(Policy::none())
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Configuration(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// Obtain a token for `request`, falling back from the access key scheme to the
    /// password scheme on a 401.
    #[instrument(skip(self, request), fields(auth_url = %request.auth_url))]
    pub async fn authenticate(&self, request: &AuthRequest) -> Result<AccessInfo, Error> {
        let scheme = request.initial_scheme();

        match self.attempt(request, scheme).await {
            Err(Error::Unauthorized(msg)) if scheme == Scheme::AccessKey => {
                info!("Access key auth failed ({msg}); falling back to username/password");
                self.attempt(request, Scheme::Password).await
            }
            result => result,
        }
    }

    async fn attempt(&self, request: &AuthRequest, scheme: Scheme) -> Result<AccessInfo, Error> {
        let body = scheme.build_body(request)?;
        debug!("Requesting token using {} credentials", scheme.label());

        let mut builder = self
            .client
            .post(request.tokens_url())
            .header(ACCEPT, "application/json")
            .json(&body);

        if let Credentials::Token(token) = &request.credentials {
            builder = builder.header(X_AUTH_TOKEN, token.expose());
        }

        let result = match builder.send().await {
            Ok(response) => classify(response).await,
            Err(error) => Err(Error::from(error)),
        };

        let label = match &result {
            Ok(_) => "success",
            Err(error) => {
                if !error.is_credential_rejection() {
                    warn!("Token request using {} failed: {error}", scheme.label());
                }
                error.metric_label()
            }
        };

        KEYSTONE_AUTH_ATTEMPTS
            .with_label_values(&[scheme.label(), label])
            .inc();

        result
    }
}

async fn classify(response: Response) -> Result<AccessInfo, Error> {
    let status = response.status();
    let body = response.bytes().await?;

    if status.is_success() {
        let document: TokenResponse = serde_json::from_slice(&body)
            .map_err(|e| Error::Provider(format!("Unreadable token response: {e}")))?;

        let Some(access) = document.access else {
            let msg = "Token response does not contain an access document".to_string();
            return Err(Error::AuthorizationFailure(msg));
        };

        if access.token.is_expired(Utc::now()) {
            let msg = "Issued token has already expired".to_string();
            return Err(Error::AuthorizationFailure(msg));
        }

        return Ok(access);
    }

    let message = error_message(status, &body);
    match status {
        StatusCode::UNAUTHORIZED => Err(Error::Unauthorized(message)),
        StatusCode::FORBIDDEN => Err(Error::Forbidden(message)),
        StatusCode::NOT_FOUND => Err(Error::NotFound(message)),
        _ => Err(Error::Provider(format!("Unexpected status {status}: {message}"))),
    }
}

fn error_message(status: StatusCode, body: &[u8]) -> String {
    match serde_json::from_slice::<ErrorResponse>(body) {
        Ok(document) => document.error.message,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("Unknown error")
            .to_string(),
    }
}
