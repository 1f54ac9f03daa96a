use std::time::Duration;

use hyper::http::request::Parts;
use hyper::{Request, Response, Uri};
use serde::Deserialize;
use tracing::{debug, error, info, instrument, warn};

use super::Forward;
use super::identity_headers::IdentityHeaders;
use super::keystone::{AuthRequest, CredentialNegotiator, Scope};
use crate::command::server::error::Error;
use crate::command::server::request_ext::HeaderExt;
use crate::command::server::response_body::ResponseBody;
use crate::metrics_provider::REQUEST_AUTHENTICATIONS;
use crate::secret::Secret;

pub static X_AUTH_USER: &str = "X-Auth-User";
pub static X_AUTH_KEY: &str = "X-Auth-Key";
pub static X_AUTH_URL: &str = "X-Auth-Url";

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub auth_uri: String,
    /// Take the identity service endpoint from the `X-Auth-Url` request header.
    #[serde(default)]
    pub multi_cloud: bool,
    #[serde(default)]
    pub allowed_auth_uris: Vec<String>,
    #[serde(default = "Config::default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Config {
    fn default_timeout_ms() -> u64 {
        10_000
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.multi_cloud {
            if self.allowed_auth_uris.is_empty() {
                warn!("multi_cloud is enabled with an empty allowed_auth_uris list");
            }
            return Ok(());
        }

        if self.auth_uri.is_empty() {
            return Err("auth.auth_uri is required unless multi_cloud is enabled".to_string());
        }

        if !is_valid_auth_url(&self.auth_uri) {
            return Err(format!(
                "auth.auth_uri '{}' is not a valid http(s) URL",
                self.auth_uri
            ));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            auth_uri: String::new(),
            multi_cloud: false,
            allowed_auth_uris: Vec::new(),
            timeout_ms: Self::default_timeout_ms(),
        }
    }
}

fn is_valid_auth_url(url: &str) -> bool {
    let Ok(uri) = url.parse::<Uri>() else {
        return false;
    };

    matches!(uri.scheme_str(), Some("http" | "https")) && uri.authority().is_some()
}

/// Authenticates requests carrying an access/secret key pair in `X-Auth-User` and
/// `X-Auth-Key`, scoped to the tenant named by the first path segment.
pub struct SecretKeyAuthenticator {
    config: Config,
    negotiator: CredentialNegotiator,
}

impl SecretKeyAuthenticator {
    pub fn new(config: &Config) -> Result<Self, Error> {
        let negotiator = CredentialNegotiator::new(Duration::from_millis(config.timeout_ms))
            .map_err(|e| Error::Initialization(e.to_string()))?;

        Ok(Self {
            config: config.clone(),
            negotiator,
        })
    }

    pub fn resolve_auth_url(&self, parts: &Parts) -> Result<String, Error> {
        if !self.config.multi_cloud {
            return Ok(self.config.auth_uri.clone());
        }

        let Some(auth_url) = parts.get_header(X_AUTH_URL) else {
            let msg = format!("Request missing required header {X_AUTH_URL}");
            return Err(Error::BadRequest(msg));
        };

        if !is_valid_auth_url(&auth_url) {
            let msg = format!("Header {X_AUTH_URL} \"{auth_url}\" is not a valid URL");
            return Err(Error::BadRequest(msg));
        }

        if !self.config.allowed_auth_uris.contains(&auth_url) {
            let msg = format!("Header {X_AUTH_URL} \"{auth_url}\" not an allowed endpoint");
            return Err(Error::Unauthorized(msg));
        }

        Ok(auth_url)
    }

    /// Authenticate `request` and hand it to `forward` with the identity headers attached.
    #[instrument(skip(self, request, forward), fields(path = %request.uri().path()))]
    pub async fn handle<B, F>(
        &self,
        request: Request<B>,
        forward: &F,
    ) -> Result<Response<ResponseBody>, Error>
    where
        B: Send + 'static,
        F: Forward<B> + ?Sized,
    {
        let (mut parts, body) = request.into_parts();

        let username = parts.get_header(X_AUTH_USER);
        let password = parts.get_header(X_AUTH_KEY).map(Secret::new);
        let tenant = parts.tenant().map(ToString::to_string);

        let auth_url = self.resolve_auth_url(&parts).inspect_err(|e| {
            debug!("Rejecting request: {e}");
            REQUEST_AUTHENTICATIONS
                .with_label_values(&["invalid_auth_url"])
                .inc();
        })?;

        let Some(tenant) = tenant else {
            debug!("Rejecting request without tenant in path");
            REQUEST_AUTHENTICATIONS.with_label_values(&["rejected"]).inc();
            return Err(Error::AuthenticationRequired { auth_url });
        };

        let auth_request =
            AuthRequest::new(&auth_url, username, password, None, Scope::tenant(tenant));
        let result = match auth_request {
            Ok(auth_request) => self.negotiator.authenticate(&auth_request).await,
            Err(e) => Err(e),
        };

        let access = match result {
            Ok(access) => access,
            Err(e) if e.is_credential_rejection() => {
                info!("Authentication rejected: {e}");
                REQUEST_AUTHENTICATIONS.with_label_values(&["rejected"]).inc();
                return Err(Error::AuthenticationRequired { auth_url });
            }
            Err(e) => {
                error!("Authentication failed: {e}");
                REQUEST_AUTHENTICATIONS.with_label_values(&["failed"]).inc();
                return Err(e.into());
            }
        };

        IdentityHeaders::from_access(&access, &auth_url)?.apply(&mut parts.headers);
        parts.extensions.insert(access);
        REQUEST_AUTHENTICATIONS
            .with_label_values(&["authenticated"])
            .inc();

        forward.forward(Request::from_parts(parts, body)).await
    }
}
