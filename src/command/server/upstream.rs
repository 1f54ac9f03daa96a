use std::sync::Arc;

use async_trait::async_trait;
use hyper::body::Incoming;
use hyper::header::HOST;
use hyper::http::uri::PathAndQuery;
use hyper::{Request, Response, Uri};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use rustls::RootCertStore;
use rustls::pki_types::CertificateDer;
use rustls::pki_types::pem::PemObject;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::command::server::auth::Forward;
use crate::command::server::error::Error;
use crate::command::server::response_body::ResponseBody;

/// The service that receives authenticated requests.
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub url: String,
    /// PEM bundle used instead of the platform roots to verify an `https` upstream.
    #[serde(default)]
    pub server_ca_bundle: Option<String>,
}

impl Config {
    pub fn validate(&self) -> Result<(), String> {
        let uri = self
            .url
            .parse::<Uri>()
            .map_err(|e| format!("upstream.url '{}' is not a valid URL: {e}", self.url))?;

        if uri.scheme().is_none() || uri.authority().is_none() {
            return Err(format!(
                "upstream.url '{}' must be an absolute URL with scheme and host",
                self.url
            ));
        }

        Ok(())
    }
}

pub struct UpstreamForwarder {
    base: Uri,
    client: Client<HttpsConnector<HttpConnector>, Incoming>,
}

impl UpstreamForwarder {
    pub fn new(config: &Config) -> Result<Self, Error> {
        config.validate().map_err(Error::Initialization)?;
        let base = config.url.parse::<Uri>().map_err(|e| {
            let msg = format!("Invalid upstream URL: {e}");
            Error::Initialization(msg)
        })?;

        let tls_config = build_tls_config(config.server_ca_bundle.as_deref())?;
        let connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_tls_config(tls_config)
            .https_or_http()
            .enable_http1()
            .build();

        let client = Client::builder(TokioExecutor::new()).build(connector);

        Ok(Self { base, client })
    }

    /// Maps the incoming request target onto the upstream base URL, keeping path and query.
    pub fn target_uri(&self, uri: &Uri) -> Result<Uri, Error> {
        let prefix = self.base.path().trim_end_matches('/');
        let path_and_query = uri.path_and_query().map_or("/", PathAndQuery::as_str);

        let mut parts = self.base.clone().into_parts();
        parts.path_and_query = Some(
            format!("{prefix}{path_and_query}")
                .parse::<PathAndQuery>()
                .map_err(|e| Error::BadRequest(format!("Invalid request target: {e}")))?,
        );

        Uri::from_parts(parts).map_err(|e| Error::Internal(format!("Invalid upstream URI: {e}")))
    }
}

fn build_tls_config(server_ca_bundle: Option<&str>) -> Result<rustls::ClientConfig, Error> {
    let mut root_store = RootCertStore::empty();
    let certs = if let Some(server_ca_bundle) = server_ca_bundle {
        CertificateDer::pem_file_iter(server_ca_bundle)
            .and_then(|certs| certs.collect::<Result<Vec<_>, _>>())
            .map_err(|e| {
                let msg = format!("Failed to read CA bundle {server_ca_bundle}: {e}");
                Error::Initialization(msg)
            })?
    } else {
        let native = rustls_native_certs::load_native_certs();
        for error in &native.errors {
            warn!("Skipping platform certificate: {error}");
        }
        native.certs
    };
    root_store.add_parsable_certificates(certs);

    let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
    let config = rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| Error::Initialization(format!("Invalid TLS configuration: {e}")))?
        .with_root_certificates(root_store)
        .with_no_client_auth();

    Ok(config)
}

#[async_trait]
impl Forward<Incoming> for UpstreamForwarder {
    #[instrument(skip(self, request), fields(method = %request.method()))]
    async fn forward(&self, request: Request<Incoming>) -> Result<Response<ResponseBody>, Error> {
        let (mut parts, body) = request.into_parts();

        parts.uri = self.target_uri(&parts.uri)?;
        parts.headers.remove(HOST);
        debug!("Forwarding request to {}", parts.uri);

        let response = self
            .client
            .request(Request::from_parts(parts, body))
            .await
            .map_err(|e| {
                warn!("Upstream request failed: {e}");
                Error::BadGateway("Upstream unavailable".to_string())
            })?;

        Ok(response.map(ResponseBody::Upstream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forwarder(url: &str) -> UpstreamForwarder {
        UpstreamForwarder::new(&Config {
            url: url.to_string(),
            server_ca_bundle: None,
        })
        .unwrap()
    }

    #[test]
    fn test_validate() {
        let config = |url: &str| Config {
            url: url.to_string(),
            server_ca_bundle: None,
        };

        assert!(config("http://heat-api:8004").validate().is_ok());
        assert!(config("/v1/stacks").validate().is_err());
        assert!(config("not a url").validate().is_err());
    }

    #[test]
    fn test_target_uri_keeps_path_and_query() {
        let forwarder = forwarder("http://heat-api:8004");
        let uri: Uri = "/123/stacks?limit=5".parse().unwrap();

        assert_eq!(
            forwarder.target_uri(&uri).unwrap(),
            "http://heat-api:8004/123/stacks?limit=5"
        );
    }

    #[test]
    fn test_missing_ca_bundle() {
        let result = UpstreamForwarder::new(&Config {
            url: "https://heat-api:8004".to_string(),
            server_ca_bundle: Some("/nonexistent/ca.pem".to_string()),
        });

        assert!(matches!(result, Err(Error::Initialization(msg)) if msg.contains("CA bundle")));
    }

    #[test]
    fn test_target_uri_with_base_path() {
        let forwarder = forwarder("https://cloud.example.com/orchestration/");
        let uri: Uri = "/123/stacks".parse().unwrap();

        assert_eq!(
            forwarder.target_uri(&uri).unwrap(),
            "https://cloud.example.com/orchestration/123/stacks"
        );
    }
}
