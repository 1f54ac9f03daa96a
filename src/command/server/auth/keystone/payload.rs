use serde::Serialize;

use super::Error;
use crate::secret::Secret;

/// Tenant and trust scoping attached to a token request.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Scope {
    pub tenant_id: Option<String>,
    pub tenant_name: Option<String>,
    pub trust_id: Option<String>,
}

impl Scope {
    pub fn tenant(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: Some(tenant_id.into()),
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Credentials {
    /// A key pair; sent first as access/secret key, then as username/password.
    KeyPair {
        username: String,
        password: Secret<String>,
    },
    Token(Secret<String>),
}

/// A validated request for one negotiation.
#[derive(Clone, Debug, PartialEq)]
pub struct AuthRequest {
    pub auth_url: String,
    pub credentials: Credentials,
    pub scope: Scope,
}

fn non_empty<T: AsRef<str>>(value: Option<T>) -> Option<T> {
    value.filter(|v| !v.as_ref().is_empty())
}

impl AuthRequest {
    pub fn new(
        auth_url: &str,
        username: Option<String>,
        password: Option<Secret<String>>,
        token: Option<Secret<String>>,
        scope: Scope,
    ) -> Result<Self, Error> {
        if auth_url.is_empty() {
            let msg = "Cannot authenticate without a valid auth_url".to_string();
            return Err(Error::Configuration(msg));
        }

        let username = non_empty(username);
        let password = password.filter(|p| !p.expose().is_empty());
        let token = token.filter(|t| !t.expose().is_empty());

        let credentials = match (token, username, password) {
            (Some(token), None, None) => Credentials::Token(token),
            (None, Some(username), Some(password)) => Credentials::KeyPair { username, password },
            (Some(_), _, _) => {
                let msg = "Either a token or a username and password is required, not both";
                return Err(Error::InvalidCredentials(msg.to_string()));
            }
            _ => {
                let msg = "A username and password or token is required";
                return Err(Error::InvalidCredentials(msg.to_string()));
            }
        };

        let scope = Scope {
            tenant_id: non_empty(scope.tenant_id),
            tenant_name: non_empty(scope.tenant_name),
            trust_id: non_empty(scope.trust_id),
        };

        Ok(Self {
            auth_url: auth_url.to_string(),
            credentials,
            scope,
        })
    }

    pub fn tokens_url(&self) -> String {
        format!("{}/tokens", self.auth_url.trim_end_matches('/'))
    }

    /// The scheme of the first attempt for these credentials.
    pub fn initial_scheme(&self) -> Scheme {
        match self.credentials {
            Credentials::Token(_) => Scheme::Token,
            Credentials::KeyPair { .. } => Scheme::AccessKey,
        }
    }
}

/// The credential object placed in the token request body.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scheme {
    /// `apiAccessKeyCredentials`: the key pair read as an access key and a secret key.
    AccessKey,
    /// `passwordCredentials`: the key pair read as a username and a password.
    Password,
    Token,
}

impl Scheme {
    pub fn label(self) -> &'static str {
        match self {
            Scheme::AccessKey => "access_key",
            Scheme::Password => "password",
            Scheme::Token => "token",
        }
    }

    pub fn build_body<'a>(self, request: &'a AuthRequest) -> Result<TokenRequest<'a>, Error> {
        let credentials = match (self, &request.credentials) {
            (Scheme::Token, Credentials::Token(token)) => CredentialBody::Token {
                id: token.expose(),
            },
            (Scheme::AccessKey, Credentials::KeyPair { username, password }) => {
                CredentialBody::ApiAccessKey {
                    access_key: username,
                    secret_key: password.expose(),
                }
            }
            (Scheme::Password, Credentials::KeyPair { username, password }) => {
                CredentialBody::Password {
                    username,
                    password: password.expose(),
                }
            }
            (scheme, _) => {
                let msg = format!("Credentials cannot be sent as {}", scheme.label());
                return Err(Error::InvalidCredentials(msg));
            }
        };

        let scope = &request.scope;
        let tenant_id = scope.tenant_id.as_deref();
        let tenant_name = if tenant_id.is_some() {
            None
        } else {
            scope.tenant_name.as_deref()
        };

        Ok(TokenRequest {
            auth: AuthBody {
                credentials,
                tenant_id,
                tenant_name,
                trust_id: scope.trust_id.as_deref(),
            },
        })
    }
}

#[derive(Debug, Serialize)]
pub struct TokenRequest<'a> {
    auth: AuthBody<'a>,
}

#[derive(Debug, Serialize)]
struct AuthBody<'a> {
    #[serde(flatten)]
    credentials: CredentialBody<'a>,
    #[serde(rename = "tenantId", skip_serializing_if = "Option::is_none")]
    tenant_id: Option<&'a str>,
    #[serde(rename = "tenantName", skip_serializing_if = "Option::is_none")]
    tenant_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    trust_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
enum CredentialBody<'a> {
    #[serde(rename = "apiAccessKeyCredentials")]
    ApiAccessKey {
        #[serde(rename = "accessKey")]
        access_key: &'a str,
        #[serde(rename = "secretKey")]
        secret_key: &'a str,
    },
    #[serde(rename = "passwordCredentials")]
    Password {
        username: &'a str,
        password: &'a str,
    },
    #[serde(rename = "token")]
    Token { id: &'a str },
}
