use std::time::Duration;

use argh::FromArgs;

use crate::command;
use crate::command::server::auth;
use crate::command::server::auth::IdentityHeaders;
use crate::command::server::auth::keystone::{AuthRequest, CredentialNegotiator, Scope};
use crate::secret::Secret;

#[derive(FromArgs, PartialEq, Debug)]
#[argh(
    subcommand,
    name = "token",
    description = "Request a token with an access/secret key pair and print the identity headers"
)]
pub struct Options {
    #[argh(option)]
    /// tenant identifier to scope the token to
    pub tenant: String,
    #[argh(option)]
    /// access key (or user name)
    pub username: String,
    #[argh(option)]
    /// identity service endpoint, defaults to `auth.auth_uri`
    pub auth_url: Option<String>,
}

pub struct Command {
    auth_url: String,
    tenant: String,
    username: String,
    negotiator: CredentialNegotiator,
}

impl Command {
    pub fn new(options: &Options, config: &auth::Config) -> Result<Self, command::Error> {
        let auth_url = options
            .auth_url
            .clone()
            .unwrap_or_else(|| config.auth_uri.clone());
        let negotiator = CredentialNegotiator::new(Duration::from_millis(config.timeout_ms))?;

        Ok(Self {
            auth_url,
            tenant: options.tenant.clone(),
            username: options.username.clone(),
            negotiator,
        })
    }

    pub async fn run(&self) -> Result<(), command::Error> {
        let secret_key = Secret::new(rpassword::prompt_password("Secret key: ")?);
        let headers = self.authenticate(secret_key).await?;

        for line in render(&headers) {
            println!("{line}");
        }

        Ok(())
    }

    async fn authenticate(
        &self,
        secret_key: Secret<String>,
    ) -> Result<IdentityHeaders, command::Error> {
        let request = AuthRequest::new(
            &self.auth_url,
            Some(self.username.clone()),
            Some(secret_key),
            None,
            Scope::tenant(self.tenant.clone()),
        )?;

        let access = self.negotiator.authenticate(&request).await?;
        Ok(IdentityHeaders::from_access(&access, &self.auth_url)?)
    }
}

fn render(headers: &IdentityHeaders) -> Vec<String> {
    headers
        .iter()
        .map(|(name, value)| {
            let value = if value.is_sensitive() {
                "[REDACTED]"
            } else {
                value.to_str().unwrap_or("<binary>")
            };
            format!("{name}: {value}")
        })
        .collect()
}
