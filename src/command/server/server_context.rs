use crate::command::server::auth::SecretKeyAuthenticator;
use crate::command::server::error::Error;
use crate::command::server::upstream::UpstreamForwarder;
use crate::configuration::Configuration;

pub struct ServerContext {
    pub authenticator: SecretKeyAuthenticator,
    pub upstream: UpstreamForwarder,
}

impl ServerContext {
    pub fn new(config: &Configuration) -> Result<Self, Error> {
        let authenticator = SecretKeyAuthenticator::new(&config.auth)?;
        let upstream = UpstreamForwarder::new(&config.upstream)?;

        Ok(Self {
            authenticator,
            upstream,
        })
    }
}
