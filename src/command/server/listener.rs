use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use hyper_util::rt::TokioIo;
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::command::server::error::Error;
use crate::command::server::http_server::serve_request;
use crate::command::server::server_context::ServerContext;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    #[serde(default = "Config::default_bind_address")]
    pub bind_address: IpAddr,
    #[serde(default = "Config::default_port")]
    pub port: u16,
    #[serde(default = "Config::default_query_timeout")]
    pub query_timeout: u64,
    #[serde(default = "Config::default_query_timeout_grace_period")]
    pub query_timeout_grace_period: u64,
}

impl Config {
    fn default_bind_address() -> IpAddr {
        IpAddr::from(Ipv4Addr::from([0; 4]))
    }

    fn default_port() -> u16 {
        8004
    }

    fn default_query_timeout() -> u64 {
        3600
    }

    fn default_query_timeout_grace_period() -> u64 {
        60
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: Self::default_bind_address(),
            port: Self::default_port(),
            query_timeout: Self::default_query_timeout(),
            query_timeout_grace_period: Self::default_query_timeout_grace_period(),
        }
    }
}

pub struct Listener {
    binding_address: SocketAddr,
    context: Arc<ServerContext>,
    timeouts: Arc<[Duration; 2]>,
}

impl Listener {
    pub fn new(server_config: &Config, context: ServerContext) -> Self {
        let binding_address = SocketAddr::new(server_config.bind_address, server_config.port);

        let timeouts = [
            Duration::from_secs(server_config.query_timeout),
            Duration::from_secs(server_config.query_timeout_grace_period),
        ];

        Self {
            binding_address,
            context: Arc::new(context),
            timeouts: Arc::new(timeouts),
        }
    }

    pub async fn bind(&self) -> Result<TcpListener, Error> {
        TcpListener::bind(self.binding_address).await.map_err(|err| {
            let msg = format!("Failed to bind to {}: {err}", self.binding_address);
            Error::Initialization(msg)
        })
    }

    pub async fn serve(&self, listener: TcpListener) -> Result<(), Error> {
        if let Ok(local_address) = listener.local_addr() {
            info!("Listening on {local_address} (non-TLS)");
        }

        loop {
            let (tcp, remote_address) = listener.accept().await.map_err(|err| {
                let msg = format!("Failed to accept incoming connection: {err}");
                Error::Execution(msg)
            })?;

            debug!("Accepted connection from {remote_address}");
            let stream = TokioIo::new(tcp);

            tokio::spawn(serve_request(
                stream,
                Arc::clone(&self.context),
                Arc::clone(&self.timeouts),
                remote_address,
            ));
        }
    }
}
