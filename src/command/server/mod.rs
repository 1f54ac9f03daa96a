pub mod auth;
mod error;
mod http_server;
pub mod listener;
mod request_ext;
mod response_body;
mod server_context;
pub mod upstream;

use argh::FromArgs;

use crate::command;
use crate::configuration::Configuration;
pub use error::Error;
use listener::Listener;
use server_context::ServerContext;

#[derive(FromArgs, PartialEq, Debug)]
#[argh(
    subcommand,
    name = "serve",
    description = "Authenticate requests against the identity service and forward them upstream"
)]
pub struct Options {}

pub struct Command {
    listener: Listener,
}

impl Command {
    pub fn new(config: &Configuration) -> Result<Command, Error> {
        let context = ServerContext::new(config)?;
        let listener = Listener::new(&config.server, context);

        Ok(Command { listener })
    }

    pub async fn run(&self) -> Result<(), command::Error> {
        let tcp = self.listener.bind().await?;
        self.listener.serve(tcp).await?;

        Ok(())
    }
}
