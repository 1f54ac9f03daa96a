pub mod authenticator;
pub mod identity_headers;
pub mod keystone;

use async_trait::async_trait;
use hyper::{Request, Response};

use crate::command::server::error::Error;
use crate::command::server::response_body::ResponseBody;
pub use authenticator::{Config, SecretKeyAuthenticator};
pub use identity_headers::IdentityHeaders;

/// The next handler in the pipeline, invoked once a request has been authenticated.
#[async_trait]
pub trait Forward<B: Send + 'static>: Send + Sync {
    async fn forward(&self, request: Request<B>) -> Result<Response<ResponseBody>, Error>;
}
