mod error;
pub mod server;
pub mod token;

pub use error::Error;
