use std::{fmt, io};

use opentelemetry_otlp::ExporterBuildError;
use tracing::debug;

#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    ConfigurationFileFormat(String),
    Validation(String),
    ExporterInit(ExporterBuildError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "IO error: {err}"),
            Error::ConfigurationFileFormat(error) => {
                write!(f, "Configuration file format error: ")?;
                write!(f, "{error}")
            }
            Error::Validation(error) => write!(f, "Invalid configuration: {error}"),
            Error::ExporterInit(error) => {
                write!(f, "Exporter initialization error: {error}")
            }
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(error: toml::de::Error) -> Self {
        debug!("TOML error: {error}");
        Error::ConfigurationFileFormat(error.to_string())
    }
}

impl From<ExporterBuildError> for Error {
    fn from(error: ExporterBuildError) -> Self {
        Error::ExporterInit(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = Error::Validation("auth_uri is required".to_string());
        assert_eq!(format!("{error}"), "Invalid configuration: auth_uri is required");

        let error = Error::ConfigurationFileFormat("expected `]`".to_string());
        assert_eq!(
            format!("{error}"),
            "Configuration file format error: expected `]`"
        );
    }

    #[test]
    fn test_from_io_error() {
        let error = Error::from(io::Error::new(io::ErrorKind::NotFound, "missing"));
        assert_eq!(format!("{error}"), "IO error: missing");
    }
}
