use aws_smithy_runtime_api::box_error::BoxError;
use thiserror::Error;

/// The IMDS configuration could not be resolved
#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("Invalid IMDS endpoint `{endpoint}`")]
  InvalidEndpoint {
    endpoint: String,
    #[source]
    source: http::uri::InvalidUri,
  },

  /// Only `http` and `https` endpoints can serve instance metadata
  #[error("Unsupported IMDS endpoint scheme in `{0}`, expected http or https")]
  UnsupportedScheme(String),

  #[error("IMDS endpoint `{0}` does not contain a host")]
  MissingHost(String),

  #[error("Invalid IMDS endpoint mode `{0}`, expected IPv4 or IPv6")]
  InvalidEndpointMode(String),

  #[error("Max attempts must be at least 1")]
  MaxAttempts,

  #[error("Unable to construct the IMDS client")]
  Client(#[source] BoxError),
}

/// Errors returned when fetching the instance identity document
///
/// Both variants are transparent so the caller sees the underlying message unchanged
#[derive(Error, Debug)]
pub enum Error {
  #[error(transparent)]
  Config(#[from] ConfigError),

  /// The metadata request failed; holds the client's error as-is
  #[error(transparent)]
  Request(anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
