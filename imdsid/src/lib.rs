pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod imds;

use aws_smithy_runtime::client::http::hyper_014::HyperClientBuilder;
use aws_smithy_runtime_api::client::http::SharedHttpClient;
pub use cli::{Cli, Output};
pub use config::{ImdsConfig, Settings};
pub use error::{ConfigError, Error};
pub use fetch::{fetch_instance_id, fetch_instance_identity_document};
pub use imds::{IdentityDocumentClient, ImdsClient, InstanceIdentityDocument};

/// Get the HTTP client used to reach the instance metadata service
pub fn default_transport() -> SharedHttpClient {
  HyperClientBuilder::new().build_https()
}
