use std::{env, time::Duration};

use aws_config::{imds::client::EndpointMode, provider_config::ProviderConfig};
use aws_smithy_runtime_api::client::http::SharedHttpClient;
use clap::Args;
use http::Uri;
use tracing::debug;

use crate::error::ConfigError;

const DEFAULT_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_TIMEOUT_SECS: u64 = 5;
const TOKEN_TTL: Duration = Duration::from_secs(900);

const ENV_ENDPOINT: &str = "AWS_EC2_METADATA_SERVICE_ENDPOINT";
const ENV_ENDPOINT_MODE: &str = "AWS_EC2_METADATA_SERVICE_ENDPOINT_MODE";

/// User supplied settings for the IMDS client
#[derive(Args, Clone, Debug)]
pub struct Settings {
  /// Override the IMDS endpoint (i.e. - http://169.254.169.254 or http://[fd00:ec2::254])
  ///
  /// Takes precedence over `AWS_EC2_METADATA_SERVICE_ENDPOINT`
  #[arg(long, env = "IMDS_ENDPOINT")]
  pub endpoint: Option<String>,

  /// The IMDS endpoint mode (IPv4 | IPv6), used when no endpoint is set
  ///
  /// Takes precedence over `AWS_EC2_METADATA_SERVICE_ENDPOINT_MODE`
  #[arg(long)]
  pub endpoint_mode: Option<String>,

  /// The maximum number of attempts the metadata client makes per request
  #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS)]
  pub max_attempts: u32,

  /// Connect and read timeout for requests to IMDS, in seconds
  #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
  pub timeout: u64,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      endpoint: None,
      endpoint_mode: None,
      max_attempts: DEFAULT_MAX_ATTEMPTS,
      timeout: DEFAULT_TIMEOUT_SECS,
    }
  }
}

/// Resolved configuration used to construct a metadata client
///
/// Built fresh for every lookup; carries the shared environment configuration
/// of the AWS SDK with the caller's transport installed
#[derive(Debug)]
pub struct ImdsConfig {
  provider: ProviderConfig,
  endpoint: Option<Uri>,
  endpoint_mode: Option<EndpointMode>,
  max_attempts: u32,
  token_ttl: Duration,
  connect_timeout: Duration,
  read_timeout: Duration,
}

impl ImdsConfig {
  /// Resolve the configuration from the transport, settings, and process environment
  ///
  /// The region is left unset since IMDS does not use it, and resolving it
  /// could itself call out to IMDS
  pub fn load(transport: SharedHttpClient, settings: &Settings) -> Result<Self, ConfigError> {
    Self::load_with_env(transport, settings, |name| env::var(name).ok())
  }

  /// Settings take precedence over the values found through `lookup`
  fn load_with_env<E>(transport: SharedHttpClient, settings: &Settings, lookup: E) -> Result<Self, ConfigError>
  where
    E: Fn(&str) -> Option<String>,
  {
    let endpoint = match settings.endpoint.clone().or_else(|| lookup(ENV_ENDPOINT)) {
      Some(endpoint) => Some(parse_endpoint(&endpoint)?),
      None => None,
    };

    let endpoint_mode = match settings.endpoint_mode.clone().or_else(|| lookup(ENV_ENDPOINT_MODE)) {
      Some(mode) => Some(parse_endpoint_mode(&mode)?),
      None => None,
    };

    if settings.max_attempts == 0 {
      return Err(ConfigError::MaxAttempts);
    }

    let timeout = Duration::from_secs(settings.timeout);
    let config = ImdsConfig {
      provider: ProviderConfig::without_region().with_http_client(transport),
      endpoint,
      endpoint_mode,
      max_attempts: settings.max_attempts,
      token_ttl: TOKEN_TTL,
      connect_timeout: timeout,
      read_timeout: timeout,
    };
    debug!(
      endpoint = ?config.endpoint,
      endpoint_mode = ?config.endpoint_mode,
      max_attempts = config.max_attempts,
      "Resolved IMDS configuration"
    );

    Ok(config)
  }

  pub fn provider(&self) -> &ProviderConfig {
    &self.provider
  }

  /// The endpoint override, if one was provided
  pub fn endpoint(&self) -> Option<&Uri> {
    self.endpoint.as_ref()
  }

  pub fn endpoint_mode(&self) -> Option<&EndpointMode> {
    self.endpoint_mode.as_ref()
  }

  pub fn max_attempts(&self) -> u32 {
    self.max_attempts
  }

  pub fn token_ttl(&self) -> Duration {
    self.token_ttl
  }

  pub fn connect_timeout(&self) -> Duration {
    self.connect_timeout
  }

  pub fn read_timeout(&self) -> Duration {
    self.read_timeout
  }
}

/// Parse and validate an endpoint override
fn parse_endpoint(endpoint: &str) -> Result<Uri, ConfigError> {
  let uri = endpoint.parse::<Uri>().map_err(|source| ConfigError::InvalidEndpoint {
    endpoint: endpoint.to_owned(),
    source,
  })?;

  match uri.scheme_str() {
    Some("http") | Some("https") => {}
    _ => return Err(ConfigError::UnsupportedScheme(endpoint.to_owned())),
  }

  if uri.host().is_none() {
    return Err(ConfigError::MissingHost(endpoint.to_owned()));
  }

  Ok(uri)
}

/// Endpoint modes are matched case-insensitively, as the AWS SDK does
fn parse_endpoint_mode(mode: &str) -> Result<EndpointMode, ConfigError> {
  if mode.eq_ignore_ascii_case("IPv4") {
    Ok(EndpointMode::IpV4)
  } else if mode.eq_ignore_ascii_case("IPv6") {
    Ok(EndpointMode::IpV6)
  } else {
    Err(ConfigError::InvalidEndpointMode(mode.to_owned()))
  }
}
