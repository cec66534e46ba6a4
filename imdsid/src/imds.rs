use std::future::Future;

use anyhow::Result;
use aws_config::imds::client::Client;
use serde::{Deserialize, Serialize};

use crate::{config::ImdsConfig, error::ConfigError};

const IDENTITY_DOCUMENT_PATH: &str = "/latest/dynamic/instance-identity/document";

/// EC2 instance identity document
///
/// https://docs.aws.amazon.com/AWSEC2/latest/UserGuide/instance-identity-documents.html
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceIdentityDocument {
  /// The ID of the instance
  pub instance_id: String,
  /// The ID of the AWS account that launched the instance
  pub account_id: Option<String>,
  /// The architecture of the AMI used to launch the instance (i386 | x86_64 | arm64)
  pub architecture: Option<String>,
  /// The Availability Zone in which the instance is running
  pub availability_zone: Option<String>,
  pub billing_products: Option<Vec<String>>,
  pub devpay_product_codes: Option<Vec<String>>,
  pub marketplace_product_codes: Option<Vec<String>>,
  /// The ID of the AMI used to launch the instance
  pub image_id: Option<String>,
  /// The instance type of the instance
  pub instance_type: Option<String>,
  pub kernel_id: Option<String>,
  /// The date and time that the instance was launched
  pub pending_time: Option<String>,
  /// The private IPv4 address of the instance
  pub private_ip: Option<String>,
  pub ramdisk_id: Option<String>,
  /// The Region in which the instance is running
  pub region: Option<String>,
  /// The version of the instance identity document format
  pub version: Option<String>,
}

/// A client capable of retrieving the instance identity document
pub trait IdentityDocumentClient {
  fn get_instance_identity_document(&self) -> impl Future<Output = Result<InstanceIdentityDocument>> + Send;
}

/// Metadata client backed by the AWS SDK IMDS client
///
/// Token acquisition, retries, and endpoint resolution are handled by the SDK
#[derive(Clone)]
pub struct ImdsClient {
  client: Client,
}

impl ImdsClient {
  /// Construct the IMDS client from the resolved configuration
  pub fn from_config(config: &ImdsConfig) -> Result<Self, ConfigError> {
    let mut builder = Client::builder()
      // Start with the shared environment configuration
      .configure(config.provider())
      .max_attempts(config.max_attempts())
      .token_ttl(config.token_ttl())
      .connect_timeout(config.connect_timeout())
      .read_timeout(config.read_timeout());

    if let Some(mode) = config.endpoint_mode() {
      builder = builder.endpoint_mode(mode.clone());
    }

    if let Some(endpoint) = config.endpoint() {
      builder = builder.endpoint(endpoint.to_string()).map_err(ConfigError::Client)?;
    }

    Ok(Self {
      client: builder.build(),
    })
  }
}

impl IdentityDocumentClient for ImdsClient {
  async fn get_instance_identity_document(&self) -> Result<InstanceIdentityDocument> {
    let document = self.client.get(IDENTITY_DOCUMENT_PATH).await?;
    let document = serde_json::from_str(document.as_ref())?;

    Ok(document)
  }
}
