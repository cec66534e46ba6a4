use aws_smithy_runtime_api::client::http::SharedHttpClient;
use tracing::debug;

use crate::{
  config::{ImdsConfig, Settings},
  error::{ConfigError, Error, Result},
  imds::{IdentityDocumentClient, InstanceIdentityDocument},
};

/// Fetch the instance identity document from IMDS
///
/// `new_client` constructs the metadata client from the resolved configuration;
/// pass `ImdsClient::from_config` for the real client. It is not called when the
/// configuration cannot be resolved, and no request is made when it fails
pub async fn fetch_instance_identity_document<F, C>(
  transport: SharedHttpClient,
  settings: &Settings,
  new_client: F,
) -> Result<InstanceIdentityDocument>
where
  F: FnOnce(&ImdsConfig) -> std::result::Result<C, ConfigError>,
  C: IdentityDocumentClient,
{
  let config = ImdsConfig::load(transport, settings)?;
  let client = new_client(&config)?;

  debug!("Requesting instance identity document");
  let document = client.get_instance_identity_document().await.map_err(Error::Request)?;
  debug!(instance_id = %document.instance_id, "Received instance identity document");

  Ok(document)
}

/// Fetch the ID of the instance from the instance identity document
pub async fn fetch_instance_id<F, C>(transport: SharedHttpClient, settings: &Settings, new_client: F) -> Result<String>
where
  F: FnOnce(&ImdsConfig) -> std::result::Result<C, ConfigError>,
  C: IdentityDocumentClient,
{
  let document = fetch_instance_identity_document(transport, settings, new_client).await?;

  Ok(document.instance_id)
}

#[cfg(test)]
mod tests {
  use std::{
    fmt,
    sync::atomic::{AtomicUsize, Ordering},
  };

  use aws_smithy_runtime::client::http::test_util::{infallible_client_fn, ReplayEvent, StaticReplayClient};
  use aws_smithy_types::body::SdkBody;

  use super::*;
  use crate::imds::ImdsClient;

  type GetDocumentFn = Box<dyn Fn() -> anyhow::Result<InstanceIdentityDocument> + Send + Sync>;

  struct MockClient {
    get_document: GetDocumentFn,
  }

  impl IdentityDocumentClient for MockClient {
    async fn get_instance_identity_document(&self) -> anyhow::Result<InstanceIdentityDocument> {
      (self.get_document)()
    }
  }

  fn mock<G>(get_document: G) -> impl FnOnce(&ImdsConfig) -> std::result::Result<MockClient, ConfigError>
  where
    G: Fn() -> anyhow::Result<InstanceIdentityDocument> + Send + Sync + 'static,
  {
    move |_config: &ImdsConfig| {
      Ok(MockClient {
        get_document: Box::new(get_document),
      })
    }
  }

  /// Transport that must never be reached
  fn transport() -> SharedHttpClient {
    infallible_client_fn(|req: http::Request<SdkBody>| -> http::Response<SdkBody> {
      panic!("unexpected request to {}", req.uri())
    })
  }

  #[derive(Debug)]
  struct RequestFailed;

  impl fmt::Display for RequestFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      write!(f, "request failed")
    }
  }

  impl std::error::Error for RequestFailed {}

  #[tokio::test]
  async fn it_returns_instance_id() {
    let new_client = mock(|| {
      Ok(InstanceIdentityDocument {
        instance_id: "i-1234567890abcdef0".to_owned(),
        ..Default::default()
      })
    });
    let result = fetch_instance_id(transport(), &Settings::default(), new_client).await;

    assert_eq!(result.unwrap(), "i-1234567890abcdef0");
  }

  #[tokio::test]
  async fn it_returns_instance_id_verbatim() {
    let new_client = mock(|| {
      Ok(InstanceIdentityDocument {
        instance_id: "  not-an-id\n".to_owned(),
        ..Default::default()
      })
    });
    let result = fetch_instance_id(transport(), &Settings::default(), new_client).await;

    assert_eq!(result.unwrap(), "  not-an-id\n");
  }

  #[tokio::test]
  async fn it_returns_whole_document() {
    let expected = InstanceIdentityDocument {
      instance_id: "i-1234567890abcdef0".to_owned(),
      region: Some("eu-west-1".to_owned()),
      ..Default::default()
    };
    let document = expected.clone();
    let new_client = mock(move || Ok(document.clone()));
    let result = fetch_instance_identity_document(transport(), &Settings::default(), new_client).await;

    assert_eq!(result.unwrap(), expected);
  }

  #[tokio::test]
  async fn it_propagates_request_error() {
    let new_client = mock(|| Err(RequestFailed.into()));
    let result = fetch_instance_id(transport(), &Settings::default(), new_client).await;

    match result {
      Err(Error::Request(err)) => {
        assert_eq!(err.to_string(), "request failed");
        assert!(err.downcast_ref::<RequestFailed>().is_some());
      }
      other => panic!("expected request error, got {other:?}"),
    }
  }

  #[tokio::test]
  async fn it_fails_config_without_building_client() {
    let calls = AtomicUsize::new(0);
    let settings = Settings {
      endpoint: Some("http://not a uri".to_owned()),
      ..Default::default()
    };
    let result = fetch_instance_id(transport(), &settings, |_config: &ImdsConfig| {
      calls.fetch_add(1, Ordering::SeqCst);
      Ok(MockClient {
        get_document: Box::new(|| -> anyhow::Result<InstanceIdentityDocument> { panic!("request attempted") }),
      })
    })
    .await;

    assert!(matches!(result, Err(Error::Config(ConfigError::InvalidEndpoint { .. }))));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn it_fails_config_on_endpoint_mode_without_building_client() {
    let calls = AtomicUsize::new(0);
    let settings = Settings {
      endpoint_mode: Some("bogus".to_owned()),
      ..Default::default()
    };
    let result = fetch_instance_id(transport(), &settings, |config: &ImdsConfig| {
      calls.fetch_add(1, Ordering::SeqCst);
      ImdsClient::from_config(config)
    })
    .await;

    match result {
      Err(Error::Config(ConfigError::InvalidEndpointMode(mode))) => assert_eq!(mode, "bogus"),
      other => panic!("expected endpoint mode error, got {other:?}"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn it_fails_config_on_zero_attempts() {
    let settings = Settings {
      max_attempts: 0,
      ..Default::default()
    };
    let new_client = mock(|| panic!("request attempted"));
    let result = fetch_instance_id(transport(), &settings, new_client).await;

    assert!(matches!(result, Err(Error::Config(ConfigError::MaxAttempts))));
  }

  #[tokio::test]
  async fn it_fails_config_when_client_cannot_be_built() {
    let result = fetch_instance_id(transport(), &Settings::default(), |_config: &ImdsConfig| {
      Err::<MockClient, _>(ConfigError::Client("no client".into()))
    })
    .await;

    assert!(matches!(result, Err(Error::Config(ConfigError::Client(_)))));
  }

  #[tokio::test]
  async fn it_uses_real_client_after_mock() {
    let new_client = mock(|| {
      Ok(InstanceIdentityDocument {
        instance_id: "i-mock".to_owned(),
        ..Default::default()
      })
    });
    let result = fetch_instance_id(transport(), &Settings::default(), new_client).await;
    assert_eq!(result.unwrap(), "i-mock");

    let replay = StaticReplayClient::new(vec![
      ReplayEvent::new(
        http::Request::builder()
          .method("PUT")
          .uri("http://169.254.169.254/latest/api/token")
          .header("x-aws-ec2-metadata-token-ttl-seconds", "900")
          .body(SdkBody::empty())
          .unwrap(),
        http::Response::builder()
          .status(200)
          .header("x-aws-ec2-metadata-token-ttl-seconds", "900")
          .body(SdkBody::from("imds-token"))
          .unwrap(),
      ),
      ReplayEvent::new(
        http::Request::builder()
          .uri("http://169.254.169.254/latest/dynamic/instance-identity/document")
          .header("x-aws-ec2-metadata-token", "imds-token")
          .body(SdkBody::empty())
          .unwrap(),
        http::Response::builder()
          .status(200)
          .body(SdkBody::from(r#"{"instanceId": "i-real"}"#))
          .unwrap(),
      ),
    ]);
    let transport = SharedHttpClient::new(replay.clone());
    let settings = Settings {
      endpoint: Some("http://169.254.169.254".to_owned()),
      ..Default::default()
    };
    let result = fetch_instance_id(transport, &settings, ImdsClient::from_config).await;

    assert_eq!(result.unwrap(), "i-real");
    replay.assert_requests_match(&[]);
  }
}
