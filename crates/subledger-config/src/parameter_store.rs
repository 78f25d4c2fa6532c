//! Remote parameter store seam and the AWS Systems Manager implementation

use crate::error::ParameterStoreError;
use async_trait::async_trait;
use aws_sdk_ssm::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_ssm::operation::get_parameter::GetParameterError;

/// A key/value configuration service addressed by fully-qualified path
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ParameterStore: Send + Sync {
    /// Fetch the value stored at `path`
    async fn get_parameter(&self, path: &str) -> Result<String, ParameterStoreError>;
}

/// AWS SSM Parameter Store client
///
/// Values are requested with decryption so `SecureString` parameters resolve
/// to plaintext.
#[derive(Debug, Clone)]
pub struct SsmParameterStore {
    client: aws_sdk_ssm::Client,
}

impl SsmParameterStore {
    /// Build a client from the default AWS provider chain
    ///
    /// Credentials are resolved lazily by the SDK, so a missing or rejected
    /// credential surfaces on each lookup as `Service` or `Transport`.
    ///
    /// # Errors
    /// `ParameterStoreError::Unavailable` when no region could be found.
    pub async fn connect(region: Option<String>) -> Result<Self, ParameterStoreError> {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region));
        }
        let sdk_config = loader.load().await;

        if sdk_config.region().is_none() {
            return Err(ParameterStoreError::Unavailable(
                "no AWS region configured".to_string(),
            ));
        }

        Ok(Self {
            client: aws_sdk_ssm::Client::new(&sdk_config),
        })
    }

    /// Wrap an existing client
    #[inline]
    #[must_use]
    pub fn from_client(client: aws_sdk_ssm::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ParameterStore for SsmParameterStore {
    async fn get_parameter(&self, path: &str) -> Result<String, ParameterStoreError> {
        let output = self
            .client
            .get_parameter()
            .name(path)
            .with_decryption(true)
            .send()
            .await
            .map_err(|err| classify_get_parameter_error(path, &err))?;

        output
            .parameter()
            .and_then(|parameter| parameter.value())
            .map(str::to_owned)
            .ok_or_else(|| ParameterStoreError::NotFound(path.to_string()))
    }
}

fn classify_get_parameter_error(
    path: &str,
    err: &SdkError<GetParameterError>,
) -> ParameterStoreError {
    match err {
        SdkError::ServiceError(service_err) => {
            let inner = service_err.err();
            if inner.is_parameter_not_found() {
                ParameterStoreError::NotFound(path.to_string())
            } else {
                let code = inner.code().unwrap_or("Unknown");
                ParameterStoreError::Service(format!("{code}: {}", DisplayErrorContext(inner)))
            }
        }
        SdkError::ConstructionFailure(_) => {
            ParameterStoreError::Unavailable(DisplayErrorContext(err).to_string())
        }
        _ => ParameterStoreError::Transport(DisplayErrorContext(err).to_string()),
    }
}
