use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_ssm::error::{DisplayErrorContext, SdkError};
use aws_sdk_ssm::operation::get_parameter::{GetParameterError, GetParameterOutput};
use aws_sdk_ssm::Client;

use release_router_core::config::ParameterConfig;
use release_router_core::parameter::{ParameterError, ParameterStore};

/// Parameter store backed by AWS Systems Manager `GetParameter`.
///
/// Timeouts and retries are whatever the SDK client is configured with; the
/// router itself never retries.
#[derive(Clone, Debug)]
pub struct SsmParameterStore {
    client: Client,
    with_decryption: bool,
}

impl SsmParameterStore {
    /// Wrap `client`, taking decryption from `[release.parameter]`.
    pub fn new(client: Client, parameter: &ParameterConfig) -> Self {
        Self {
            client,
            with_decryption: parameter.with_decryption,
        }
    }

    /// Build a client from the ambient AWS configuration, pinned to the
    /// configured region when there is one.
    pub async fn from_env(parameter: &ParameterConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &parameter.region {
            loader = loader.region(Region::new(region.clone()));
        }
        let sdk_config = loader.load().await;
        Self::new(Client::new(&sdk_config), parameter)
    }
}

fn map_sdk_error<R>(name: &str, err: SdkError<GetParameterError, R>) -> ParameterError
where
    R: std::fmt::Debug,
{
    match &err {
        SdkError::ServiceError(service) if service.err().is_parameter_not_found() => {
            ParameterError::NotFound {
                name: name.to_string(),
            }
        }
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => {
            log::warn!("parameter store unreachable: {}", DisplayErrorContext(&err));
            ParameterError::Unavailable
        }
        _ => ParameterError::Internal(anyhow::anyhow!(
            "GetParameter `{name}` failed: {}",
            DisplayErrorContext(&err)
        )),
    }
}

/// A parameter without a value is treated as missing.
fn parameter_value(name: &str, output: &GetParameterOutput) -> Result<String, ParameterError> {
    output
        .parameter()
        .and_then(|parameter| parameter.value())
        .map(str::to_string)
        .ok_or_else(|| ParameterError::NotFound {
            name: name.to_string(),
        })
}

#[async_trait]
impl ParameterStore for SsmParameterStore {
    async fn get_parameter(&self, name: &str) -> Result<String, ParameterError> {
        let output = self
            .client
            .get_parameter()
            .name(name)
            .with_decryption(self.with_decryption)
            .send()
            .await
            .map_err(|err| map_sdk_error(name, err))?;

        parameter_value(name, &output)
    }
}
