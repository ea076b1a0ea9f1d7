use std::time::Duration;

use aws_config::meta::region::{ProvideRegion, RegionProviderChain};
use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, ConfigLoader, SdkConfig};
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{Builder, Credentials, Region};

use crate::config::ClientConfig;
use crate::types::S3Credentials;

const CREDENTIALS_PROVIDER_NAME: &str = "s3cleaner";
const FALLBACK_REGION: &str = "us-east-1";

impl ClientConfig {
    /// Build an S3 client from this configuration.
    ///
    /// S3-compatible stores usually accept any region, so when none is
    /// configured or found in the environment, `us-east-1` is used.
    pub async fn create_client(&self) -> Client {
        let config_builder = Builder::from(&self.load_sdk_config().await)
            .force_path_style(self.force_path_style)
            .request_checksum_calculation(self.request_checksum_calculation);

        Client::from_conf(config_builder.build())
    }

    async fn load_sdk_config(&self) -> SdkConfig {
        let config_loader = aws_config::defaults(BehaviorVersion::latest());
        let mut config_loader = self
            .load_config_credential(config_loader)
            .region(self.build_region_provider())
            .retry_config(self.build_retry_config());

        if let Some(timeout_config) = self.build_timeout_config() {
            config_loader = config_loader.timeout_config(timeout_config);
        }

        if let Some(endpoint_url) = &self.endpoint_url {
            config_loader = config_loader.endpoint_url(endpoint_url);
        }

        config_loader.load().await
    }

    fn load_config_credential(&self, mut config_loader: ConfigLoader) -> ConfigLoader {
        match &self.credential {
            S3Credentials::Credentials { access_keys } => {
                let credentials = Credentials::new(
                    access_keys.access_key.to_string(),
                    access_keys.secret_access_key.to_string(),
                    access_keys.session_token.clone(),
                    None,
                    CREDENTIALS_PROVIDER_NAME,
                );
                config_loader = config_loader.credentials_provider(credentials);
            }
            S3Credentials::Profile(profile_name) => {
                config_loader = config_loader.profile_name(profile_name);
            }
            S3Credentials::FromEnvironment => {}
        }
        config_loader
    }

    fn build_region_provider(&self) -> Box<dyn ProvideRegion> {
        Box::new(
            RegionProviderChain::first_try(self.region.clone().map(Region::new))
                .or_default_provider()
                .or_else(Region::from_static(FALLBACK_REGION)),
        )
    }

    fn build_retry_config(&self) -> RetryConfig {
        RetryConfig::standard()
            .with_max_attempts(self.retry_config.aws_max_attempts)
            .with_initial_backoff(Duration::from_millis(
                self.retry_config.initial_backoff_milliseconds,
            ))
    }

    fn build_timeout_config(&self) -> Option<TimeoutConfig> {
        let timeouts = &self.cli_timeout_config;
        if timeouts.operation_timeout_milliseconds.is_none()
            && timeouts.operation_attempt_timeout_milliseconds.is_none()
            && timeouts.connect_timeout_milliseconds.is_none()
            && timeouts.read_timeout_milliseconds.is_none()
        {
            return None;
        }

        let mut builder = TimeoutConfig::builder();
        if let Some(millis) = timeouts.operation_timeout_milliseconds {
            builder = builder.operation_timeout(Duration::from_millis(millis));
        }
        if let Some(millis) = timeouts.operation_attempt_timeout_milliseconds {
            builder = builder.operation_attempt_timeout(Duration::from_millis(millis));
        }
        if let Some(millis) = timeouts.connect_timeout_milliseconds {
            builder = builder.connect_timeout(Duration::from_millis(millis));
        }
        if let Some(millis) = timeouts.read_timeout_milliseconds {
            builder = builder.read_timeout(Duration::from_millis(millis));
        }

        Some(builder.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CLITimeoutConfig, RetryConfig as CleanerRetryConfig};
    use crate::types::AccessKeys;
    use aws_smithy_types::checksum_config::RequestChecksumCalculation;

    fn init_dummy_tracing_subscriber() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("dummy=trace")
            .try_init();
    }

    fn make_client_config(credential: S3Credentials) -> ClientConfig {
        ClientConfig {
            credential,
            region: Some("my-region".to_string()),
            endpoint_url: Some("http://localhost:9000".to_string()),
            force_path_style: true,
            retry_config: CleanerRetryConfig {
                aws_max_attempts: 5,
                initial_backoff_milliseconds: 250,
            },
            cli_timeout_config: CLITimeoutConfig {
                operation_timeout_milliseconds: None,
                operation_attempt_timeout_milliseconds: None,
                connect_timeout_milliseconds: None,
                read_timeout_milliseconds: None,
            },
            request_checksum_calculation: RequestChecksumCalculation::WhenRequired,
        }
    }

    fn access_keys() -> S3Credentials {
        S3Credentials::Credentials {
            access_keys: AccessKeys {
                access_key: "minioadmin".to_string(),
                secret_access_key: "minioadmin".to_string(),
                session_token: None,
            },
        }
    }

    #[tokio::test]
    async fn create_client_with_access_keys() {
        init_dummy_tracing_subscriber();

        let client_config = make_client_config(access_keys());
        let sdk_config = client_config.load_sdk_config().await;

        assert_eq!(sdk_config.region().unwrap().to_string(), "my-region");
        assert!(sdk_config.credentials_provider().is_some());

        let client = client_config.create_client().await;
        assert_eq!(client.config().region().unwrap().to_string(), "my-region");
    }

    #[tokio::test]
    async fn create_client_from_environment() {
        init_dummy_tracing_subscriber();

        let client = make_client_config(S3Credentials::FromEnvironment)
            .create_client()
            .await;

        assert_eq!(client.config().region().unwrap().to_string(), "my-region");
    }

    #[test]
    fn retry_config_is_standard_with_configured_attempts() {
        init_dummy_tracing_subscriber();

        let retry_config = make_client_config(access_keys()).build_retry_config();

        assert_eq!(retry_config.max_attempts(), 5);
        assert_eq!(retry_config.initial_backoff(), Duration::from_millis(250));
    }

    #[test]
    fn timeout_config_only_when_any_timeout_set() {
        init_dummy_tracing_subscriber();

        let mut client_config = make_client_config(access_keys());
        assert!(client_config.build_timeout_config().is_none());

        client_config.cli_timeout_config.connect_timeout_milliseconds = Some(1500);
        client_config.cli_timeout_config.read_timeout_milliseconds = Some(3000);
        let timeout_config = client_config.build_timeout_config().unwrap();

        assert_eq!(
            timeout_config.connect_timeout(),
            Some(Duration::from_millis(1500))
        );
        assert_eq!(
            timeout_config.read_timeout(),
            Some(Duration::from_millis(3000))
        );
        assert!(timeout_config.operation_timeout().is_none());
    }
}
