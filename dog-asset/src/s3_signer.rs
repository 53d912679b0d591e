use std::env;
use std::time::Duration;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_s3::{presigning::PresigningConfig, Client};

use crate::{AssetError, AssetResult, StorageKey, UrlSigner};

/// S3-compatible endpoint settings
#[derive(Debug, Clone)]
pub struct S3SignerConfig {
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub endpoint_url: Option<String>,
    pub bucket: String,
}

impl S3SignerConfig {
    /// Read `DOG_ASSET_S3_*` variables; the bucket comes from `DOG_ASSET_BUCKET`
    pub fn from_env() -> AssetResult<Self> {
        fn get_env(key: &str) -> AssetResult<String> {
            env::var(key).map_err(|_| AssetError::config(format!("{} environment variable required", key)))
        }

        Ok(Self {
            region: get_env("DOG_ASSET_S3_REGION")?,
            access_key_id: get_env("DOG_ASSET_S3_ACCESS_KEY_ID")?,
            secret_access_key: get_env("DOG_ASSET_S3_SECRET_ACCESS_KEY")?,
            endpoint_url: env::var("DOG_ASSET_S3_ENDPOINT_URL").ok(),
            bucket: get_env("DOG_ASSET_BUCKET")?,
        })
    }
}

/// Presigns `GetObject` requests against an S3-compatible store
#[derive(Clone)]
pub struct S3UrlSigner {
    client: Client,
    bucket: String,
}

impl S3UrlSigner {
    pub async fn new(config: S3SignerConfig) -> Self {
        let credentials = Credentials::new(
            config.access_key_id,
            config.secret_access_key,
            None,
            None,
            "dog-asset",
        );

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region))
            .credentials_provider(credentials);
        let path_style = config.endpoint_url.is_some();
        if let Some(endpoint) = config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let aws_config = loader.load().await;

        let client = Client::from_conf(
            aws_sdk_s3::config::Builder::from(&aws_config)
                .force_path_style(path_style) // custom endpoints rarely support virtual hosts
                .build(),
        );

        Self {
            client,
            bucket: config.bucket,
        }
    }

    /// Wrap an existing client
    pub fn from_client(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl UrlSigner for S3UrlSigner {
    async fn sign_get(&self, key: &StorageKey, expires_in_secs: u64) -> AssetResult<String> {
        let presigning = PresigningConfig::expires_in(Duration::from_secs(expires_in_secs))
            .map_err(AssetError::backend)?;

        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key.as_str())
            .presigned(presigning)
            .await
            .map_err(AssetError::transport)?;

        Ok(presigned.uri().to_string())
    }
}
