//! EC2 implementation of [`ImageProvider`].
//!
//! Wraps the AWS SDK client and maps API shapes and service errors onto the
//! workflow models. Provider error messages are passed through verbatim.

mod convert;

use std::fmt;

use amicopy_id::{ImageId, SnapshotId};
use amicopy_workflow::model::{CopySnapshotRequest, RegisterImageRequest};
use amicopy_workflow::{
    ImageProvider, ImageState, ProviderError, Snapshot, SnapshotState, SourceImage,
};
use async_trait::async_trait;
use aws_sdk_ec2::config::{Credentials, Region};
use aws_sdk_ec2::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_ec2::types::ArchitectureValues;
use aws_sdk_ec2::Client;
use tracing::debug;

/// Credentials provider name reported to the SDK.
const CREDENTIALS_PROVIDER_NAME: &str = "amicopy-static";

/// Access key pair supplied by the caller.
#[derive(Clone)]
pub struct StaticCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .finish()
    }
}

/// EC2-backed image provider bound to one region.
#[derive(Debug, Clone)]
pub struct Ec2Provider {
    client: Client,
}

impl Ec2Provider {
    /// Connect to `region`.
    ///
    /// Without explicit credentials the SDK default chain is used
    /// (environment, profile, instance metadata).
    pub async fn connect(region: &str, credentials: Option<StaticCredentials>) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(region.to_string()));

        if let Some(creds) = credentials {
            loader = loader.credentials_provider(Credentials::new(
                creds.access_key_id,
                creds.secret_access_key,
                None,
                None,
                CREDENTIALS_PROVIDER_NAME,
            ));
        }

        let config = loader.load().await;
        debug!(region, "EC2 client configured");

        Self::from_client(Client::new(&config))
    }

    /// Wrap an existing SDK client.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    async fn describe_snapshot(&self, id: &SnapshotId) -> Result<Snapshot, ProviderError> {
        self.describe_snapshots(std::slice::from_ref(id))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::new(format!("snapshot {id} not found")))
    }
}

#[async_trait]
impl ImageProvider for Ec2Provider {
    async fn describe_snapshots(&self, ids: &[SnapshotId]) -> Result<Vec<Snapshot>, ProviderError> {
        let output = self
            .client
            .describe_snapshots()
            .set_snapshot_ids(Some(ids.iter().map(|id| id.to_string()).collect()))
            .send()
            .await
            .map_err(provider_error)?;

        output.snapshots().iter().map(convert::snapshot).collect()
    }

    async fn copy_snapshot(
        &self,
        request: &CopySnapshotRequest,
    ) -> Result<SnapshotId, ProviderError> {
        let output = self
            .client
            .copy_snapshot()
            .source_region(&request.source_region)
            .source_snapshot_id(request.source_snapshot_id.as_str())
            .set_description(request.description.clone())
            .send()
            .await
            .map_err(provider_error)?;

        convert::parse_id(output.snapshot_id(), "snapshot")
    }

    async fn snapshot_state(&self, id: &SnapshotId) -> Result<SnapshotState, ProviderError> {
        Ok(self.describe_snapshot(id).await?.state)
    }

    async fn describe_images(&self, ids: &[ImageId]) -> Result<Vec<SourceImage>, ProviderError> {
        let output = self
            .client
            .describe_images()
            .set_image_ids(Some(ids.iter().map(|id| id.to_string()).collect()))
            .send()
            .await
            .map_err(provider_error)?;

        output.images().iter().map(convert::source_image).collect()
    }

    async fn register_image(
        &self,
        request: &RegisterImageRequest,
    ) -> Result<ImageId, ProviderError> {
        let output = self
            .client
            .register_image()
            .name(&request.name)
            .architecture(ArchitectureValues::from(request.architecture.as_str()))
            .set_kernel_id(request.kernel_id.clone())
            .set_ramdisk_id(request.ramdisk_id.clone())
            .root_device_name(&request.root_device_name)
            .set_block_device_mappings(Some(convert::block_device_mappings(
                &request.block_device_map,
            )))
            .virtualization_type(&request.virtualization_type)
            .set_sriov_net_support(request.sriov_net_support.clone())
            .send()
            .await
            .map_err(provider_error)?;

        convert::parse_id(output.image_id(), "image")
    }

    async fn image_state(&self, id: &ImageId) -> Result<ImageState, ProviderError> {
        let output = self
            .client
            .describe_images()
            .image_ids(id.as_str())
            .send()
            .await
            .map_err(provider_error)?;

        let image = output
            .images()
            .first()
            .ok_or_else(|| ProviderError::new(format!("image {id} not found")))?;

        Ok(convert::image_state(image.state()))
    }
}

/// Map an SDK error to the provider's code and message.
fn provider_error<E, R>(err: SdkError<E, R>) -> ProviderError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: fmt::Debug,
{
    let code = err.code().map(str::to_string);
    let message = err
        .message()
        .map(str::to_string)
        .unwrap_or_else(|| DisplayErrorContext(&err).to_string());

    ProviderError { code, message }
}
