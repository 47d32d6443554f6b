// ABOUTME: Image operations: build from a tar stream, pull, find by tag, list, remove.
// ABOUTME: Build output is streamed to the operator; daemon build errors surface verbatim.

use super::error::{map_image_remove_error, ImageError};
use super::{with_cancel, RuntimeClient};
use crate::types::ImageId;
use bollard::query_parameters::{BuildImageOptions, CreateImageOptions, RemoveImageOptions};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

/// A locally present image and its repo tags.
#[derive(Debug, Clone)]
pub struct ImageRecord {
    pub id: ImageId,
    pub repo_tags: Vec<String>,
}

impl RuntimeClient {
    /// Build an image from an in-memory tar of the build context.
    ///
    /// `dockerfile` names the recipe file inside the context. Progress lines
    /// from the daemon are forwarded to stdout; a structured build error
    /// terminates the stream and is returned with the daemon's message
    /// preserved verbatim.
    pub async fn build_image(
        &self,
        cancel: &CancellationToken,
        context_tar: Vec<u8>,
        dockerfile: &str,
        tag: &str,
    ) -> Result<(), ImageError> {
        let opts = BuildImageOptions {
            dockerfile: dockerfile.to_string(),
            t: Some(tag.to_string()),
            rm: true,
            forcerm: true,
            ..Default::default()
        };

        tracing::info!("building image '{tag}' (this may take a while)");

        let build = async {
            let mut stream =
                self.client
                    .build_image(opts, None, Some(bollard::body_full(context_tar.into())));

            while let Some(item) = stream.next().await {
                let info = item.map_err(|e| ImageError::BuildFailed(e.to_string()))?;

                if let Some(message) = info.stream {
                    print!("{message}");
                }
                if let Some(detail) = info.error_detail {
                    let message = detail.message.unwrap_or_else(|| "unknown build error".into());
                    return Err(ImageError::BuildFailed(message));
                }
                if let Some(error) = info.error {
                    return Err(ImageError::BuildFailed(error));
                }
            }
            Ok(())
        };

        with_cancel(cancel, build).await?;
        tracing::info!("successfully built image '{tag}'");
        Ok(())
    }

    /// Pull an image, draining the progress stream.
    pub async fn pull_image(
        &self,
        cancel: &CancellationToken,
        reference: &str,
    ) -> Result<(), ImageError> {
        let opts = CreateImageOptions {
            from_image: Some(reference.to_string()),
            ..Default::default()
        };

        tracing::info!("pulling image '{reference}'");
        let pull = async {
            let mut stream = self.client.create_image(Some(opts), None, None);
            while let Some(item) = stream.next().await {
                item.map_err(|e| ImageError::PullFailed(format!("{reference}: {e}")))?;
            }
            Ok(())
        };

        with_cancel(cancel, pull).await
    }

    /// Look up a local image by exact repo tag.
    pub async fn find_image(
        &self,
        cancel: &CancellationToken,
        tag: &str,
    ) -> Result<Option<ImageRecord>, ImageError> {
        let images = self.list_images(cancel).await?;
        Ok(images
            .into_iter()
            .find(|img| img.repo_tags.iter().any(|t| t == tag)))
    }

    pub async fn list_images(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<ImageRecord>, ImageError> {
        let images = with_cancel(cancel, async {
            self.client
                .list_images(None::<bollard::query_parameters::ListImagesOptions>)
                .await
                .map_err(|e| ImageError::Runtime(e.to_string()))
        })
        .await?;

        Ok(images
            .into_iter()
            .map(|img| ImageRecord {
                id: ImageId::new(img.id),
                repo_tags: img.repo_tags,
            })
            .collect())
    }

    /// Remove an image by id. The daemon's in-use refusal is surfaced as
    /// `ImageError::InUse`; callers must stop dependent containers first.
    pub async fn remove_image(
        &self,
        cancel: &CancellationToken,
        id: &ImageId,
    ) -> Result<(), ImageError> {
        let opts = RemoveImageOptions {
            force: false,
            ..Default::default()
        };

        with_cancel(cancel, async {
            self.client
                .remove_image(id.as_str(), Some(opts), None)
                .await
                .map(|_| ())
                .map_err(|e| map_image_remove_error(e, id.as_str()))
        })
        .await
    }
}
