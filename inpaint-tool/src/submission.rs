use std::sync::Arc;

use futures::{FutureExt, future::BoxFuture};
use log::{info, warn};
use mask_editor::{AsyncTask, ExportSettings, MaskSurface, RasterError, SourceImage, export_pair_async};

use crate::{HdStrategy, InpaintRequest, InpaintService, ServiceError};

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("No mask to submit, load an image first")]
    MaskUnavailable,
    #[error(transparent)]
    Raster(#[from] RasterError),
    #[error("Inpainting request failed: {0}")]
    Service(#[from] ServiceError),
    #[error("Inpainting result could not be decoded: {0}")]
    InvalidResult(#[source] image::ImageError),
}

/// Exports the mask of `surface`, resizes image and mask and sends both to `service`.
///
/// The mask is captured when this is called.
pub fn submit(
    surface: &MaskSurface,
    service: Arc<dyn InpaintService + Send + Sync>,
    settings: ExportSettings,
    hd_strategy: HdStrategy,
) -> BoxFuture<'static, Result<SourceImage, SubmitError>> {
    let mask = surface.export_mask();
    let source = surface.source().map(|s| s.bytes().clone());

    async move {
        let (Some(mask), Some(source)) = (mask.await?, source) else {
            return Err(SubmitError::MaskUnavailable);
        };
        let pair = export_pair_async(source, mask, settings).await?;
        info!(
            "Submit {}x{} (image: {} bytes, mask: {} bytes)",
            pair.size.width,
            pair.size.height,
            pair.image.bytes.len(),
            pair.mask.bytes.len()
        );

        let bytes = service
            .inpaint(InpaintRequest::new(&pair, hd_strategy))
            .await?;
        SourceImage::decode_async(bytes).await.map_err(|e| match e {
            RasterError::Decode(e) => SubmitError::InvalidResult(e),
            e => SubmitError::Raster(e),
        })
    }
    .boxed()
}

/// Tracks the submission in flight and keeps the last result.
#[derive(Default)]
pub struct Submission {
    job: Option<AsyncTask<Result<SourceImage, SubmitError>>>,
    result: Option<SourceImage>,
    error: Option<String>,
    revision: u64,
}

impl Submission {
    pub fn in_flight(&self) -> bool {
        self.job.is_some()
    }

    pub fn result(&self) -> Option<&SourceImage> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Changes whenever the result got replaced or removed
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Tracks `job` unless another one is still running. Returns false if `job` was rejected.
    pub fn start(&mut self, job: BoxFuture<'static, Result<SourceImage, SubmitError>>) -> bool {
        if self.in_flight() {
            warn!("Ignore submission, previous one is still running");
            return false;
        }
        self.error = None;
        self.job = Some(AsyncTask::new(job));
        true
    }

    /// Polls the running job. Returns true once it finished.
    pub fn poll(&mut self) -> bool {
        let Some(result) = self.job.as_mut().and_then(AsyncTask::data) else {
            return false;
        };
        self.job = None;
        self.finish(result);
        true
    }

    fn finish(&mut self, result: Result<SourceImage, SubmitError>) {
        match result {
            Ok(image) => {
                let [w, h] = image.size();
                info!("Received result {w}x{h}");
                // Previous result is dropped here
                self.result = Some(image);
                self.revision += 1;
            }
            Err(e) => {
                warn!("Submission failed: {e}");
                self.error = Some(e.to_string());
            }
        }
    }

    /// Forgets result, error and a running job, e.g. after another image got picked.
    ///
    /// A running job keeps going in the background, its outcome is discarded.
    pub fn reset(&mut self) {
        if self.job.take().is_some() {
            info!("Discard running submission");
        }
        self.error = None;
        if self.result.take().is_some() {
            self.revision += 1;
        }
    }
}
