use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use futures::future::BoxFuture;
use mask_editor::{EncodedImage, ExportPair};

use crate::HdStrategy;

pub mod http;

/// Remote model that fills the masked area of an image.
pub trait InpaintService {
    /// Resolves to the encoded result image.
    fn inpaint(&self, request: InpaintRequest) -> BoxFuture<'static, Result<Vec<u8>, ServiceError>>;
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{status} {body}")]
    Status { status: u16, body: String },
    #[error("{0}")]
    Transport(String),
}

/// Request body understood by the inpainting endpoint
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct InpaintRequest {
    /// Data URL of the resized image
    pub image: String,
    /// Data URL of the PNG mask, same size as `image`
    pub mask: String,
    pub hd_strategy: HdStrategy,
}

impl InpaintRequest {
    pub fn new(pair: &ExportPair, hd_strategy: HdStrategy) -> Self {
        Self {
            image: to_data_url(&pair.image),
            mask: to_data_url(&pair.mask),
            hd_strategy,
        }
    }
}

pub fn to_data_url(image: &EncodedImage) -> String {
    format!("data:{};base64,{}", image.mime_type(), BASE64.encode(&image.bytes))
}
