#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    #[error("Image could not be decoded: {0}")]
    Decode(#[source] image::ImageError),
    #[error("Image could not be encoded: {0}")]
    Encoding(#[source] image::ImageError),
    #[error("Mask is {}x{}, but the loaded image is {}x{}", actual[0], actual[1], expected[0], expected[1])]
    SizeMismatch { expected: [u32; 2], actual: [u32; 2] },
    #[error("Background worker stopped before reporting a result")]
    WorkerGone,
}
