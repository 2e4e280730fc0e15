use std::{io::Cursor, sync::Arc};

use image::{DynamicImage, ImageDecoder, ImageFormat, ImageReader, codecs::jpeg::JpegEncoder};

use crate::{BoxFuture, RasterError, spawn_blocking};

/// Uploaded file together with its decoded pixels.
///
/// The original bytes are kept, so export can start over from the file itself.
#[derive(Clone)]
pub struct SourceImage {
    bytes: Arc<[u8]>,
    image: Arc<DynamicImage>,
}

impl SourceImage {
    pub fn decode(bytes: impl Into<Arc<[u8]>>) -> Result<Self, RasterError> {
        let bytes = bytes.into();
        let image = decode_oriented(&bytes)?;
        Ok(Self {
            bytes,
            image: Arc::new(image),
        })
    }

    pub fn decode_async(bytes: Vec<u8>) -> BoxFuture<'static, Result<Self, RasterError>> {
        spawn_blocking(move || Self::decode(bytes))
    }

    pub fn size(&self) -> [u32; 2] {
        [self.image.width(), self.image.height()]
    }

    pub fn bytes(&self) -> &Arc<[u8]> {
        &self.bytes
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }
}

impl std::fmt::Debug for SourceImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceImage")
            .field("size", &self.size())
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// Decodes any supported format and applies the EXIF orientation, so sizes are
/// reported the way the image is meant to be viewed.
pub fn decode_oriented(bytes: &[u8]) -> Result<DynamicImage, RasterError> {
    let decode = || -> image::ImageResult<DynamicImage> {
        let mut decoder = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()?
            .into_decoder()?;
        let orientation = decoder.orientation()?;
        let mut image = DynamicImage::from_decoder(decoder)?;
        image.apply_orientation(orientation);
        Ok(image)
    };
    decode().map_err(RasterError::Decode)
}

/// Encoded raster ready to be shipped, e.g. as a data URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
    pub size: [u32; 2],
}

impl EncodedImage {
    pub fn mime_type(&self) -> &'static str {
        self.format.to_mime_type()
    }
}

/// Lossy encoding. Alpha is dropped, as JPEG has no such channel.
pub fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<EncodedImage, RasterError> {
    let rgb = image.to_rgb8();
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100))
        .encode_image(&rgb)
        .map_err(RasterError::Encoding)?;
    Ok(EncodedImage {
        bytes,
        format: ImageFormat::Jpeg,
        size: [rgb.width(), rgb.height()],
    })
}

#[cfg(test)]
pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_fn(width, height, |x, y| image::Rgb([x as u8, y as u8, 128]));
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

/// PNG of `width` x `height` with an EXIF block asking for a 90° clockwise rotation.
#[cfg(test)]
pub(crate) fn rotated_png_bytes(width: u32, height: u32) -> Vec<u8> {
    fn crc32(data: &[u8]) -> u32 {
        let mut crc = 0xFFFF_FFFF_u32;
        for b in data {
            crc ^= *b as u32;
            for _ in 0..8 {
                crc = if crc & 1 != 0 {
                    (crc >> 1) ^ 0xEDB8_8320
                } else {
                    crc >> 1
                };
            }
        }
        !crc
    }

    // Big endian TIFF header with a single IFD entry: Orientation (0x0112) = 6
    let exif: [u8; 26] = [
        b'M', b'M', 0, 42, 0, 0, 0, 8, 0, 1, 0x01, 0x12, 0, 3, 0, 0, 0, 1, 0, 6, 0, 0, 0, 0, 0, 0,
    ];
    let mut chunk = Vec::new();
    chunk.extend_from_slice(&(exif.len() as u32).to_be_bytes());
    chunk.extend_from_slice(b"eXIf");
    chunk.extend_from_slice(&exif);
    chunk.extend_from_slice(&crc32(&chunk[4..]).to_be_bytes());

    // Signature (8) and IHDR (25) come first, eXIf has to precede IDAT
    let mut bytes = png_bytes(width, height);
    bytes.splice(33..33, chunk);
    bytes
}
