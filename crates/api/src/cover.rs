//! Cover image decoding with a placeholder fallback.

use image::{DynamicImage, Rgba, RgbaImage};

use crate::error::{ApiError, Result};

pub const PLACEHOLDER_WIDTH: u32 = 300;
pub const PLACEHOLDER_HEIGHT: u32 = 450;

/// Covers narrower or shorter than this are tracking pixels, not artwork.
pub const MIN_COVER_EDGE: u32 = 10;

#[derive(Debug, Clone)]
pub struct Cover {
    pub image: DynamicImage,
    pub placeholder: bool,
}

impl Cover {
    pub fn placeholder() -> Self {
        Self {
            image: placeholder_image(),
            placeholder: true,
        }
    }

    /// Decodes `bytes`, substituting the placeholder on any failure.
    pub fn from_result(result: Result<Vec<u8>>) -> Self {
        match result.and_then(|bytes| decode_cover(&bytes)) {
            Ok(image) => Self {
                image,
                placeholder: false,
            },
            Err(err) => {
                log::debug!("cover fallback: {err}");
                Self::placeholder()
            }
        }
    }
}

pub fn placeholder_image() -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(
        PLACEHOLDER_WIDTH,
        PLACEHOLDER_HEIGHT,
        Rgba([0xcc, 0xcc, 0xcc, 0xff]),
    ))
}

pub fn decode_cover(bytes: &[u8]) -> Result<DynamicImage> {
    let image = image::load_from_memory(bytes)?;
    let (width, height) = (image.width(), image.height());
    if width < MIN_COVER_EDGE || height < MIN_COVER_EDGE {
        return Err(ApiError::DegenerateImage { width, height });
    }
    Ok(image)
}
