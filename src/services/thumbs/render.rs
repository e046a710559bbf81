//! Source image loading and thumbnail encoding.
//!
//! Compound containers use their embedded previews instead of a full
//! decode: Krita documents carry `mergedimage.png` (or `preview.png`),
//! OpenRaster documents a `Thumbnail/thumbnail.png`.

use std::io::Cursor;

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};

use crate::services::files::descriptor::FileDescriptor;
use crate::services::files::format::{FormatTag, ThumbnailFormat, ThumbnailSize};
use crate::services::files::probe;
use crate::types::errors::{CoreError, CoreResult};

/// Load the displayable image behind a descriptor.
///
/// For ORA the result is the embedded thumbnail, which may be much
/// smaller than the canvas.
pub fn load_source_image(descriptor: &FileDescriptor) -> CoreResult<DynamicImage> {
    let path = std::path::Path::new(descriptor.full_path_name());
    match descriptor.format() {
        FormatTag::Kra => {
            let data = probe::read_kra_embedded_image(path).ok_or_else(|| {
                CoreError::Format(format!(
                    "no merged image in {}",
                    descriptor.full_path_name()
                ))
            })?;
            image::load_from_memory(&data)
                .map_err(|e| CoreError::Format(format!("bad merged image: {e}")))
        }
        FormatTag::Ora => {
            let data = probe::read_ora_embedded_image(path).ok_or_else(|| {
                CoreError::Format(format!("no thumbnail in {}", descriptor.full_path_name()))
            })?;
            image::load_from_memory(&data)
                .map_err(|e| CoreError::Format(format!("bad thumbnail: {e}")))
        }
        FormatTag::Png | FormatTag::Jpeg => image::open(path)
            .map_err(|e| CoreError::Format(format!("unable to decode {}: {e}", path.display()))),
        FormatTag::Svg => Err(CoreError::Format(
            "svg rasterisation is the host's concern".to_string(),
        )),
        FormatTag::Directory | FormatTag::Unknown => Err(CoreError::Format(format!(
            "no image content for {}",
            descriptor.full_path_name()
        ))),
    }
}

/// Downscale to fit the size's bounding square, preserving aspect ratio.
pub fn downscale(image: &DynamicImage, size: ThumbnailSize) -> DynamicImage {
    let edge = size.pixels();
    image.resize(edge, edge, FilterType::Lanczos3)
}

/// Encode with the cache's quality rules.
pub fn encode(
    image: &DynamicImage,
    format: ThumbnailFormat,
    size: ThumbnailSize,
) -> CoreResult<Vec<u8>> {
    let mut bytes = Vec::new();
    match format {
        ThumbnailFormat::Png => {
            image
                .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
                .map_err(|e| CoreError::Cache(format!("png encode failed: {e}")))?;
        }
        ThumbnailFormat::Jpeg => {
            let quality = format.quality(size);
            let mut encoder =
                image::codecs::jpeg::JpegEncoder::new_with_quality(&mut bytes, quality);
            encoder
                .encode_image(&image.to_rgb8())
                .map_err(|e| CoreError::Cache(format!("jpeg encode failed: {e}")))?;
        }
    }
    Ok(bytes)
}

pub fn decode(bytes: &[u8]) -> CoreResult<DynamicImage> {
    image::load_from_memory(bytes).map_err(|e| CoreError::Cache(format!("bad cached image: {e}")))
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
