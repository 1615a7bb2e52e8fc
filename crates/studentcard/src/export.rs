//! Exporting a card as an image file.
//!
//! A [`CardRasterizer`] draws the card; [`PngRasterizer`] is the built-in
//! one. [`export_card`] names and writes the result.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::{imageops, DynamicImage, ImageFormat, Luma, Rgb, RgbImage};
use tracing::{info, warn};

use crate::card::CardView;
use crate::error::{Error, Result};
use crate::projection::qr;
use crate::record::DataUri;

/// Space between the frame and its contents, in pixels.
const PADDING: u32 = 16;

const BORDER: u32 = 4;

/// Turns a laid-out card into encoded image bytes (PNG).
#[async_trait]
pub trait CardRasterizer: Send + Sync {
    /// Rasterize `card`.
    ///
    /// # Errors
    ///
    /// Returns an error if the card cannot be drawn.
    async fn rasterize(&self, card: &CardView) -> Result<Vec<u8>>;
}

/// Draws the card frame in its template colors with the photo and the QR
/// symbol side by side, encoded as PNG.
///
/// Text lines are not drawn. A photo that cannot be decoded is skipped with
/// a warning.
#[derive(Debug, Clone, Copy, Default)]
pub struct PngRasterizer;

impl PngRasterizer {
    fn draw(card: &CardView) -> Result<RgbImage> {
        let code = qr::build_symbol(card.qr.token.as_str(), card.qr.level)?;
        let symbol = DynamicImage::ImageLuma8(
            code.render::<Luma<u8>>()
                .min_dimensions(card.qr.size, card.qr.size)
                .build(),
        )
        .to_rgb8();
        let photo = card
            .photo
            .as_ref()
            .and_then(|photo| decode_photo(photo, symbol.height()));

        let photo_width = photo.as_ref().map_or(0, |p| p.width() + PADDING);
        let content_height = photo
            .as_ref()
            .map_or(0, RgbImage::height)
            .max(symbol.height());
        let width = PADDING + photo_width + symbol.width() + PADDING;
        let height = PADDING + content_height + PADDING;

        let fill = Rgb(card.template.fill_rgb());
        let border = Rgb(card.template.border_rgb());
        let mut canvas = RgbImage::from_fn(width, height, |x, y| {
            if x < BORDER || y < BORDER || x >= width - BORDER || y >= height - BORDER {
                border
            } else {
                fill
            }
        });
        if let Some(photo) = &photo {
            imageops::overlay(&mut canvas, photo, i64::from(PADDING), i64::from(PADDING));
        }
        imageops::overlay(
            &mut canvas,
            &symbol,
            i64::from(PADDING + photo_width),
            i64::from(PADDING),
        );
        Ok(canvas)
    }
}

#[async_trait]
impl CardRasterizer for PngRasterizer {
    async fn rasterize(&self, card: &CardView) -> Result<Vec<u8>> {
        let canvas = Self::draw(card)?;
        let mut png = Vec::new();
        canvas
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| Error::rasterize(format!("PNG encoding failed: {e}")))?;
        Ok(png)
    }
}

/// Decode the photo and shrink it to fit a `max_edge` square.
fn decode_photo(photo: &DataUri, max_edge: u32) -> Option<RgbImage> {
    let decoded = photo.decode_payload().and_then(|bytes| {
        image::load_from_memory(&bytes).map_err(|e| Error::data_uri(e.to_string()))
    });
    match decoded {
        Ok(img) => Some(img.thumbnail(max_edge, max_edge).to_rgb8()),
        Err(e) => {
            warn!(mime = photo.mime_type(), error = %e, "Photo left off the card image");
            None
        }
    }
}

/// Rasterize `card` and write it to `<out_dir>/<name>_id_card.png`.
///
/// Returns the path written. An existing file is replaced.
///
/// # Errors
///
/// Returns an error if rasterizing fails, the directory cannot be created,
/// or the file cannot be written.
pub async fn export_card(
    rasterizer: &dyn CardRasterizer,
    card: &CardView,
    out_dir: &Path,
) -> Result<PathBuf> {
    let bytes = rasterizer.rasterize(card).await?;
    if bytes.is_empty() {
        return Err(Error::rasterize("rasterizer produced no image data"));
    }

    tokio::fs::create_dir_all(out_dir)
        .await
        .map_err(|source| Error::DirectoryCreate {
            path: out_dir.to_path_buf(),
            source,
        })?;

    let path = out_dir.join(card.file_name());
    tokio::fs::write(&path, &bytes).await?;
    info!(path = %path.display(), bytes = bytes.len(), "Exported card");
    Ok(path)
}
