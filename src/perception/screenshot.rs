use std::io::Cursor;
use std::path::{Path, PathBuf};

use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::errors::{ClickError, ClickResult};

/// Which representation an executor hands back from `screenshot()`.
///
/// One per executor instance; the variants are mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenshotMode {
    #[default]
    Image,
    Base64,
    TempFile,
}

/// A captured device image in one of the three supported forms.
///
/// Temp files are not removed by the task loop.
#[derive(Debug, Clone)]
pub enum Screenshot {
    Image(image::DynamicImage),
    /// PNG bytes, standard base64 alphabet, no data-URI prefix.
    Base64(String),
    TempFile(PathBuf),
}

impl Screenshot {
    /// Package raw PNG bytes according to `mode`.
    pub fn from_png(png: &[u8], mode: ScreenshotMode) -> ClickResult<Self> {
        match mode {
            ScreenshotMode::Image => Ok(Self::Image(image::load_from_memory(png)?)),
            ScreenshotMode::Base64 => {
                // decode once so a truncated capture fails here, not at the LLM
                image::load_from_memory(png)?;
                Ok(Self::Base64(base64::engine::general_purpose::STANDARD.encode(png)))
            }
            ScreenshotMode::TempFile => Ok(Self::TempFile(write_temp_png(png)?)),
        }
    }

    pub fn mode(&self) -> ScreenshotMode {
        match self {
            Self::Image(_) => ScreenshotMode::Image,
            Self::Base64(_) => ScreenshotMode::Base64,
            Self::TempFile(_) => ScreenshotMode::TempFile,
        }
    }

    /// Base64 PNG for LLM requests, whatever the stored form.
    pub async fn to_base64_png(&self) -> ClickResult<String> {
        match self {
            Self::Base64(b64) => Ok(b64.clone()),
            Self::Image(img) => {
                let png = encode_png(img)?;
                Ok(base64::engine::general_purpose::STANDARD.encode(png))
            }
            Self::TempFile(path) => {
                let bytes = tokio::fs::read(path).await?;
                Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
            }
        }
    }

    /// Something a progress consumer can render: base64 captures are
    /// materialised into a temp file, the other forms are passed through.
    pub fn to_frame_ref(&self) -> ClickResult<Screenshot> {
        match self {
            Self::Base64(b64) => {
                let png = base64::engine::general_purpose::STANDARD.decode(b64)?;
                Ok(Self::TempFile(write_temp_png(&png)?))
            }
            other => Ok(other.clone()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::TempFile(path) => Some(path),
            _ => None,
        }
    }
}

fn encode_png(img: &image::DynamicImage) -> ClickResult<Vec<u8>> {
    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)?;
    Ok(out)
}

fn write_temp_png(png: &[u8]) -> ClickResult<PathBuf> {
    let path = std::env::temp_dir().join(format!("clickclickclick_{}.png", uuid::Uuid::new_v4()));
    std::fs::write(&path, png).map_err(|e| {
        ClickError::Perception(format!("write screenshot {}: {e}", path.display()))
    })?;
    tracing::debug!(path = %path.display(), "screenshot written to temp file");
    Ok(path)
}

#[cfg(test)]
pub(crate) fn tiny_png() -> Vec<u8> {
    let img = image::DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
        4,
        2,
        image::Rgba([10, 20, 30, 255]),
    ));
    encode_png(&img).expect("encode test png")
}
