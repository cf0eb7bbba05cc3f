// Grounding-frame → device-pixel coordinate mapping.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ClickError;

/// Width and height of a coordinate space (grounding frame or device screen).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn contains(&self, (x, y): (i32, i32)) -> bool {
        x >= 0 && y >= 0 && (x as i64) < self.width as i64 && (y as i64) < self.height as i64
    }
}

impl fmt::Display for FrameSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}×{}", self.width, self.height)
    }
}

/// Axis-aligned box `[xmin, ymin, xmax, ymax]`.
///
/// `xmin <= xmax` and `ymin <= ymax` is expected but not enforced; backends
/// that violate it produce meaningless but non-panicking results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub xmin: i32,
    pub ymin: i32,
    pub xmax: i32,
    pub ymax: i32,
}

impl BoundingBox {
    pub const ZERO: BoundingBox = BoundingBox::new(0, 0, 0, 0);

    pub const fn new(xmin: i32, ymin: i32, xmax: i32, ymax: i32) -> Self {
        Self { xmin, ymin, xmax, ymax }
    }

    /// Integer centre, rounding toward negative infinity.
    pub fn center(&self) -> (i32, i32) {
        let cx = (self.xmin as i64 + self.xmax as i64).div_euclid(2);
        let cy = (self.ymin as i64 + self.ymax as i64).div_euclid(2);
        (cx as i32, cy as i32)
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

/// Wire format: `xmin,ymin,xmax,ymax`.
impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.xmin, self.ymin, self.xmax, self.ymax)
    }
}

impl FromStr for BoundingBox {
    type Err = ClickError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = s
            .split(',')
            .map(|part| part.trim().parse::<i32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| ClickError::MalformedBoundingBox(s.to_string()))?;
        match values[..] {
            [xmin, ymin, xmax, ymax] => Ok(Self::new(xmin, ymin, xmax, ymax)),
            _ => Err(ClickError::MalformedBoundingBox(s.to_string())),
        }
    }
}

/// Scale `bbox` from `source` space into `target` space, each axis
/// independently. No clamping: out-of-range input stays out of range.
/// A zero-sized source leaves the box untouched.
pub fn rescale(bbox: BoundingBox, source: FrameSize, target: FrameSize) -> BoundingBox {
    if source.width == 0 || source.height == 0 {
        tracing::warn!(%source, "zero-sized source frame, box left unscaled");
        return bbox;
    }
    let sx = target.width as f64 / source.width as f64;
    let sy = target.height as f64 / source.height as f64;
    let scale = |v: i32, ratio: f64| (v as f64 * ratio).round() as i32;
    BoundingBox {
        xmin: scale(bbox.xmin, sx),
        ymin: scale(bbox.ymin, sy),
        xmax: scale(bbox.xmax, sx),
        ymax: scale(bbox.ymax, sy),
    }
}
