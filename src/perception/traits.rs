use async_trait::async_trait;

use crate::executor::coordinator::{self, BoundingBox, FrameSize};
use crate::perception::screenshot::Screenshot;

/// Grounding capability: natural-language element description → bounding box.
#[async_trait]
pub trait Finder: Send + Sync {
    /// Returns `"xmin,ymin,xmax,ymax"` in the grounding frame. Never fails:
    /// backend errors are logged and reported as `"0,0,0,0"`.
    async fn locate(&self, description: &str, screenshot: Option<&Screenshot>) -> String;

    /// Normalized frame the backend answers in.
    fn frame_size(&self) -> FrameSize;

    /// Device resolution boxes are mapped onto.
    fn device_size(&self) -> FrameSize;

    fn rescale(&self, bbox: BoundingBox) -> BoundingBox {
        coordinator::rescale(bbox, self.frame_size(), self.device_size())
    }
}
