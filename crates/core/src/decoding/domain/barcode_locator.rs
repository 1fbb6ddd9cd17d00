use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame_buffer::FrameBuffer;

/// Locates candidate barcode regions in a frame.
///
/// Returning `None` means no candidates were found this frame; it is a
/// normal outcome, not an error. Implementations may be stateful (e.g.
/// reusing scratch buffers between frames), hence `&mut self`.
pub trait BarcodeLocator: Send {
    fn locate(&mut self, frame: &FrameBuffer) -> Option<Vec<BoundingBox>>;
}
