use crate::shared::bounding_box::BoundingBox;
use crate::shared::decode_result::{CodeResult, Symbology};
use crate::shared::frame_buffer::FrameBuffer;

/// Decodes a symbol from candidate regions of a frame.
///
/// Symbology-specific pattern matching lives behind this contract; the
/// pipeline only schedules calls to it. `None` means none of the regions
/// held a readable symbol.
pub trait BarcodeDecoder: Send {
    fn decode_from_boxes(
        &mut self,
        frame: &FrameBuffer,
        boxes: &[BoundingBox],
    ) -> Option<CodeResult>;

    /// Reconfigures which symbologies the decoder attempts.
    fn set_readers(&mut self, readers: &[Symbology]);
}
