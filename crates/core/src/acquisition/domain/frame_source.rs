use crate::shared::frame_buffer::FrameBuffer;

pub type SourceError = Box<dyn std::error::Error + Send + Sync>;

/// Outcome of one grab attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GrabStatus {
    /// A fresh frame was written into the buffer.
    NewFrame,
    /// No frame is ready this tick; try again later.
    Pending,
    /// A finite source has no frames left.
    Ended,
}

/// Supplies frames to the pipeline driver.
///
/// The source is owned exclusively by the driver; it writes into whatever
/// buffer the driver hands it and never retains a reference to it.
/// Implementations handle I/O details (camera, video file, image files)
/// behind this contract.
pub trait FrameSource: Send {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Asks the source to deliver frames at different dimensions, used by
    /// the driver to auto-correct sizes that do not tile by the locator's
    /// patch size. Returns `false` if the source cannot comply.
    fn try_set_dimensions(&mut self, width: u32, height: u32) -> bool {
        let _ = (width, height);
        false
    }

    /// Reads the next frame into `buffer`. The buffer's dimensions match
    /// the source's current dimensions.
    fn grab_into(&mut self, buffer: &mut FrameBuffer) -> Result<GrabStatus, SourceError>;

    /// Whether this is a continuous live source (never `Ended`, driver
    /// throttles to presentation timing) or a finite sequence.
    fn is_live(&self) -> bool {
        false
    }

    /// Releases acquisition resources (camera handle, file descriptors).
    fn release(&mut self) {}
}
