use std::collections::VecDeque;
use std::path::PathBuf;

use crate::acquisition::domain::frame_source::{FrameSource, GrabStatus, SourceError};
use crate::shared::frame_buffer::FrameBuffer;

/// Adapts one image file or a finite sequence of them to the
/// [`FrameSource`] interface.
///
/// Images are decoded lazily on grab and converted to single-channel
/// luminance. Dimensions are taken from the first image; every frame is
/// resized to the source's current dimensions, which also makes
/// `try_set_dimensions` work for patch-size auto-correction.
pub struct ImageFileSource {
    pending: VecDeque<PathBuf>,
    width: u32,
    height: u32,
}

impl ImageFileSource {
    /// Probes the first image for dimensions without decoding pixel data.
    pub fn open(paths: Vec<PathBuf>) -> Result<Self, SourceError> {
        let first = paths.first().ok_or("no input images given")?;
        let (width, height) = image::image_dimensions(first)?;
        Ok(Self {
            pending: paths.into(),
            width,
            height,
        })
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl FrameSource for ImageFileSource {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn try_set_dimensions(&mut self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            return false;
        }
        self.width = width;
        self.height = height;
        true
    }

    fn grab_into(&mut self, buffer: &mut FrameBuffer) -> Result<GrabStatus, SourceError> {
        let Some(path) = self.pending.pop_front() else {
            return Ok(GrabStatus::Ended);
        };

        let mut luma = image::open(&path)?.to_luma8();
        if luma.dimensions() != (self.width, self.height) {
            luma = image::imageops::resize(
                &luma,
                self.width,
                self.height,
                image::imageops::FilterType::Triangle,
            );
        }
        buffer.data_mut().copy_from_slice(luma.as_raw());
        Ok(GrabStatus::NewFrame)
    }

    fn release(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn write_test_image(dir: &Path, name: &str, width: u32, height: u32, fill: u8) -> PathBuf {
        let path = dir.join(name);
        let img = image::GrayImage::from_pixel(width, height, image::Luma([fill]));
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn test_open_reads_dimensions_from_first_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_image(dir.path(), "a.png", 64, 48, 10);
        let source = ImageFileSource::open(vec![path]).unwrap();
        assert_eq!(source.width(), 64);
        assert_eq!(source.height(), 48);
        assert!(!source.is_live());
    }

    #[test]
    fn test_open_without_paths_fails() {
        assert!(ImageFileSource::open(Vec::new()).is_err());
    }

    #[test]
    fn test_open_nonexistent_fails() {
        let result = ImageFileSource::open(vec![PathBuf::from("/nonexistent/x.png")]);
        assert!(result.is_err());
    }

    #[test]
    fn test_grab_fills_buffer_then_ends() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_image(dir.path(), "a.png", 8, 8, 99);
        let mut source = ImageFileSource::open(vec![path]).unwrap();

        let mut buffer = FrameBuffer::new(8, 8);
        assert_eq!(source.grab_into(&mut buffer).unwrap(), GrabStatus::NewFrame);
        assert!(buffer.data().iter().all(|&s| s == 99));
        assert_eq!(source.grab_into(&mut buffer).unwrap(), GrabStatus::Ended);
    }

    #[test]
    fn test_sequence_serves_files_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_test_image(dir.path(), "a.png", 4, 4, 1);
        let b = write_test_image(dir.path(), "b.png", 4, 4, 2);
        let mut source = ImageFileSource::open(vec![a, b]).unwrap();

        let mut buffer = FrameBuffer::new(4, 4);
        source.grab_into(&mut buffer).unwrap();
        assert_eq!(buffer.data()[0], 1);
        source.grab_into(&mut buffer).unwrap();
        assert_eq!(buffer.data()[0], 2);
        assert_eq!(source.grab_into(&mut buffer).unwrap(), GrabStatus::Ended);
    }

    #[test]
    fn test_try_set_dimensions_resizes_frames() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_image(dir.path(), "a.png", 100, 100, 50);
        let mut source = ImageFileSource::open(vec![path]).unwrap();

        assert!(source.try_set_dimensions(96, 96));
        assert_eq!(source.width(), 96);

        let mut buffer = FrameBuffer::new(96, 96);
        assert_eq!(source.grab_into(&mut buffer).unwrap(), GrabStatus::NewFrame);
        assert!(buffer.data().iter().all(|&s| s == 50));
    }

    #[test]
    fn test_release_drops_pending_frames() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_image(dir.path(), "a.png", 4, 4, 1);
        let mut source = ImageFileSource::open(vec![path]).unwrap();
        source.release();
        assert_eq!(source.remaining(), 0);

        let mut buffer = FrameBuffer::new(4, 4);
        assert_eq!(source.grab_into(&mut buffer).unwrap(), GrabStatus::Ended);
    }
}
