use ndarray::{ArrayView2, ArrayViewMut2};

/// A single captured frame: contiguous single-channel luminance samples
/// in row-major order.
///
/// Buffers are allocated once (per worker slot, or once for inline mode)
/// and recycled for the lifetime of the pipeline. Ownership is transferred
/// by move, never shared: at any instant exactly one of frame source,
/// worker slot, or inline decoder holds writable access.
#[derive(Debug)]
pub struct FrameBuffer {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl FrameBuffer {
    /// Allocates a zeroed buffer of `width * height` samples.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            data: vec![0; (width as usize) * (height as usize)],
            width,
            height,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_ndarray(&self) -> ArrayView2<'_, u8> {
        ArrayView2::from_shape(self.shape(), &self.data)
            .expect("buffer length must match dimensions")
    }

    pub fn as_ndarray_mut(&mut self) -> ArrayViewMut2<'_, u8> {
        ArrayViewMut2::from_shape(self.shape(), &mut self.data)
            .expect("buffer length must match dimensions")
    }

    fn shape(&self) -> (usize, usize) {
        (self.height as usize, self.width as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_allocates_zeroed_samples() {
        let buffer = FrameBuffer::new(4, 3);
        assert_eq!(buffer.width(), 4);
        assert_eq!(buffer.height(), 3);
        assert_eq!(buffer.len(), 12);
        assert!(buffer.data().iter().all(|&s| s == 0));
    }

    #[test]
    fn test_data_mut_allows_writes() {
        let mut buffer = FrameBuffer::new(2, 2);
        buffer.data_mut()[3] = 200;
        assert_eq!(buffer.data()[3], 200);
    }

    #[test]
    fn test_as_ndarray_shape_is_height_by_width() {
        let buffer = FrameBuffer::new(4, 2);
        assert_eq!(buffer.as_ndarray().shape(), &[2, 4]);
    }

    #[test]
    fn test_as_ndarray_row_major_access() {
        let mut buffer = FrameBuffer::new(3, 2);
        buffer.data_mut()[3] = 255; // row 1, col 0
        assert_eq!(buffer.as_ndarray()[[1, 0]], 255);
        assert_eq!(buffer.as_ndarray()[[0, 1]], 0);
    }

    #[test]
    fn test_as_ndarray_mut_modification() {
        let mut buffer = FrameBuffer::new(2, 2);
        buffer.as_ndarray_mut()[[1, 1]] = 17;
        assert_eq!(buffer.data()[3], 17);
    }
}
