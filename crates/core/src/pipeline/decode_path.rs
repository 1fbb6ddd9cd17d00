use std::sync::Arc;

use crate::decoding::domain::barcode_decoder::BarcodeDecoder;
use crate::decoding::domain::barcode_locator::BarcodeLocator;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::decode_result::{DecodeResult, Symbology};
use crate::shared::frame_buffer::FrameBuffer;

/// Builds one isolated decode path per execution context, given the final
/// frame dimensions (which may differ from the source's native size after
/// patch-size auto-correction).
///
/// Every worker slot calls the factory once on its own thread, so locator
/// and decoder state is never shared across contexts. Handing workers a
/// path factory instead of a pipeline also means pool size cannot
/// propagate into a nested pool.
pub type DecodePathFactory = Arc<dyn Fn(u32, u32) -> DecodePath + Send + Sync>;

/// The synchronous locate+decode unit.
///
/// This is the single-threaded fallback the driver runs when no workers
/// exist, and the body every worker slot runs on its own thread. With no
/// locator configured, the fixed scan band stands in for detection.
pub struct DecodePath {
    locator: Option<Box<dyn BarcodeLocator>>,
    decoder: Box<dyn BarcodeDecoder>,
    fixed_box: BoundingBox,
}

impl DecodePath {
    pub fn new(
        locator: Option<Box<dyn BarcodeLocator>>,
        decoder: Box<dyn BarcodeDecoder>,
        fixed_box: BoundingBox,
    ) -> Self {
        Self {
            locator,
            decoder,
            fixed_box,
        }
    }

    /// Runs locate then decode on one frame.
    ///
    /// Returns `None` when the locator found no candidate regions (the
    /// driver publishes "processed" with an empty payload for that case).
    /// A frame that located but did not decode still yields a result, with
    /// `code_result` unset.
    pub fn locate_and_decode(&mut self, frame: &FrameBuffer) -> Option<DecodeResult> {
        let boxes = match self.locator.as_mut() {
            Some(locator) => locator.locate(frame)?,
            None => vec![self.fixed_box.clone()],
        };
        let code_result = self.decoder.decode_from_boxes(frame, &boxes);
        Some(DecodeResult::new(boxes, code_result))
    }

    pub fn set_readers(&mut self, readers: &[Symbology]) {
        self.decoder.set_readers(readers);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::decode_result::CodeResult;
    use std::sync::Mutex;

    struct StubLocator {
        boxes: Option<Vec<BoundingBox>>,
    }

    impl BarcodeLocator for StubLocator {
        fn locate(&mut self, _frame: &FrameBuffer) -> Option<Vec<BoundingBox>> {
            self.boxes.clone()
        }
    }

    #[derive(Default)]
    struct RecordingDecoder {
        seen_boxes: Arc<Mutex<Vec<Vec<BoundingBox>>>>,
        readers: Arc<Mutex<Vec<Symbology>>>,
        result: Option<CodeResult>,
    }

    impl BarcodeDecoder for RecordingDecoder {
        fn decode_from_boxes(
            &mut self,
            _frame: &FrameBuffer,
            boxes: &[BoundingBox],
        ) -> Option<CodeResult> {
            self.seen_boxes.lock().unwrap().push(boxes.to_vec());
            self.result.clone()
        }

        fn set_readers(&mut self, readers: &[Symbology]) {
            *self.readers.lock().unwrap() = readers.to_vec();
        }
    }

    fn fixed_box() -> BoundingBox {
        BoundingBox::scan_band(64, 64)
    }

    #[test]
    fn test_no_locator_uses_fixed_box() {
        let decoder = RecordingDecoder::default();
        let seen = decoder.seen_boxes.clone();
        let mut path = DecodePath::new(None, Box::new(decoder), fixed_box());

        let result = path.locate_and_decode(&FrameBuffer::new(64, 64)).unwrap();
        assert_eq!(result.boxes, vec![fixed_box()]);
        assert_eq!(seen.lock().unwrap()[0], vec![fixed_box()]);
    }

    #[test]
    fn test_locator_returning_none_skips_decode() {
        let decoder = RecordingDecoder::default();
        let seen = decoder.seen_boxes.clone();
        let mut path = DecodePath::new(
            Some(Box::new(StubLocator { boxes: None })),
            Box::new(decoder),
            fixed_box(),
        );

        assert!(path.locate_and_decode(&FrameBuffer::new(64, 64)).is_none());
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_located_boxes_are_attached_to_result() {
        let located = vec![BoundingBox::axis_aligned(1.0, 2.0, 10.0, 5.0)];
        let mut path = DecodePath::new(
            Some(Box::new(StubLocator {
                boxes: Some(located.clone()),
            })),
            Box::new(RecordingDecoder {
                result: Some(CodeResult {
                    code: "1234".to_string(),
                    symbology: Symbology::Code128,
                }),
                ..RecordingDecoder::default()
            }),
            fixed_box(),
        );

        let result = path.locate_and_decode(&FrameBuffer::new(64, 64)).unwrap();
        assert_eq!(result.boxes, located);
        assert_eq!(result.code_result.unwrap().code, "1234");
    }

    #[test]
    fn test_undecodable_frame_yields_result_without_symbol() {
        let mut path = DecodePath::new(None, Box::new(RecordingDecoder::default()), fixed_box());
        let result = path.locate_and_decode(&FrameBuffer::new(64, 64)).unwrap();
        assert!(result.code_result.is_none());
    }

    #[test]
    fn test_set_readers_forwards_to_decoder() {
        let decoder = RecordingDecoder::default();
        let readers = decoder.readers.clone();
        let mut path = DecodePath::new(None, Box::new(decoder), fixed_box());

        path.set_readers(&[Symbology::Ean13, Symbology::Ean8]);
        assert_eq!(
            *readers.lock().unwrap(),
            vec![Symbology::Ean13, Symbology::Ean8]
        );
    }
}
