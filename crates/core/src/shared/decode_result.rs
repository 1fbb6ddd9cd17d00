use crate::shared::bounding_box::BoundingBox;

/// A barcode encoding scheme a decoder can be configured to read.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Symbology {
    Code128,
    Ean13,
    Ean8,
}

/// A successfully decoded symbol.
#[derive(Clone, Debug, PartialEq)]
pub struct CodeResult {
    pub code: String,
    pub symbology: Symbology,
}

/// The outcome of processing one frame (or one dispatched job).
///
/// Produced once per processed frame and immutable after creation.
/// `code_result` is `None` when the candidate regions held no decodable
/// symbol; that is a normal outcome, not an error.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodeResult {
    pub boxes: Vec<BoundingBox>,
    pub code_result: Option<CodeResult>,
}

impl DecodeResult {
    pub fn new(boxes: Vec<BoundingBox>, code_result: Option<CodeResult>) -> Self {
        Self { boxes, code_result }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_without_symbol() {
        let result = DecodeResult::new(vec![BoundingBox::axis_aligned(0.0, 0.0, 10.0, 10.0)], None);
        assert_eq!(result.boxes.len(), 1);
        assert!(result.code_result.is_none());
    }

    #[test]
    fn test_result_with_symbol() {
        let result = DecodeResult::new(
            Vec::new(),
            Some(CodeResult {
                code: "4006381333931".to_string(),
                symbology: Symbology::Ean13,
            }),
        );
        let code = result.code_result.unwrap();
        assert_eq!(code.code, "4006381333931");
        assert_eq!(code.symbology, Symbology::Ean13);
    }
}
