pub mod barcode_decoder;
pub mod barcode_locator;
