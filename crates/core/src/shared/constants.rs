/// Horizontal inset of the fixed scan band from the frame edges, in samples.
pub const SCAN_BAND_INSET: f32 = 20.0;

/// Half the height of the fixed scan band, in samples.
pub const SCAN_BAND_HALF_HEIGHT: f32 = 100.0;

/// Default locator patch size; frame dimensions must tile evenly by it.
pub const DEFAULT_PATCH_SIZE: u32 = 32;
