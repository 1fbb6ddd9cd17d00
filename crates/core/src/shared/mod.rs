pub mod bounding_box;
pub mod constants;
pub mod decode_result;
pub mod frame_buffer;
