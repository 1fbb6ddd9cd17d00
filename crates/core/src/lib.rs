pub mod acquisition;
pub mod decoding;
pub mod events;
pub mod pipeline;
pub mod shared;
