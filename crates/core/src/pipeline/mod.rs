pub mod config;
pub mod decode_path;
pub mod driver;
pub mod worker_pool;
