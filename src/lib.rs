// imagestamp - image stamping and watermarking behind a file cache

pub mod cache;
pub mod config;
pub mod constants;
pub mod error;
pub mod image;
pub mod logging;
pub mod metrics;
pub mod proxy;
pub mod router;
pub mod server;
pub mod source;
