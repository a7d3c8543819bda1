#[cfg(feature = "http-server")]
pub mod http;
pub mod raw;
