// crates/client/src/lib.rs
//! HTTP implementation of the backend job API.

pub mod http;

pub use http::HttpJobClient;
