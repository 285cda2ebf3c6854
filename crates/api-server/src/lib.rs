#![warn(clippy::unwrap_used)]

pub mod rest;
pub mod server;
pub mod swagger;
pub mod vendor_rest;

pub use server::ApiServer;
pub use swagger::ApiDoc;
