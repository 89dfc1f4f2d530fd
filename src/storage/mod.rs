//! Object storage backends.

pub mod local;
pub mod memory;
pub mod s3;
pub mod store;
