pub mod blob_store;
pub mod collector;
pub mod columnar;
pub mod config;
pub mod database;
pub mod datasets;
pub mod error;
pub mod export;
pub mod html_table;
pub mod pipeline;
pub mod types;

pub use error::{EtlError, Result};
