//! Core configuration types

pub mod document;
pub mod error;
pub mod result;

pub use document::{ConfigDocument, json_type_name};
pub use error::ConfigError;
pub use result::ConfigResult;
