//! Utility modules shared across the loader

pub mod human_format;
pub mod url;
