//! Archive definition formats.

pub mod yaml;
