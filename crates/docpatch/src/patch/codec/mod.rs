//! Codecs for patches.

pub mod json;
