//! Transcript export.

pub mod generator;

pub use generator::{write_transcript, Transcript};
