//! Simulcast Core - turn sequencing and synchronized cue playback for the disk display

pub mod assets;
pub mod audio;
pub mod config;
pub mod display;
pub mod engine;
pub mod fetch;
pub mod rotation;
pub mod schedule;
pub mod turn;
pub mod types;

pub use types::*;
