// src/lib.rs
pub mod config;
pub mod dsp;
pub mod sigmf;
