// LogScope - core/mod.rs
//
// Core business logic layer.
// Dependencies: util layer plus regex, chrono, serde, csv.
// Must NOT depend on: app, platform, or filesystem I/O (export writes to
// Write trait objects only).

pub mod export;
pub mod model;
pub mod normalizer;
pub mod window;
