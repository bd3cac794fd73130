//! Observability for the scan engine
//!
//! One process-wide monitor flag gates all emission; events are typed and
//! rendered as single human-readable lines.

pub mod events;
pub mod monitor;

pub use events::ScanEvent;
