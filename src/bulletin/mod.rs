//! Bulletin-level processing.
//!
//! This module provides:
//! - Per-page region extraction with static and flow-below strategies
//! - The per-bulletin state machine with idempotency against the store
//! - A file-backed document store
//! - Batch processing over a worker pool
//! - ROI debugging overlays

pub mod debug;
pub mod dynamic;
pub mod processor;
pub mod queue;
pub mod regions;
pub mod store;
pub mod worker;

pub use debug::{roi_summary, save_roi_overlay};
pub use dynamic::DynamicRegionResolver;
pub use processor::{BulletinOutcome, BulletinProcessor, BulletinState, ProcessOptions};
pub use queue::{load_manifest, BulletinJob};
pub use store::JsonFileStore;
pub use worker::run_batch;
