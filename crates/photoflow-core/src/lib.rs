//! photoflow-core: a viewport-driven download/filter pipeline for photo lists.
//!
//! Each visible item moves through two stages (fetch bytes, apply a tone
//! filter) with at most one in-flight task per item per stage. Work for items
//! that scroll off-screen is cancelled; all work pauses while the viewport is
//! in motion and is retargeted when it settles. See [`scheduler::PhotoPipeline`].

pub mod cancel;
pub mod config;
pub mod fetch;
pub mod filter;
pub mod logging;
pub mod record;
pub mod registry;
pub mod runner;
pub mod scheduler;
pub mod source;
pub mod stage;
