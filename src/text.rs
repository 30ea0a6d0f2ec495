//! Text algorithms over plain document snapshots.
//!
//! This module provides:
//! - Line/offset conversion with 1-based line hints
//! - Minimal changed-region computation at character and line granularity
//! - Multi-strategy snippet location around an approximate line hint

pub mod locate;
pub mod position;
pub mod region;

pub use locate::{Locator, Match, SearchWindow, Strategy};
pub use position::{advance_lines, compute_line_starts, line_end, line_start};
pub use region::{CharRegion, LineRegion, diff_chars, diff_lines};
