//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the pipeline:
//! - Math types and rotation helpers
//! - Time measurement for render passes
//! - Logging utilities

pub mod math;
pub mod time;
pub mod logging;
