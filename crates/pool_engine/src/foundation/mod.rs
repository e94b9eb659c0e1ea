//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the engine:
//! - Math types for world placement
//! - Time sources for the cooperative host loop
//! - Logging utilities

pub mod math;
pub mod time;
pub mod logging;
