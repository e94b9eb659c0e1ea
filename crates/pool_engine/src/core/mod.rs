//! # Core Module
//!
//! Shared configuration types used by the pooling layer and by hosts that
//! declare their pools in data files.
//!
//! ## Organization
//!
//! - **Config**: Per-pool policy and registry-wide settings
//! - **Foundation**: Low-level utilities (math, time, logging)

pub mod config;

// Re-export foundation modules for convenience
pub use crate::foundation;

// Re-export commonly used config types
pub use config::{
    PoolConfig,
    PoolDefinition,
    RegistryConfig,
    Config,
    ConfigError,
};
