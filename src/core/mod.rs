//! Core module - Contains the fundamental data structures and utilities
//!
//! This module provides:
//! - Unified result model (ResultItem)
//! - Rendering functions for different output formats
//! - Error taxonomy for git queries
//! - Text framing helpers for line-oriented output
//! - Common utilities

pub mod error;
pub mod frame;
pub mod model;
pub mod render;
pub mod util;
