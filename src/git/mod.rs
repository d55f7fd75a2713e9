//! Git module - Typed queries over git's text output
//!
//! Provides:
//! - command: git invocation (buffered and streaming)
//! - repository: repository handle, commit cache and history listings
//! - commit: commit model and parent navigation
//! - search: paginated history-wide code search
//! - status: streamed added/removed/modified classification
//! - submodule: `.gitmodules` parsing
//! - stats: per-author commit and line-change aggregation
//! - doctor: git availability check

pub mod command;
pub mod commit;
pub mod doctor;
pub mod object;
pub mod repository;
pub mod search;
pub mod stats;
pub mod status;
pub mod submodule;

#[cfg(test)]
pub(crate) mod fixture;
