//! Processors module - per-item processing logic
//!
//! This module contains the following submodules:
//! - `setup`: Initialization (storage area, exiftool check, logger)
//! - `staging`: Staging path derivation, staged file writes and artifact cleanup
//! - `dispatch`: Mapping of the five operations onto exiftool calls
//! - `lifecycle`: Stage, dispatch, repack and cleanup of a single item

pub mod dispatch;
pub mod lifecycle;
pub mod setup;
pub mod staging;
