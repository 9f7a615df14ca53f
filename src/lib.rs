//! Batch exif processing for workflow items.
//!
//! Each item's binary attachment is staged in a storage directory, handed to
//! `exiftool` for one of five operations, repacked and cleaned up again.

pub mod common;
pub mod config;
pub mod exiftool;
pub mod models;
pub mod utils;
pub mod workflow;

pub use common::errors::{ErrorContext, ErrorRecord, ExifError, NodeError};
pub use config::NodeConfig;
pub use exiftool::{ExifTool, MetadataTool, TagValue, WriteResult};
pub use models::{BinaryData, Item, MetadataValue, NodeParameters, Operation};
pub use workflow::ExifDataNode;
