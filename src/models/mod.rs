pub mod item;
pub mod parameters;

pub use item::{BinaryData, Item};
pub use parameters::{ExifMetadata, MetadataValue, NodeOptions, NodeParameters, Operation};
