pub mod flows;
pub mod processors;
pub mod types;

pub use flows::ExifDataNode;
