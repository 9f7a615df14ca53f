pub mod errors;

use std::time::Duration;

pub const SUPPORTED_IMAGE_EXTENSIONS: &'static [&'static str] = &[
    "jpg", "jpeg", "png", "heic", "heif", "tiff", "gif", "bmp", "webp",
];

/// Tag families whose comma separated input is split into a list before writing.
pub const LIST_VALUED_TAGS: &'static [&'static str] = &[
    "Keywords",
    "Subject",
    "HierarchicalSubject",
    "SupplementalCategories",
    "TagsList",
    "LastKeywordXMP",
];

// Sibling files exiftool leaves next to the staged file
pub const IN_PROGRESS_SUFFIX: &str = "_exiftool_tmp";
pub const PROCESSED_SUFFIX: &str = "_processed";
pub const BACKUP_SUFFIX: &str = "_original";

pub const DEFAULT_DATA_PROPERTY: &str = "data";
pub const DEFAULT_OUTPUT_PROPERTY: &str = "exifData";

pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(500);

pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(60);

pub const DEFAULT_EXIFTOOL_PROGRAM: &str = "exiftool";

pub const DEFAULT_STORAGE_PATH: &str = "./storage";

pub fn mime_type_for_extension(ext: &str) -> &'static str {
    match ext {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "heic" => "image/heic",
        "heif" => "image/heif",
        "tiff" => "image/tiff",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}
