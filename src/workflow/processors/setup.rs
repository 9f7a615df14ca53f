//! Setup/initialization module - handles batch and application startup tasks
//!
//! Includes:
//! - Storage area creation
//! - exiftool availability check
//! - Logger initialization

use crate::common::errors::ExifError;
use crate::exiftool::ExifTool;
use env_logger::{Builder, Env};
use log::kv::Key;
use log::{error, info};
use std::{fs, io::Write, path::Path};

// ────────────────────────────────────────────────────────────────
// Storage Area
// ────────────────────────────────────────────────────────────────

/// Make sure the working directory exists, creating it with its parents.
///
/// Runs once per batch, before any item is touched.
pub fn ensure_storage_area(path: &Path) -> Result<(), ExifError> {
    if path.is_dir() {
        return Ok(());
    }

    match fs::create_dir_all(path) {
        Ok(()) => {
            info!("Created storage path {:?}", path);
            Ok(())
        }
        Err(source) => Err(ExifError::StorageUnavailable {
            path: path.to_path_buf(),
            source,
        }),
    }
}

// ────────────────────────────────────────────────────────────────
// exiftool Check
// ────────────────────────────────────────────────────────────────

/// Log whether exiftool can be executed. Returns the version on success.
pub async fn check_exiftool(tool: &ExifTool) -> Option<String> {
    match tool.version().await {
        Ok(version) => {
            info!("exiftool version: {}", version);
            Some(version)
        }
        Err(err) => {
            error!(
                "`exiftool` is not installed or not usable ({}). Please install it before running the node.",
                err
            );
            None
        }
    }
}

// ────────────────────────────────────────────────────────────────
// Logger Initialization
// ────────────────────────────────────────────────────────────────

/// Initialize the global logger. `RUST_LOG` overrides the default `info` filter.
pub fn initialize_logger() {
    Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = buf.timestamp();

            let level_style = buf.default_level_style(record.level());
            let lvl = format!(
                "{}{:<5}{}",
                level_style.render(),
                record.level(),
                level_style.render_reset()
            );

            // Items report how long they took through a `duration` key
            let dur_raw = record
                .key_values()
                .get(Key::from("duration"))
                .map(|v| v.to_string())
                .unwrap_or_default();
            let dur = format!("{:>10}", dur_raw);

            writeln!(buf, "{} {} {}", ts, lvl, record.target())?;

            let message = format!("{}", record.args());
            let subsequent_indent = " ".repeat(11);
            let mut lines = message.lines();

            if let Some(first_line) = lines.next() {
                writeln!(buf, "{} {}", dur, first_line)?;
            }
            for line in lines {
                writeln!(buf, "{}{}", subsequent_indent, line)?;
            }

            Ok(())
        })
        .init();
}
