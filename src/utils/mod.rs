use std::{
    fs, io,
    path::{Path, PathBuf},
};

pub trait PathExt {
    fn ext_lower(&self) -> String;
}

impl PathExt for Path {
    fn ext_lower(&self) -> String {
        self.extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_ascii_lowercase())
            .unwrap_or_default()
    }
}

/// Append `suffix` to the full file name, keeping the extension in front of it
/// (`data.png` + `_original` -> `data.png_original`).
pub fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(suffix);
    PathBuf::from(os)
}

/// Remove a file if it exists. Returns whether something was removed.
pub fn remove_if_exists(path: &Path) -> io::Result<bool> {
    if !path.exists() {
        return Ok(false);
    }
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ext_lower_normalizes_case() {
        assert_eq!(Path::new("IMG_0001.JPG").ext_lower(), "jpg");
        assert_eq!(Path::new("no_extension").ext_lower(), "");
    }

    #[test]
    fn sibling_keeps_extension() {
        let path = Path::new("/tmp/store/data.png");
        assert_eq!(
            sibling_path(path, "_processed"),
            PathBuf::from("/tmp/store/data.png_processed")
        );
    }

    #[test]
    fn remove_missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.jpg");
        assert!(!remove_if_exists(&path).unwrap());

        fs::write(&path, b"x").unwrap();
        assert!(remove_if_exists(&path).unwrap());
        assert!(!path.exists());
    }
}
