//! Argument lists for each exiftool operation.

use std::{
    ffi::{OsStr, OsString},
    path::Path,
};

/// Value handed to a single tag write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagValue {
    /// Clears the tag
    Empty,
    Scalar(String),
    List(Vec<String>),
}

pub fn read_args(path: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-json".into(), "-struct".into(), "-G".into()];
    args.push(path.into());
    args
}

pub fn write_tag_args(path: &Path, tag: &str, value: &TagValue) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::new();
    match value {
        TagValue::Empty => args.push(format!("-{}=", tag).into()),
        TagValue::Scalar(value) => args.push(format!("-{}={}", tag, value).into()),
        TagValue::List(values) if values.is_empty() => args.push(format!("-{}=", tag).into()),
        TagValue::List(values) => {
            args.extend(values.iter().map(|value| format!("-{}={}", tag, value).into()));
        }
    }
    args.push(path.into());
    args
}

pub fn delete_args(path: &Path, retain: Option<&[String]>) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-all=".into()];
    if let Some(retain) = retain.filter(|tags| !tags.is_empty()) {
        args.push("-tagsFromFile".into());
        args.push("@".into());
        args.extend(retain.iter().map(|tag| format!("-{}", tag).into()));
    }
    args.push(path.into());
    args
}

pub fn rewrite_args(path: &Path, destination: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = [
        "-all=",
        "-tagsfromfile",
        "@",
        "-all:all",
        "-unsafe",
        "-icc_profile",
        "-o",
    ]
    .into_iter()
    .map(OsString::from)
    .collect();
    args.push(destination.into());
    args.push(path.into());
    args
}

pub fn custom_args(path: &Path, tokens: &[String]) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-json".into()];
    args.extend(tokens.iter().map(OsString::from));
    args.push(path.into());
    args
}

/// One line of the `-@ -` argument stream. exiftool trims argument lines,
/// skips `#` comments and splits on newlines, so such arguments go out as
/// `#[CSTR]` lines with C escapes.
pub fn arg_line(arg: &OsStr) -> Vec<u8> {
    let bytes = arg.as_encoded_bytes();
    let needs_escape = bytes
        .first()
        .is_some_and(|b| b.is_ascii_whitespace() || *b == b'#')
        || bytes.last().is_some_and(u8::is_ascii_whitespace)
        || bytes.iter().any(|b| matches!(b, b'\n' | b'\r'));

    let mut line = Vec::with_capacity(bytes.len() + 8);
    if needs_escape {
        line.extend_from_slice(b"#[CSTR]");
        for &byte in bytes {
            match byte {
                b'\\' => line.extend_from_slice(b"\\\\"),
                b'\n' => line.extend_from_slice(b"\\n"),
                b'\r' => line.extend_from_slice(b"\\r"),
                b'\t' => line.extend_from_slice(b"\\t"),
                other => line.push(other),
            }
        }
    } else {
        line.extend_from_slice(bytes);
    }
    line.push(b'\n');
    line
}

/// Custom commands with an assignment token would write to the file.
pub fn is_write_command<S: AsRef<str>>(tokens: &[S]) -> bool {
    tokens.iter().any(|token| token.as_ref().contains('='))
}
