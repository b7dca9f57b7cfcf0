//! Output file naming

use std::path::{Path, PathBuf};

/// Extension of every produced file
pub const OUTPUT_EXTENSION: &str = "mp4";

const MAX_TITLE_CHARS: usize = 100;
const RESERVED: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Replace characters that are invalid in file names and cap the length.
///
/// Idempotent: the output contains no reserved characters and is already
/// within the length limit.
pub fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .map(|c| if RESERVED.contains(&c) { '_' } else { c })
        .take(MAX_TITLE_CHARS)
        .collect()
}

/// `<dir>/<sanitized title>.<ext>`
pub fn destination_path(dir: &Path, title: &str) -> PathBuf {
    dir.join(format!("{}.{}", sanitize_title(title), OUTPUT_EXTENSION))
}

/// Sibling path used while a direct transfer is in flight
pub fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    destination.with_file_name(name)
}
