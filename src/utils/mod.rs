use crate::error::{BridgeError, Result};
use std::path::{Path, PathBuf};

const RESERVED_CHARS: [char; 9] = ['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| if RESERVED_CHARS.contains(&c) { '_' } else { c })
        .collect()
}

/// Picks `<title>_<tag>.<ext>` inside `directory`, or `<title>_<tag>_<n>.<ext>`
/// with the smallest `n >= 1` that is free. The quality tag is sanitized
/// like the title, so the name may differ from the raw selector.
///
/// Free means nothing exists at the path when checked. Two processes
/// allocating in the same directory at once can still pick the same name.
pub fn allocate_unique_path(
    directory: &Path,
    title: &str,
    quality_tag: &str,
    extension: &str,
) -> Result<PathBuf> {
    let directory = absolute_path(directory)?;
    let stem = format!("{}_{}", sanitize_filename(title), sanitize_filename(quality_tag));

    let mut counter: u64 = 0;
    loop {
        let file_name = if counter == 0 {
            format!("{}.{}", stem, extension)
        } else {
            format!("{}_{}.{}", stem, counter, extension)
        };
        let candidate = directory.join(file_name);
        // symlink_metadata so a dangling link still counts as taken
        if std::fs::symlink_metadata(&candidate).is_err() {
            return Ok(candidate);
        }
        counter += 1;
    }
}

pub fn absolute_path(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).map_err(|e| BridgeError::file_system("failed to resolve", path, e))
}

/// First run of ASCII digits in `text`, or 0 when there is none.
pub fn leading_number(text: &str) -> u64 {
    let digits: String = text
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();

    if digits.is_empty() {
        return 0;
    }
    digits.parse().unwrap_or(u64::MAX)
}

/// Collapses a possibly multi-line message into one diagnostic line.
pub fn single_line(message: &str) -> String {
    message.split_whitespace().collect::<Vec<_>>().join(" ")
}
