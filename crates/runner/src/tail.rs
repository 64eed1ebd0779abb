// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded log tailing.

use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// Read at most `max_lines` trailing lines from a file without loading it
/// whole; reads a bounded window from the end (8 KiB per requested line).
pub fn tail_file(path: &Path, max_lines: usize) -> std::io::Result<Vec<String>> {
    let mut file = std::fs::File::open(path)?;
    let len = file.metadata()?.len();
    let window = (max_lines as u64).saturating_mul(8192).min(len);
    file.seek(SeekFrom::Start(len - window))?;

    let mut buf = String::new();
    file.read_to_string(&mut buf)?;

    let mut lines: Vec<String> = buf.lines().map(str::to_string).collect();
    // the first line of a mid-file window is usually partial
    if window < len && !lines.is_empty() {
        lines.remove(0);
    }
    let skip = lines.len().saturating_sub(max_lines);
    Ok(lines.split_off(skip))
}

/// Last `max_lines` of a file as one string, empty when unreadable.
pub fn tail_string(path: &Path, max_lines: usize) -> String {
    tail_file(path, max_lines).map(|l| l.join("\n")).unwrap_or_default()
}

#[cfg(test)]
#[path = "tail_tests.rs"]
mod tests;
