//! ZIP bundling of rendered PDFs.

use std::collections::HashSet;
use std::io::{Cursor, Write};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::Result;

/// Deflate level used for every entry (maximum compression).
pub const COMPRESSION_LEVEL: i64 = 9;

/// One file to place in an archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveEntry<'a> {
    pub name: &'a str,
    pub bytes: &'a [u8],
}

impl<'a> ArchiveEntry<'a> {
    pub fn new(name: &'a str, bytes: &'a [u8]) -> Self {
        Self { name, bytes }
    }
}

/// Pack `entries` into one in-memory ZIP archive.
///
/// Entry names are made unique first (`a.pdf`, `a-2.pdf`, ...). Any write
/// error aborts the whole bundle; no partial archive is returned.
pub fn bundle(entries: &[ArchiveEntry<'_>]) -> Result<Vec<u8>> {
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(COMPRESSION_LEVEL));
    let names = unique_names(entries.iter().map(|e| e.name));

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (entry, name) in entries.iter().zip(names) {
        debug!(name = %name, bytes = entry.bytes.len(), "adding archive entry");
        writer.start_file(name, options)?;
        writer.write_all(entry.bytes)?;
    }
    let cursor = writer.finish()?;
    Ok(cursor.into_inner())
}

/// Deduplicate names in order, suffixing `-2`, `-3`, ... before the extension.
pub fn unique_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::new();
    let mut out = Vec::new();
    for name in names {
        let mut candidate = name.to_string();
        let mut n = 2;
        while taken.contains(&candidate) {
            candidate = with_suffix(name, n);
            n += 1;
        }
        taken.insert(candidate.clone());
        out.push(candidate);
    }
    out
}

fn with_suffix(name: &str, n: usize) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}-{n}.{ext}"),
        _ => format!("{name}-{n}"),
    }
}
