//! Input handling: SQL files, directories, and zip archives.
//!
//! Archive limits are enforced here, before any SQL text reaches the engine,
//! so a crafted archive cannot exhaust the process.

use anyhow::{Context, Result};
use sqlgraph_core::{InputError, SchemaCatalog, SqlFile};
use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

/// Bounds applied to an uploaded or local archive before extraction.
#[derive(Debug, Clone, Copy)]
pub struct ArchiveLimits {
    /// Maximum total decompressed size across all entries.
    pub max_archive_bytes: u64,
    /// Maximum number of file entries.
    pub max_files: usize,
}

/// Read SQL inputs from a mix of files, directories, and zip archives.
pub fn read_inputs(paths: &[PathBuf], limits: &ArchiveLimits) -> Result<Vec<SqlFile>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            files.extend(scan_directory(path)?);
        } else if is_zip(path) {
            let bytes = std::fs::read(path)
                .with_context(|| format!("Failed to read archive: {}", path.display()))?;
            let name = path.display().to_string();
            files.extend(extract_archive(&name, &bytes, limits)?);
        } else {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read file: {}", path.display()))?;
            files.push(SqlFile::new(path.display().to_string(), content));
        }
    }
    Ok(files)
}

/// Recursively collect `.sql` files from a directory.
///
/// Symlinks are not followed so the scan cannot escape the given root.
pub fn scan_directory(dir: &Path) -> Result<Vec<SqlFile>> {
    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(dir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if path.is_file() && has_sql_extension(path) {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read file: {}", path.display()))?;
            files.push(SqlFile::new(path.display().to_string(), content));
        }
    }
    Ok(files)
}

/// Extract `.sql` entries from zip bytes, enforcing limits first.
///
/// Fails with [`InputError`] when the name is not a `.zip`, the archive is
/// unreadable, the declared decompressed size or entry count exceeds the
/// limits, or no `.sql` entries exist. Nothing is parsed on failure.
pub fn extract_archive(
    name: &str,
    bytes: &[u8],
    limits: &ArchiveLimits,
) -> Result<Vec<SqlFile>, InputError> {
    if !name.to_ascii_lowercase().ends_with(".zip") {
        return Err(InputError::NotAnArchive(name.to_string()));
    }

    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|_| InputError::NotAnArchive(name.to_string()))?;

    // Check declared sizes and counts before decompressing anything.
    let mut total_bytes: u64 = 0;
    let mut file_count: usize = 0;
    for index in 0..archive.len() {
        let entry = archive
            .by_index(index)
            .map_err(|_| InputError::NotAnArchive(name.to_string()))?;
        if entry.is_dir() {
            continue;
        }
        file_count += 1;
        total_bytes = total_bytes.saturating_add(entry.size());
    }
    if file_count > limits.max_files {
        return Err(InputError::TooManyFiles {
            count: file_count,
            limit: limits.max_files,
        });
    }
    if total_bytes > limits.max_archive_bytes {
        return Err(InputError::ArchiveTooLarge {
            bytes: total_bytes,
            limit: limits.max_archive_bytes,
        });
    }

    let mut files = Vec::new();
    // Declared sizes can lie; meter the bytes actually decompressed across
    // all entries and fail the moment the running total passes the limit.
    let mut read_total: u64 = 0;
    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|_| InputError::NotAnArchive(name.to_string()))?;
        if entry.is_dir() || !has_sql_extension(Path::new(entry.name())) {
            continue;
        }
        let entry_name = entry.name().to_string();
        let remaining = limits.max_archive_bytes - read_total;
        let mut raw = Vec::new();
        entry
            .by_ref()
            .take(remaining.saturating_add(1))
            .read_to_end(&mut raw)
            .map_err(|_| InputError::NotAnArchive(name.to_string()))?;
        read_total = read_total.saturating_add(raw.len() as u64);
        if read_total > limits.max_archive_bytes {
            return Err(InputError::ArchiveTooLarge {
                bytes: read_total,
                limit: limits.max_archive_bytes,
            });
        }
        let Ok(content) = String::from_utf8(raw) else {
            // Non-UTF-8 entry: skip it; the engine reports the absence
            // through the empty-archive path if nothing remains.
            continue;
        };
        files.push(SqlFile::new(entry_name, content));
    }

    if files.is_empty() {
        return Err(InputError::EmptyArchive);
    }
    Ok(files)
}

/// Load a schema catalog from a JSON file: `{"table": ["col", ...]}`.
pub fn load_catalog(path: &Path) -> Result<SchemaCatalog> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog: {}", path.display()))?;
    let raw: BTreeMap<String, Vec<String>> =
        serde_json::from_str(&text).context("Catalog must map table names to column lists")?;
    let tables = raw
        .into_iter()
        .map(|(table, columns)| (table.to_ascii_lowercase(), columns))
        .collect();
    Ok(SchemaCatalog { tables })
}

fn is_zip(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
}

fn has_sql_extension(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("sql"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::FileOptions;

    pub(crate) fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut cursor);
            let options =
                FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
            for (name, content) in entries {
                writer.start_file(*name, options).unwrap();
                writer.write_all(content.as_bytes()).unwrap();
            }
            writer.finish().unwrap();
        }
        cursor.into_inner()
    }

    fn limits() -> ArchiveLimits {
        ArchiveLimits {
            max_archive_bytes: 1_000_000,
            max_files: 100,
        }
    }

    #[test]
    fn extracts_sql_entries() {
        let bytes = zip_bytes(&[
            ("job1.sql", "SELECT a.x FROM accounts a"),
            ("README.md", "not sql"),
        ]);
        let files = extract_archive("jobs.zip", &bytes, &limits()).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "job1.sql");
    }

    #[test]
    fn rejects_wrong_extension() {
        let err = extract_archive("jobs.tar", &[], &limits()).unwrap_err();
        assert!(matches!(err, InputError::NotAnArchive(_)));
    }

    #[test]
    fn rejects_unreadable_bytes() {
        let err = extract_archive("jobs.zip", b"not a zip", &limits()).unwrap_err();
        assert!(matches!(err, InputError::NotAnArchive(_)));
    }

    #[test]
    fn rejects_archive_over_size_limit() {
        let big = "x".repeat(4096);
        let bytes = zip_bytes(&[("job1.sql", big.as_str())]);
        let err = extract_archive(
            "jobs.zip",
            &bytes,
            &ArchiveLimits {
                max_archive_bytes: 1024,
                max_files: 100,
            },
        )
        .unwrap_err();
        assert!(matches!(err, InputError::ArchiveTooLarge { .. }));
    }

    /// Store entries uncompressed so the byte patching below cannot land
    /// inside a deflate stream.
    fn zip_bytes_stored(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut cursor);
            let options =
                FileOptions::default().compression_method(zip::CompressionMethod::Stored);
            for (name, content) in entries {
                writer.start_file(*name, options).unwrap();
                writer.write_all(content.as_bytes()).unwrap();
            }
            writer.finish().unwrap();
        }
        cursor.into_inner()
    }

    /// Zero the declared uncompressed size in the local file headers and the
    /// central directory, simulating an archive that lies about its size.
    fn understate_declared_sizes(mut bytes: Vec<u8>) -> Vec<u8> {
        let mut i = 0;
        while i + 28 <= bytes.len() {
            if bytes[i..i + 4] == [0x50, 0x4b, 0x03, 0x04] {
                bytes[i + 22..i + 26].fill(0);
            } else if bytes[i..i + 4] == [0x50, 0x4b, 0x01, 0x02] {
                bytes[i + 24..i + 28].fill(0);
            }
            i += 1;
        }
        bytes
    }

    #[test]
    fn understated_declared_sizes_still_hit_the_limit() {
        let big = "x".repeat(4096);
        let bytes = understate_declared_sizes(zip_bytes_stored(&[("job1.sql", big.as_str())]));
        let err = extract_archive(
            "jobs.zip",
            &bytes,
            &ArchiveLimits {
                max_archive_bytes: 1024,
                max_files: 100,
            },
        )
        .unwrap_err();
        // The declared-size pre-check sees zero bytes; the metered read of
        // the actual entry data must still enforce the cap, and never hand a
        // truncated entry onward.
        assert!(matches!(err, InputError::ArchiveTooLarge { .. }));
    }

    #[test]
    fn cumulative_reads_are_bounded_across_entries() {
        let chunk = "y".repeat(700);
        let bytes = understate_declared_sizes(zip_bytes_stored(&[
            ("a.sql", chunk.as_str()),
            ("b.sql", chunk.as_str()),
        ]));
        let err = extract_archive(
            "jobs.zip",
            &bytes,
            &ArchiveLimits {
                max_archive_bytes: 1024,
                max_files: 100,
            },
        )
        .unwrap_err();
        assert!(matches!(
            err,
            InputError::ArchiveTooLarge { bytes, limit: 1024 } if bytes > 1024
        ));
    }

    #[test]
    fn rejects_too_many_files() {
        let bytes = zip_bytes(&[("a.sql", "SELECT 1"), ("b.sql", "SELECT 2")]);
        let err = extract_archive(
            "jobs.zip",
            &bytes,
            &ArchiveLimits {
                max_archive_bytes: 1_000_000,
                max_files: 1,
            },
        )
        .unwrap_err();
        assert!(matches!(err, InputError::TooManyFiles { count: 2, limit: 1 }));
    }

    #[test]
    fn archive_without_sql_is_empty() {
        let bytes = zip_bytes(&[("notes.txt", "hello")]);
        let err = extract_archive("jobs.zip", &bytes, &limits()).unwrap_err();
        assert!(matches!(err, InputError::EmptyArchive));
    }

    #[test]
    fn scan_directory_collects_nested_sql() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("sub");
        std::fs::create_dir(&nested).unwrap();
        std::fs::write(dir.path().join("a.sql"), "SELECT 1").unwrap();
        std::fs::write(nested.join("b.sql"), "SELECT 2").unwrap();
        std::fs::write(dir.path().join("skip.txt"), "no").unwrap();

        let files = scan_directory(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn catalog_keys_are_lowercased() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(&path, r#"{"Accounts": ["account_id"]}"#).unwrap();
        let catalog = load_catalog(&path).unwrap();
        assert!(catalog.columns("accounts").is_some());
    }
}
