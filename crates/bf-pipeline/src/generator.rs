//! Entry generation: build the worklist for a runner.
//!
//! [`generate`] walks an input directory and maps every file to a path under
//! the output directory with its extension replaced. [`EntrySource`] is the
//! tagged request shape that selects how a worklist is produced.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use bf_core::{Entry, Error, Result};

/// How the worklist of a start request is produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum EntrySource {
    /// Walk `input_dir` recursively, mapping files into `output_dir`.
    Directory {
        input_dir: PathBuf,
        output_dir: PathBuf,
        output_extension: String,
    },
    /// Explicit entries, used as given.
    List { entries: Vec<Entry> },
    /// Numbered sequences. Accepted on the wire but not supported.
    Sequence {},
}

impl EntrySource {
    /// Short name of the mode.
    pub fn mode(&self) -> &'static str {
        match self {
            EntrySource::Directory { .. } => "directory",
            EntrySource::List { .. } => "list",
            EntrySource::Sequence {} => "sequence",
        }
    }

    /// Produce the worklist.
    ///
    /// # Errors
    ///
    /// - [`Error::Generation`] if the input directory is missing or unreadable.
    /// - [`Error::Validation`] for malformed list entries, an empty output
    ///   extension, or the unsupported `sequence` mode.
    pub fn materialize(&self) -> Result<Vec<Entry>> {
        match self {
            EntrySource::Directory {
                input_dir,
                output_dir,
                output_extension,
            } => generate(input_dir, output_dir, output_extension),
            EntrySource::List { entries } => {
                if let Some(pos) = entries.iter().position(|e| !e.is_well_formed()) {
                    return Err(Error::Validation(format!(
                        "entry {pos} must have matching, non-empty input and output paths"
                    )));
                }
                Ok(entries.clone())
            }
            EntrySource::Sequence {} => Err(Error::Validation(
                "entry generation mode 'sequence' is not supported".into(),
            )),
        }
    }
}

/// Recursively list `input_dir` and map each file into `output_dir`.
///
/// Directories are traversed but never emitted. Entries are ordered by path
/// (file names sorted within each directory). Output directories are not
/// created. A leading `.` on `output_extension` is ignored.
pub fn generate(input_dir: &Path, output_dir: &Path, output_extension: &str) -> Result<Vec<Entry>> {
    let extension = output_extension.trim_start_matches('.');
    if extension.is_empty() {
        return Err(Error::Validation("output extension must not be empty".into()));
    }

    let input_root = absolute(input_dir).map_err(|e| Error::generation(input_dir, e.to_string()))?;
    let output_root =
        absolute(output_dir).map_err(|e| Error::generation(output_dir, e.to_string()))?;

    let meta = std::fs::metadata(&input_root)
        .map_err(|e| Error::generation(&input_root, e.to_string()))?;
    if !meta.is_dir() {
        return Err(Error::generation(&input_root, "not a directory"));
    }

    let mut entries = Vec::new();
    for item in WalkDir::new(&input_root)
        .min_depth(1)
        .sort_by_file_name()
    {
        let item = item.map_err(|e| {
            let path = e.path().unwrap_or(input_root.as_path()).to_path_buf();
            Error::generation(path, e.to_string())
        })?;

        let file_type = item.file_type();
        let is_file = file_type.is_file() || (file_type.is_symlink() && item.path().is_file());
        if !is_file {
            continue;
        }

        let relative = item
            .path()
            .strip_prefix(&input_root)
            .map_err(|e| Error::generation(item.path(), e.to_string()))?;
        let output = output_root.join(replace_extension(relative, extension));
        entries.push(Entry::single(item.path(), output));
    }

    tracing::debug!(
        "Generated {} entries from {}",
        entries.len(),
        input_root.display()
    );

    Ok(entries)
}

/// Replace the suffix after the last `.` of the file name with `extension`.
///
/// Only the final path component is considered, so dots in directory names
/// are never touched. The name is inspected as raw bytes, so names that are
/// not valid UTF-8 are renamed too. A name without a non-empty suffix is
/// returned as-is.
fn replace_extension(relative: &Path, extension: &str) -> PathBuf {
    let Some(name) = relative.file_name() else {
        return relative.to_path_buf();
    };
    let bytes = name.as_encoded_bytes();
    match bytes.iter().rposition(|&b| b == b'.') {
        Some(dot) if dot + 1 == bytes.len() => relative.to_path_buf(),
        // `Path` treats a leading dot as part of the stem.
        Some(0) => relative.with_file_name(format!(".{extension}")),
        Some(_) => relative.with_extension(extension),
        None => relative.to_path_buf(),
    }
}

fn absolute(path: &Path) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn maps_flat_directory() {
        let input = tempfile::tempdir().unwrap();
        touch(input.path(), "a.wav");
        touch(input.path(), "b.wav");

        let entries = generate(input.path(), Path::new("/out"), "mp3").unwrap();
        let outputs: Vec<_> = entries.iter().map(|e| e.output_path().unwrap()).collect();
        assert_eq!(outputs, vec![Path::new("/out/a.mp3"), Path::new("/out/b.mp3")]);
        assert_eq!(entries[0].input_path(), Some(input.path().join("a.wav").as_path()));
    }

    #[test]
    fn recurses_and_skips_directories() {
        let input = tempfile::tempdir().unwrap();
        touch(input.path(), "top.flac");
        touch(input.path(), "one/a.flac");
        touch(input.path(), "one/two/b.flac");
        fs::create_dir_all(input.path().join("empty")).unwrap();

        let entries = generate(input.path(), Path::new("/out"), "ogg").unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries
            .iter()
            .all(|e| e.output_path().unwrap().extension().unwrap() == "ogg"));
        assert!(entries
            .iter()
            .any(|e| e.output_path() == Some(Path::new("/out/one/two/b.ogg"))));
    }

    #[test]
    fn file_without_extension_is_unchanged() {
        let input = tempfile::tempdir().unwrap();
        touch(input.path(), "README");

        let entries = generate(input.path(), Path::new("/out"), "txt").unwrap();
        assert_eq!(entries[0].output_path(), Some(Path::new("/out/README")));
    }

    #[test]
    fn trailing_dot_counts_as_no_extension() {
        let input = tempfile::tempdir().unwrap();
        touch(input.path(), "a.");
        touch(input.path(), ".profile");

        let entries = generate(input.path(), Path::new("/out"), "mp3").unwrap();
        let outputs: Vec<_> = entries.iter().map(|e| e.output_path().unwrap()).collect();
        assert_eq!(outputs, vec![Path::new("/out/.mp3"), Path::new("/out/a.")]);
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_names_get_the_new_extension() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let input = tempfile::tempdir().unwrap();
        let name = OsStr::from_bytes(b"caf\xff.wav");
        if fs::write(input.path().join(name), b"x").is_err() {
            // Some filesystems reject non-UTF-8 names.
            return;
        }

        let entries = generate(input.path(), input.path(), "mp3").unwrap();
        assert_eq!(entries.len(), 1);
        let output = entries[0].output_path().unwrap();
        assert_eq!(output.extension(), Some(OsStr::new("mp3")));
        assert_eq!(output.file_stem(), Some(OsStr::from_bytes(b"caf\xff")));
        assert_ne!(Some(output), entries[0].input_path());
    }

    #[test]
    fn dotted_directory_names_are_preserved() {
        let input = tempfile::tempdir().unwrap();
        touch(input.path(), "v1.2/track");
        touch(input.path(), "v1.2/song.tar.gz");

        let entries = generate(input.path(), Path::new("/out"), "zst").unwrap();
        let outputs: Vec<_> = entries.iter().map(|e| e.output_path().unwrap()).collect();
        assert_eq!(
            outputs,
            vec![Path::new("/out/v1.2/song.tar.zst"), Path::new("/out/v1.2/track")]
        );
    }

    #[test]
    fn leading_dot_on_extension_is_ignored() {
        let input = tempfile::tempdir().unwrap();
        touch(input.path(), "a.wav");
        let entries = generate(input.path(), Path::new("/out"), ".mp3").unwrap();
        assert_eq!(entries[0].output_path(), Some(Path::new("/out/a.mp3")));
    }

    #[test]
    fn empty_directory_yields_no_entries() {
        let input = tempfile::tempdir().unwrap();
        let entries = generate(input.path(), Path::new("/out"), "mp3").unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn missing_directory_is_generation_error() {
        let err = generate(Path::new("/nonexistent/batch/in"), Path::new("/out"), "mp3")
            .unwrap_err();
        assert!(matches!(err, Error::Generation { .. }));
    }

    #[test]
    fn file_as_input_is_generation_error() {
        let input = tempfile::tempdir().unwrap();
        touch(input.path(), "a.wav");
        let err = generate(&input.path().join("a.wav"), Path::new("/out"), "mp3").unwrap_err();
        assert!(matches!(err, Error::Generation { .. }));
    }

    #[test]
    fn output_dirs_are_not_created() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        touch(input.path(), "deep/a.wav");
        generate(input.path(), output.path(), "mp3").unwrap();
        assert!(!output.path().join("deep").exists());
    }

    #[test]
    fn source_modes() {
        let list = EntrySource::List {
            entries: vec![Entry::single("/in/a", "/out/a")],
        };
        assert_eq!(list.materialize().unwrap().len(), 1);

        let bad = EntrySource::List {
            entries: vec![Entry {
                input: Default::default(),
                output: Default::default(),
            }],
        };
        assert!(matches!(bad.materialize(), Err(Error::Validation(_))));

        let seq: EntrySource =
            serde_json::from_str(r#"{"mode": "sequence", "pattern": "frame_%04d.png"}"#).unwrap();
        assert_eq!(seq.mode(), "sequence");
        assert!(matches!(seq.materialize(), Err(Error::Validation(_))));
    }

    #[test]
    fn directory_source_wire_shape() {
        let source: EntrySource = serde_json::from_str(
            r#"{"mode": "directory", "input_dir": "/in", "output_dir": "/out", "output_extension": "mp3"}"#,
        )
        .unwrap();
        assert_eq!(
            source,
            EntrySource::Directory {
                input_dir: "/in".into(),
                output_dir: "/out".into(),
                output_extension: "mp3".into(),
            }
        );
    }
}
