//! Input file discovery.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{MediaError, MediaResult};

/// Default extension for recordings.
pub const DEFAULT_EXTENSION: &str = "m4a";

/// Files found under an input path, plus anything that was passed over.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Discovery {
    /// Matching files, sorted.
    pub files: Vec<PathBuf>,
    /// Paths that were skipped or could not be read, with the reason.
    pub skipped: Vec<(PathBuf, String)>,
}

/// Collect recordings from a file or directory.
///
/// Directories are scanned one level deep unless `recursive` is set.
/// Extensions are compared case-insensitively and without the dot.
pub fn discover_inputs(
    input: &Path,
    recursive: bool,
    extensions: &[String],
) -> MediaResult<Discovery> {
    if !input.exists() {
        return Err(MediaError::FileNotFound(input.to_path_buf()));
    }

    let mut discovery = Discovery::default();

    if input.is_file() {
        if has_extension(input, extensions) {
            discovery.files.push(input.to_path_buf());
        } else {
            discovery.skipped.push((
                input.to_path_buf(),
                format!("extension not in [{}]", extensions.join(", ")),
            ));
        }
        return Ok(discovery);
    }

    let walker = WalkDir::new(input)
        .min_depth(1)
        .max_depth(if recursive { usize::MAX } else { 1 })
        .follow_links(true);

    for entry in walker {
        match entry {
            Ok(entry) if entry.file_type().is_file() => {
                if has_extension(entry.path(), extensions) {
                    discovery.files.push(entry.into_path());
                }
            }
            Ok(_) => {}
            Err(e) => {
                let path = e
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| input.to_path_buf());
                warn!(path = %path.display(), error = %e, "Cannot read path, skipping");
                discovery.skipped.push((path, e.to_string()));
            }
        }
    }

    discovery.files.sort();
    debug!(
        input = %input.display(),
        recursive,
        found = discovery.files.len(),
        "Input discovery complete"
    );

    Ok(discovery)
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy())
        .is_some_and(|ext| {
            extensions
                .iter()
                .any(|wanted| wanted.trim_start_matches('.').eq_ignore_ascii_case(&ext))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn exts() -> Vec<String> {
        vec![DEFAULT_EXTENSION.to_string()]
    }

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.m4a"), b"").unwrap();
        fs::write(dir.path().join("a.M4A"), b"").unwrap();
        fs::write(dir.path().join("notes.txt"), b"").unwrap();
        fs::create_dir(dir.path().join("week2")).unwrap();
        fs::write(dir.path().join("week2").join("c.m4a"), b"").unwrap();
        dir
    }

    #[test]
    fn test_flat_scan_sorted() {
        let dir = fixture();
        let found = discover_inputs(dir.path(), false, &exts()).unwrap();
        assert_eq!(
            found.files,
            vec![dir.path().join("a.M4A"), dir.path().join("b.m4a")]
        );
    }

    #[test]
    fn test_recursive_scan() {
        let dir = fixture();
        let found = discover_inputs(dir.path(), true, &exts()).unwrap();
        assert_eq!(found.files.len(), 3);
        assert!(found.files.contains(&dir.path().join("week2").join("c.m4a")));
    }

    #[test]
    fn test_single_file_input() {
        let dir = fixture();
        let found = discover_inputs(&dir.path().join("notes.txt"), false, &exts()).unwrap();
        assert!(found.files.is_empty());
        assert_eq!(found.skipped.len(), 1);

        let with_txt = discover_inputs(&dir.path().join("notes.txt"), false, &[".txt".to_string()]).unwrap();
        assert_eq!(with_txt.files.len(), 1);
    }

    #[test]
    fn test_missing_input() {
        let err = discover_inputs(Path::new("/nonexistent/tailtrim"), false, &exts()).unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }
}
