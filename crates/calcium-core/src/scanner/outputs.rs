use glob::Pattern;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::{error, trace};

use crate::error::Error;

/// A file found in a tool's output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub absolute: PathBuf,
    /// Path relative to the root data directory, `/`-separated.
    pub relative: String,
}

pub fn compile_patterns(globs: &[String]) -> Result<Vec<Pattern>, Error> {
    globs
        .iter()
        .map(|glob| {
            Pattern::new(glob).map_err(|e| {
                error!("Invalid output pattern '{}': {}", glob, e);
                Error::from(e)
            })
        })
        .collect()
}

/// List the immediate children of `dir` that are regular files whose name
/// matches one of `patterns` (any name when `patterns` is empty).
/// Subdirectories are skipped, not descended.
/// Results are sorted by relative path.
pub fn collect_output_files(
    dir: &Path,
    root: &Path,
    patterns: &[Pattern],
) -> Result<Vec<OutputFile>, Error> {
    let entries = fs::read_dir(dir).map_err(|err| {
        io::Error::new(
            err.kind(),
            format!("Error reading directory {}: {}", dir.display(), err),
        )
    })?;

    let mut files = Vec::new();
    for entry_result in entries {
        let entry = entry_result.map_err(|err| {
            io::Error::new(
                err.kind(),
                format!("Error reading entry in directory {}: {}", dir.display(), err),
            )
        })?;

        let path = entry.path();
        // Follows symlinks; a dangling link is not a regular file.
        let metadata = match fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                trace!("Skipping dangling link {}", path.display());
                continue;
            }
            Err(err) => {
                return Err(io::Error::new(
                    err.kind(),
                    format!("Error getting metadata for {}: {}", path.display(), err),
                )
                .into())
            }
        };
        if !metadata.is_file() {
            trace!("Skipping non-file entry {}", path.display());
            continue;
        }

        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            error!("Output file name is not valid UTF-8: {}", path.display());
            return Err(Error::NonUtf8Path(path));
        };
        if !patterns.is_empty() && !patterns.iter().any(|pattern| pattern.matches(name)) {
            trace!("Skipping {} (no pattern matched)", path.display());
            continue;
        }

        let relative = relative_posix(&path, root)?;
        files.push(OutputFile {
            absolute: path,
            relative,
        });
    }

    files.sort_by(|a, b| a.relative.cmp(&b.relative));
    Ok(files)
}

/// `path` relative to `root`, joined with `/` regardless of platform.
/// `.` components are ignored on both sides.
pub fn relative_posix(path: &Path, root: &Path) -> Result<String, Error> {
    let path_norm = without_cur_dir(path);
    let root_norm = without_cur_dir(root);
    let relative = path_norm
        .strip_prefix(&root_norm)
        .map_err(|_| Error::OutsideRoot {
            path: path.to_path_buf(),
            root: root.to_path_buf(),
        })?;

    let mut parts = Vec::new();
    for component in relative.components() {
        let part = component
            .as_os_str()
            .to_str()
            .ok_or_else(|| Error::NonUtf8Path(path.to_path_buf()))?;
        parts.push(part);
    }
    Ok(parts.join("/"))
}

fn without_cur_dir(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn all() -> Vec<Pattern> {
        compile_patterns(&["*".to_string()]).unwrap()
    }

    #[test]
    fn test_relative_posix_nested() {
        let rel = relative_posix(
            Path::new("/data/suite2p/scan_1/F.npy"),
            Path::new("/data"),
        )
        .unwrap();
        assert_eq!(rel, "suite2p/scan_1/F.npy");
    }

    #[test]
    fn test_relative_posix_ignores_cur_dir() {
        let rel = relative_posix(Path::new("./data/suite2p/F.npy"), Path::new("data")).unwrap();
        assert_eq!(rel, "suite2p/F.npy");
        let rel = relative_posix(Path::new("data/suite2p/F.npy"), Path::new("./data")).unwrap();
        assert_eq!(rel, "suite2p/F.npy");
    }

    #[cfg(unix)]
    #[test]
    fn test_relative_posix_rejects_non_utf8() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let path = Path::new("/data").join(OsStr::from_bytes(b"F\xff.npy"));
        assert!(matches!(
            relative_posix(&path, Path::new("/data")),
            Err(Error::NonUtf8Path(_))
        ));
    }

    #[test]
    fn test_relative_posix_outside_root() {
        let err = relative_posix(Path::new("/other/F.npy"), Path::new("/data")).unwrap_err();
        assert!(matches!(err, Error::OutsideRoot { .. }));
    }

    #[test]
    fn test_collect_skips_directories() {
        let root = tempdir().unwrap();
        let out = root.path().join("out");
        fs::create_dir_all(out.join("extra")).unwrap();
        fs::write(out.join("F2.npy"), b"b").unwrap();
        fs::write(out.join("F1.npy"), b"a").unwrap();
        fs::write(out.join("extra").join("nested.npy"), b"c").unwrap();

        let files = collect_output_files(&out, root.path(), &all()).unwrap();
        let names: Vec<_> = files.iter().map(|f| f.relative.as_str()).collect();
        assert_eq!(names, vec!["out/F1.npy", "out/F2.npy"]);
        assert_eq!(files[0].absolute, out.join("F1.npy"));
    }

    #[test]
    fn test_collect_honors_patterns() {
        let root = tempdir().unwrap();
        fs::write(root.path().join("stat.npy"), b"a").unwrap();
        fs::write(root.path().join("notes.txt"), b"b").unwrap();

        let patterns = compile_patterns(&["*.npy".to_string()]).unwrap();
        let files = collect_output_files(root.path(), root.path(), &patterns).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].relative, "stat.npy");
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        assert!(matches!(
            compile_patterns(&["[".to_string()]),
            Err(Error::Pattern(_))
        ));
    }
}
