//! Locating and moving hall-of-fame artifacts
//!
//! Some backend versions write the hall of fame under a temporary directory
//! instead of the requested output directory. These helpers find the newest
//! match for a glob pattern and move it to `<output_dir>/hall_of_fame.csv`.
//! Prefer configuring the backend's output location; this is a
//! compatibility shim.

use crate::hall_of_fame::HALL_OF_FAME_FILE;
use crate::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{info, warn};

/// Most recently modified file matching `pattern`
///
/// Equal modification times are broken by the lexicographically smallest
/// path. Returns `Ok(None)` when nothing matches.
///
/// # Errors
/// Returns `Error::InvalidInput` for a malformed pattern and `Error::Io` if a
/// matching file cannot be inspected
pub fn find_artifact(pattern: &str) -> Result<Option<PathBuf>> {
    let entries = glob::glob(pattern).map_err(|e| {
        Error::InvalidInput(format!("invalid artifact pattern {pattern:?}: {e}"))
    })?;

    let mut candidates: Vec<(SystemTime, PathBuf)> = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) if path.is_file() => {
                let modified = fs::metadata(&path)
                    .and_then(|m| m.modified())
                    .map_err(|e| Error::io(format!("stat {}", path.display()), e))?;
                candidates.push((modified, path));
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "unreadable path while searching for artifact"),
        }
    }

    match candidates.len() {
        0 => {
            warn!(pattern, "no hall-of-fame artifact found");
            return Ok(None);
        }
        1 => {}
        n => info!(pattern, matches = n, "multiple artifacts found, selecting the most recent"),
    }

    candidates.sort_by(|(ta, pa), (tb, pb)| tb.cmp(ta).then_with(|| pa.cmp(pb)));
    Ok(candidates.into_iter().next().map(|(_, path)| path))
}

/// Move `source` to `<dest_dir>/hall_of_fame.csv`, creating `dest_dir`
///
/// Falls back to copy-then-remove when a rename is not possible (for example
/// across filesystems). The source is only removed after a complete copy.
///
/// # Errors
/// Returns `Error::Io` if `dest_dir` cannot be created and `Error::Relocate`
/// if the move fails
pub fn relocate_artifact(source: &Path, dest_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dest_dir)
        .map_err(|e| Error::io(format!("create {}", dest_dir.display()), e))?;
    let dest = dest_dir.join(HALL_OF_FAME_FILE);

    let relocate_error = |source_err: std::io::Error| Error::Relocate {
        from: source.to_path_buf(),
        to: dest.clone(),
        source: source_err,
    };

    match fs::rename(source, &dest) {
        Ok(()) => {}
        Err(_) if source.is_file() => {
            fs::copy(source, &dest).map_err(relocate_error)?;
            fs::remove_file(source).map_err(relocate_error)?;
        }
        Err(e) => return Err(relocate_error(e)),
    }

    info!(from = %source.display(), to = %dest.display(), "moved hall-of-fame artifact");
    Ok(dest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_find_artifact_prefers_newest() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("a").join(HALL_OF_FAME_FILE);
        let new = dir.path().join("b").join(HALL_OF_FAME_FILE);
        for p in [&old, &new] {
            fs::create_dir_all(p.parent().unwrap()).unwrap();
            fs::write(p, "Complexity,Equation\n").unwrap();
        }
        let past = SystemTime::now() - Duration::from_secs(3600);
        fs::File::options()
            .write(true)
            .open(&old)
            .unwrap()
            .set_modified(past)
            .unwrap();

        let pattern = format!("{}/*/{HALL_OF_FAME_FILE}", dir.path().display());
        assert_eq!(find_artifact(&pattern).unwrap(), Some(new));
    }

    #[test]
    fn test_find_artifact_tie_breaks_by_path() {
        let dir = tempfile::tempdir().unwrap();
        let stamp = SystemTime::now() - Duration::from_secs(60);
        let mut paths = Vec::new();
        for sub in ["z", "m", "c"] {
            let p = dir.path().join(sub).join(HALL_OF_FAME_FILE);
            fs::create_dir_all(p.parent().unwrap()).unwrap();
            fs::write(&p, "").unwrap();
            fs::File::options()
                .write(true)
                .open(&p)
                .unwrap()
                .set_modified(stamp)
                .unwrap();
            paths.push(p);
        }

        let pattern = format!("{}/**/{HALL_OF_FAME_FILE}", dir.path().display());
        assert_eq!(find_artifact(&pattern).unwrap(), Some(paths[2].clone()));
    }

    #[test]
    fn test_find_artifact_no_match() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = format!("{}/*/{HALL_OF_FAME_FILE}", dir.path().display());
        assert_eq!(find_artifact(&pattern).unwrap(), None);
    }

    #[test]
    fn test_find_artifact_bad_pattern() {
        assert!(matches!(find_artifact("/tmp/T**/x"), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_relocate_creates_destination_and_moves() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("scratch.csv");
        fs::write(&source, "Complexity,Equation\n1,x\n").unwrap();
        let dest_dir = dir.path().join("out").join("med_1");

        let dest = relocate_artifact(&source, &dest_dir).unwrap();
        assert_eq!(dest, dest_dir.join(HALL_OF_FAME_FILE));
        assert!(dest.is_file());
        assert!(!source.exists());
    }

    #[test]
    fn test_relocate_missing_source_reports_paths() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("nope.csv");
        let err = relocate_artifact(&source, dir.path()).unwrap_err();
        match err {
            Error::Relocate { from, .. } => assert_eq!(from, source),
            other => panic!("unexpected error: {other}"),
        }
    }
}
