use crate::error::{Result, TidyError};
use std::path::{Path, PathBuf};

/// Highest numeric suffix tried before giving up on a name.
pub const MAX_UNIQUE_SUFFIX: u32 = 10_000;

/// Returns `candidate` if nothing exists there, otherwise the first free
/// `stem_N.ext` sibling with N counting up from 1.
pub fn resolve_unique(candidate: &Path) -> Result<PathBuf> {
    resolve_unique_with(candidate, MAX_UNIQUE_SUFFIX, |p| p.exists())
}

/// Same as [`resolve_unique`] with an explicit cap and existence check.
pub fn resolve_unique_with<F>(candidate: &Path, limit: u32, exists: F) -> Result<PathBuf>
where
    F: Fn(&Path) -> bool,
{
    if !exists(candidate) {
        return Ok(candidate.to_path_buf());
    }

    let parent = candidate.parent().unwrap_or_else(|| Path::new(""));
    let stem = candidate
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let extension = candidate
        .extension()
        .map(|e| e.to_string_lossy().to_string());

    for n in 1..=limit {
        let name = match &extension {
            Some(ext) => format!("{}_{}.{}", stem, n, ext),
            None => format!("{}_{}", stem, n),
        };
        let next = parent.join(name);
        if !exists(&next) {
            return Ok(next);
        }
    }

    Err(TidyError::UniqueNameExhausted {
        path: candidate.to_path_buf(),
        limit,
    })
}
