pub mod engine;
pub mod rollback;
pub mod unique;

pub use engine::MoveEngine;
pub use rollback::RollbackEngine;
pub use unique::{resolve_unique, resolve_unique_with, MAX_UNIQUE_SUFFIX};

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

/// Lock held while a name is resolved and the file renamed into `dir`.
pub(crate) fn destination_lock(dir: &Path) -> Arc<Mutex<()>> {
    static LOCKS: OnceLock<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = OnceLock::new();

    let mut locks = LOCKS
        .get_or_init(Default::default)
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    locks.entry(dir.to_path_buf()).or_default().clone()
}
