use std::fs;
use std::path::Path;

/// Capability for reaching directories that may need an explicit grant.
pub trait AccessGate: Send {
    fn can_access(&self, dir: &Path) -> bool;

    /// Acquires scoped access. Returns false if the grant is unavailable; the
    /// caller may still attempt the operation.
    fn begin_access(&self, dir: &Path) -> bool;

    fn end_access(&self, dir: &Path);
}

struct AccessGuard<'a> {
    gate: &'a dyn AccessGate,
    dir: &'a Path,
}

impl Drop for AccessGuard<'_> {
    fn drop(&mut self) {
        self.gate.end_access(self.dir);
    }
}

/// Runs `body` with access to `dir` held. Access is released however `body`
/// exits, including by unwinding.
pub fn with_access<T, F>(gate: &dyn AccessGate, dir: &Path, body: F) -> T
where
    F: FnOnce() -> T,
{
    if !gate.begin_access(dir) {
        log::debug!("No scoped access grant for {}", dir.display());
    }
    let _guard = AccessGuard { gate, dir };
    body()
}

/// Plain filesystem permissions. Checks the directory itself or, when it does
/// not exist yet, its nearest existing ancestor.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsAccess;

impl AccessGate for FsAccess {
    fn can_access(&self, dir: &Path) -> bool {
        let existing = dir.ancestors().find(|p| p.exists());
        match existing {
            Some(p) => fs::metadata(p)
                .map(|m| m.is_dir() && !m.permissions().readonly())
                .unwrap_or(false),
            None => false,
        }
    }

    fn begin_access(&self, _dir: &Path) -> bool {
        true
    }

    fn end_access(&self, _dir: &Path) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    #[derive(Default)]
    struct CountingGate {
        begun: AtomicUsize,
        ended: AtomicUsize,
    }

    impl AccessGate for CountingGate {
        fn can_access(&self, _dir: &Path) -> bool {
            true
        }

        fn begin_access(&self, _dir: &Path) -> bool {
            self.begun.fetch_add(1, Ordering::SeqCst);
            true
        }

        fn end_access(&self, _dir: &Path) {
            self.ended.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_access_released_after_body() {
        let gate = CountingGate::default();
        let value = with_access(&gate, Path::new("/srv/out"), || 42);
        assert_eq!(value, 42);
        assert_eq!(gate.begun.load(Ordering::SeqCst), 1);
        assert_eq!(gate.ended.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_access_released_on_panic() {
        let gate = CountingGate::default();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            with_access(&gate, Path::new("/srv/out"), || panic!("boom"))
        }));
        assert!(result.is_err());
        assert_eq!(gate.ended.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_fs_access_uses_nearest_ancestor() {
        let temp = TempDir::new().unwrap();
        assert!(FsAccess.can_access(&temp.path().join("not/yet/created")));
    }
}
