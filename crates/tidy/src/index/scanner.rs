use crate::error::{Result, TidyError};
use chrono::{DateTime, Utc};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Name patterns left behind by browsers while a download is still running.
const PARTIAL_DOWNLOAD_PATTERNS: &[&str] =
    &["*.tmp", "*.download", "*.crdownload", "*.part", "*.part.*"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub entries_seen: usize,
    pub files_accepted: usize,
    pub dirs_skipped: usize,
    pub hidden_skipped: usize,
    pub partial_skipped: usize,
    pub no_extension_skipped: usize,
    pub errors: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Order entries by modification time, most recent first.
    pub newest_first: bool,
}

/// A file sitting directly in the inbox that is eligible for classification.
#[derive(Debug, Clone, PartialEq)]
pub struct InboxEntry {
    pub path: PathBuf,
    pub file_name: String,
    /// Lower-cased, never empty.
    pub extension: String,
    pub modified: Option<DateTime<Utc>>,
}

pub struct InboxScanner {
    partial: GlobSet,
}

impl InboxScanner {
    pub fn new() -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in PARTIAL_DOWNLOAD_PATTERNS {
            let glob = GlobBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| {
                    TidyError::Config(format!("Invalid download pattern '{}': {}", pattern, e))
                })?;
            builder.add(glob);
        }
        let partial = builder
            .build()
            .map_err(|e| TidyError::Config(format!("Failed to build download patterns: {}", e)))?;

        Ok(Self { partial })
    }

    fn is_partial_download(&self, file_name: &str) -> bool {
        self.partial.is_match(file_name)
    }

    /// Lists the immediate children of `inbox` that may be organized.
    ///
    /// Subdirectories, dotfiles, in-flight downloads and files without an
    /// extension are skipped and counted in the returned stats.
    pub fn list<P: AsRef<Path>>(
        &self,
        inbox: P,
        options: &ScanOptions,
    ) -> Result<(Vec<InboxEntry>, ScanStats)> {
        let inbox = inbox.as_ref();
        if !inbox.is_dir() {
            return Err(TidyError::InboxUnavailable(inbox.to_path_buf()));
        }

        let mut stats = ScanStats::default();
        let mut entries = Vec::new();

        let walker = WalkDir::new(inbox)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false);

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Failed to read inbox entry: {}", e);
                    stats.errors += 1;
                    continue;
                }
            };
            stats.entries_seen += 1;

            if let Some(accepted) = self.accept(entry.path(), &mut stats) {
                entries.push(accepted);
            }
        }

        if options.newest_first {
            entries.sort_by(|a, b| b.modified.cmp(&a.modified));
        }

        stats.files_accepted = entries.len();
        log::debug!(
            "Listed {} of {} inbox entries in {}",
            stats.files_accepted,
            stats.entries_seen,
            inbox.display()
        );

        Ok((entries, stats))
    }

    fn accept(&self, path: &Path, stats: &mut ScanStats) -> Option<InboxEntry> {
        let file_name = path.file_name()?.to_string_lossy().to_string();

        if file_name.starts_with('.') {
            stats.hidden_skipped += 1;
            return None;
        }

        let metadata = match fs::metadata(path) {
            Ok(m) => m,
            Err(e) => {
                // Broken symlinks and files removed mid-listing land here.
                log::debug!("Skipping {}: {}", path.display(), e);
                stats.errors += 1;
                return None;
            }
        };

        if metadata.is_dir() {
            stats.dirs_skipped += 1;
            return None;
        }
        if !metadata.is_file() {
            return None;
        }

        if self.is_partial_download(&file_name) {
            stats.partial_skipped += 1;
            return None;
        }

        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .filter(|e| !e.is_empty());
        let Some(extension) = extension else {
            stats.no_extension_skipped += 1;
            return None;
        };

        let modified = metadata.modified().ok().map(DateTime::<Utc>::from);

        Some(InboxEntry {
            path: path.to_path_buf(),
            file_name,
            extension,
            modified,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        File::create(&path).unwrap();
        path
    }

    #[test]
    fn test_skip_rules() {
        let temp = TempDir::new().unwrap();
        let inbox = temp.path();

        touch(inbox, "report.pdf");
        touch(inbox, "Photo.JPG");
        touch(inbox, ".DS_Store");
        touch(inbox, "movie.mp4.crdownload");
        touch(inbox, "bundle.part");
        touch(inbox, "bundle.part.3.zip");
        touch(inbox, "notes.tmp");
        touch(inbox, "page.download");
        touch(inbox, "README");
        fs::create_dir(inbox.join("Documents")).unwrap();
        fs::create_dir(inbox.join("nested")).unwrap();
        touch(&inbox.join("nested"), "deep.pdf");

        let scanner = InboxScanner::new().unwrap();
        let (entries, stats) = scanner.list(inbox, &ScanOptions::default()).unwrap();

        let mut names: Vec<_> = entries.iter().map(|e| e.file_name.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["Photo.JPG", "report.pdf"]);

        let photo = entries.iter().find(|e| e.file_name == "Photo.JPG").unwrap();
        assert_eq!(photo.extension, "jpg");

        assert_eq!(stats.dirs_skipped, 2);
        assert_eq!(stats.hidden_skipped, 1);
        assert_eq!(stats.partial_skipped, 5);
        assert_eq!(stats.no_extension_skipped, 1);
        assert_eq!(stats.files_accepted, 2);
    }

    #[test]
    fn test_newest_first_ordering() {
        let temp = TempDir::new().unwrap();
        let old = touch(temp.path(), "old.txt");
        let new = touch(temp.path(), "new.txt");

        let past = SystemTime::now() - Duration::from_secs(3600);
        File::options()
            .write(true)
            .open(&old)
            .unwrap()
            .set_modified(past)
            .unwrap();

        let scanner = InboxScanner::new().unwrap();
        let options = ScanOptions { newest_first: true };
        let (entries, _) = scanner.list(temp.path(), &options).unwrap();

        assert_eq!(entries[0].path, new);
        assert_eq!(entries[1].path, old);
    }

    #[test]
    fn test_missing_inbox() {
        let temp = TempDir::new().unwrap();
        let scanner = InboxScanner::new().unwrap();
        let result = scanner.list(temp.path().join("gone"), &ScanOptions::default());
        assert!(matches!(result, Err(TidyError::InboxUnavailable(_))));
    }

    #[test]
    fn test_upper_case_partials_are_skipped() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "SETUP.EXE.PART");
        touch(temp.path(), "X.TMP");
        touch(temp.path(), "keep.pdf");

        let scanner = InboxScanner::new().unwrap();
        let (entries, stats) = scanner.list(temp.path(), &ScanOptions::default()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].file_name, "keep.pdf");
        assert_eq!(stats.partial_skipped, 2);
    }

    #[test]
    fn test_partial_patterns() {
        let scanner = InboxScanner::new().unwrap();
        assert!(scanner.is_partial_download("setup.exe.part"));
        assert!(scanner.is_partial_download("video.part.1.mkv"));
        assert!(!scanner.is_partial_download("partial.pdf"));
        assert!(!scanner.is_partial_download("report.pdf"));
        assert!(scanner.is_partial_download("SETUP.EXE.PART"));
        assert!(scanner.is_partial_download("X.TMP"));
        assert!(scanner.is_partial_download("Movie.CRDownload"));
    }
}
