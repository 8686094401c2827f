use crate::error::{Result, TidyError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of groupings a file in the inbox can be routed to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Document,
    Image,
    Video,
    Music,
    Archive,
    Installer,
    Misc,
}

impl Category {
    /// Every category, in match order.
    pub const ALL: [Category; 7] = [
        Category::Document,
        Category::Image,
        Category::Video,
        Category::Music,
        Category::Archive,
        Category::Installer,
        Category::Misc,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Document => "document",
            Category::Image => "image",
            Category::Video => "video",
            Category::Music => "music",
            Category::Archive => "archive",
            Category::Installer => "installer",
            Category::Misc => "misc",
        }
    }

    pub fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "document" | "documents" => Ok(Category::Document),
            "image" | "images" => Ok(Category::Image),
            "video" | "videos" => Ok(Category::Video),
            "music" => Ok(Category::Music),
            "archive" | "archives" => Ok(Category::Archive),
            "installer" | "installers" => Ok(Category::Installer),
            "misc" => Ok(Category::Misc),
            other => Err(TidyError::Config(format!("Invalid category: {}", other))),
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Category::Document => "Documents",
            Category::Image => "Images",
            Category::Video => "Videos",
            Category::Music => "Music",
            Category::Archive => "Archives",
            Category::Installer => "Installers",
            Category::Misc => "Misc",
        }
    }

    /// Folder name of the default destination, relative to the inbox.
    pub fn default_folder(&self) -> &'static str {
        match self {
            Category::Installer => "Junk Installers",
            other => other.display_name(),
        }
    }

    pub fn default_extensions(&self) -> &'static [&'static str] {
        match self {
            Category::Document => &[
                "pdf", "docx", "doc", "txt", "rtf", "md", "odt", "xls", "xlsx", "ppt", "pptx",
            ],
            Category::Image => &[
                "jpg", "jpeg", "png", "gif", "heic", "svg", "bmp", "tiff", "webp", "ico",
            ],
            Category::Video => &[
                "mp4", "mov", "avi", "mkv", "webm", "flv", "wmv", "m4v", "mpg", "mpeg",
            ],
            Category::Music => &[
                "mp3", "wav", "flac", "m4a", "aac", "ogg", "wma", "aiff", "alac",
            ],
            Category::Archive => &["zip", "rar", "7z", "tar", "gz", "bz2", "xz"],
            Category::Installer => &[
                "dmg", "iso", "img", "pkg", "deb", "rpm", "app", "appimage",
            ],
            Category::Misc => &[],
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// What kind of installer artifact a tracked file is.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InstallerKind {
    DiskImage,
    Package,
    Application,
}

impl InstallerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstallerKind::DiskImage => "disk_image",
            InstallerKind::Package => "package",
            InstallerKind::Application => "application",
        }
    }

    pub fn from_str(s: &str) -> Result<Self> {
        match s {
            "disk_image" => Ok(InstallerKind::DiskImage),
            "package" => Ok(InstallerKind::Package),
            "application" => Ok(InstallerKind::Application),
            _ => Err(TidyError::Config(format!("Invalid installer kind: {}", s))),
        }
    }

    /// Unknown installer extensions are treated as packages.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "dmg" | "iso" | "img" => InstallerKind::DiskImage,
            "app" | "appimage" => InstallerKind::Application,
            _ => InstallerKind::Package,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_default_extension_sets_are_disjoint() {
        let mut seen = HashSet::new();
        for category in Category::ALL {
            for ext in category.default_extensions() {
                assert!(seen.insert(*ext), "extension {} listed twice", ext);
            }
        }
    }

    #[test]
    fn test_category_round_trip_through_str() {
        for category in Category::ALL {
            assert_eq!(Category::from_str(category.as_str()).unwrap(), category);
        }
        assert_eq!(Category::from_str("Images").unwrap(), Category::Image);
        assert!(Category::from_str("spreadsheets").is_err());
    }

    #[test]
    fn test_installer_kind_from_extension() {
        assert_eq!(InstallerKind::from_extension("DMG"), InstallerKind::DiskImage);
        assert_eq!(InstallerKind::from_extension("pkg"), InstallerKind::Package);
        assert_eq!(InstallerKind::from_extension("deb"), InstallerKind::Package);
        assert_eq!(InstallerKind::from_extension("app"), InstallerKind::Application);
    }

    #[test]
    fn test_installer_destination_folder() {
        assert_eq!(Category::Installer.default_folder(), "Junk Installers");
        assert_eq!(Category::Image.default_folder(), "Images");
    }
}
