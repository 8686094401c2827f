pub mod category;
pub mod table;

pub use category::{Category, InstallerKind};
pub use table::{CategoryOverrides, Classifier, ExtensionTable};
