use crate::classify::Category;
use crate::error::Result;
use dialoguer::{theme::ColorfulTheme, Select};
use std::path::Path;

/// Answer to "move this file?" asked before an automatic move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Proceed,
    Skip,
    /// Proceed and stop asking.
    ProceedAlways,
}

pub trait ConfirmationSource: Send {
    fn ask(&self, file_name: &str, category: Category, destination: &Path) -> Result<Decision>;
}

/// Prompts on the controlling terminal.
#[derive(Debug, Default)]
pub struct DialogConfirm;

impl ConfirmationSource for DialogConfirm {
    fn ask(&self, file_name: &str, category: Category, destination: &Path) -> Result<Decision> {
        let prompt = format!(
            "Move '{}' ({}) to {}?",
            file_name,
            category.display_name(),
            destination.display()
        );
        let choices = ["Move", "Skip", "Don't ask again"];

        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .items(&choices)
            .default(0)
            .interact()?;

        Ok(match selection {
            0 => Decision::Proceed,
            2 => Decision::ProceedAlways,
            _ => Decision::Skip,
        })
    }
}

/// Always gives the same answer. Used when no terminal is attached.
#[derive(Debug, Clone, Copy)]
pub struct FixedDecision(pub Decision);

impl ConfirmationSource for FixedDecision {
    fn ask(&self, file_name: &str, _category: Category, _destination: &Path) -> Result<Decision> {
        log::debug!("Answering {:?} for {}", self.0, file_name);
        Ok(self.0)
    }
}
