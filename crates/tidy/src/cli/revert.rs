use super::helpers::{print_outcome, print_route};
use super::Session;
use console::style;
use dialoguer::Confirm;
use tidy_lib::util::format::display_path;
use tidy_lib::{Result, TidyError};

pub fn handle_revert_command(
    session: &mut Session,
    id: Option<i64>,
    recent: bool,
    minutes: i64,
    all: bool,
    yes: bool,
    quiet: bool,
) -> Result<()> {
    if !quiet {
        print_route(session);
    }

    match (id, recent, all) {
        (Some(id), false, false) => {
            let restored = session.control.revert(id)?;
            if !quiet {
                println!(
                    "{} Moved back to {}",
                    style("✓").green(),
                    display_path(&restored)
                );
            }
            Ok(())
        }
        (None, true, false) => {
            if minutes <= 0 {
                return Err(TidyError::UserInput(
                    "--minutes must be greater than zero".to_string(),
                ));
            }
            if !quiet {
                println!(
                    "{} Reverting moves from the last {} minutes...",
                    style(">>>").cyan(),
                    minutes
                );
            }
            let outcome = session.control.revert_recent(minutes)?;
            print_outcome(&outcome, quiet);
            Ok(())
        }
        (None, false, true) => {
            if !yes {
                let confirmed = Confirm::new()
                    .with_prompt("Move every organized file back into the inbox?")
                    .default(false)
                    .interact()?;
                if !confirmed {
                    println!("{}", style("Cancelled").yellow());
                    return Ok(());
                }
            }
            let outcome = session.control.revert_all()?;
            print_outcome(&outcome, quiet);
            Ok(())
        }
        _ => Err(TidyError::UserInput(
            "Specify exactly one of <ID>, --recent or --all".to_string(),
        )),
    }
}
