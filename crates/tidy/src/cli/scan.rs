use super::helpers::{print_outcome, print_route};
use super::Session;
use console::style;
use std::path::Path;
use tidy_lib::util::format::display_path;
use tidy_lib::Result;

pub fn handle_scan_command(session: &mut Session, inbox: &Path, quiet: bool) -> Result<()> {
    if !quiet {
        println!("{} Scanning {}...", style(">>>").cyan(), display_path(inbox));
        print_route(session);
    }

    let outcome = session.control.scan_now()?;
    print_outcome(&outcome, quiet);

    Ok(())
}
