use super::Session;
use console::style;
use tidy_lib::BatchOutcome;

/// Tells the user when the work runs inside a watcher process.
pub fn print_route(session: &Session) {
    if session.is_remote() {
        println!("{}", style("Forwarding to the running watcher").dim());
    }
}

pub fn print_outcome(outcome: &BatchOutcome, quiet: bool) {
    if quiet {
        return;
    }

    if outcome.is_empty() {
        println!("{}", style("Nothing to do").dim());
        return;
    }

    let counts = [
        ("Moved", outcome.moved),
        ("Installers tracked", outcome.tracked),
        ("Pending", outcome.pending),
        ("Reverted", outcome.reverted),
        ("Installers cleaned", outcome.cleaned),
        ("Installers used", outcome.used),
        ("Missing at destination", outcome.missing),
        ("Skipped", outcome.skipped),
    ];

    for (label, count) in counts.iter().filter(|(_, count)| *count > 0) {
        println!("  {}: {}", label, style(count).cyan());
    }

    if outcome.failed > 0 {
        println!("  Failed: {}", style(outcome.failed).red());
        println!(
            "\n{} Finished with {} failure(s); see `tidy log --action error`",
            style("!").yellow(),
            outcome.failed
        );
    } else {
        println!("\n{} Done", style("✓").green());
    }
}
