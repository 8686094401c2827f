use clap::Subcommand;
use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};
use console::style;
use tidy_lib::util::format::display_path;
use tidy_lib::{
    Category, Classifier, Config, ControlClient, OrganizerControl, PreferenceStore, Result,
    TomlPreferences,
};

#[derive(Subcommand)]
pub enum ConfigCommands {
    #[command(about = "Show current preferences")]
    Show,

    #[command(about = "Set a preference")]
    Set {
        #[arg(help = "Preference name (e.g. auto_clean_days)")]
        key: String,

        #[arg(help = "New value")]
        value: String,
    },

    #[command(about = "Choose a custom destination folder for a category")]
    Destination {
        #[arg(help = "Category (documents, images, videos, music, archives, installers, misc)")]
        category: String,

        #[arg(help = "Destination folder")]
        path: String,
    },

    #[command(about = "Reset one category destination, or every preference")]
    Reset {
        #[arg(help = "Category to reset; omit to reset everything")]
        category: Option<String>,
    },
}

pub fn handle_config_command(config: &Config, action: ConfigCommands) -> Result<()> {
    let store = TomlPreferences::new(&config.prefs_path);

    match action {
        ConfigCommands::Show => show_preferences(config, &store),
        ConfigCommands::Set { key, value } => {
            let mut prefs = store.load()?;
            prefs.set_value(&key, &value)?;
            store.save(&prefs)?;
            println!("{} {} = {}", style("✓").green(), key, value);
            Ok(())
        }
        ConfigCommands::Destination { category, path } => {
            let category = Category::from_str(&category)?;
            let mut prefs = store.load()?;
            prefs.set_destination(category, &path);
            store.save(&prefs)?;
            println!(
                "{} {} will be moved to {}",
                style("✓").green(),
                category.display_name(),
                display_path(&prefs.destination_for(category, &config.inbox))
            );
            Ok(())
        }
        ConfigCommands::Reset { category } => {
            let mut prefs = store.load()?;
            match category {
                Some(name) => {
                    let category = Category::from_str(&name)?;
                    prefs.reset_destination(category);
                    println!(
                        "{} {} destination reset to default",
                        style("✓").green(),
                        category.display_name()
                    );
                }
                None => {
                    prefs.reset_all();
                    println!("{} All preferences reset to defaults", style("✓").green());
                }
            }
            store.save(&prefs)
        }
    }
}

fn show_preferences(config: &Config, store: &TomlPreferences) -> Result<()> {
    let prefs = store.load()?;

    println!("\n{}", style("Preferences").bold().cyan());
    println!("{}\n", style("═".repeat(60)).dim());

    println!("  File: {}", display_path(store.path()));
    println!("  Inbox: {}", display_path(&config.inbox));
    println!();

    let flag = |on: bool| {
        if on {
            style("yes").green()
        } else {
            style("no").yellow()
        }
    };

    println!("{}", style("Behavior").bold());
    println!("  enabled: {}", flag(prefs.enabled));
    println!("  confirm_before_moving: {}", flag(prefs.confirm_before_moving));
    println!(
        "  clean_installers_immediately: {}",
        flag(prefs.clean_installers_immediately)
    );
    println!("  clean_after_first_use: {}", flag(prefs.clean_after_first_use));
    println!(
        "  auto_clean_unused_installers: {}",
        flag(prefs.auto_clean_unused_installers)
    );
    println!("  auto_clean_days: {}", style(prefs.auto_clean_days).cyan());
    println!();

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        Cell::new("Category").fg(Color::Cyan),
        Cell::new("Destination").fg(Color::Cyan),
        Cell::new("Custom").fg(Color::Cyan),
    ]);

    for category in Category::ALL {
        let custom = prefs.destinations.contains_key(category.as_str());
        table.add_row(vec![
            Cell::new(category.display_name()),
            Cell::new(display_path(&prefs.destination_for(category, &config.inbox))),
            Cell::new(if custom { "Yes" } else { "No" }),
        ]);
    }

    println!("{}", table);
    Ok(())
}

pub fn handle_categories_command(config: &Config, reload: bool) -> Result<()> {
    if reload {
        return reload_categories(config);
    }

    let classifier = Classifier::load(config.categories_path.as_deref())?;

    println!("\n{}", style("Extension Table").bold().cyan());
    match &config.categories_path {
        Some(path) => println!("{}\n", style(format!("Loaded from {}", display_path(path))).dim()),
        None => println!("{}\n", style("Built-in defaults").dim()),
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        Cell::new("Category").fg(Color::Cyan),
        Cell::new("Extensions").fg(Color::Cyan),
    ]);

    for category in Category::ALL {
        let extensions = classifier.table().extensions(category);
        let listed = if extensions.is_empty() {
            "(everything else)".to_string()
        } else {
            extensions.join(", ")
        };
        table.add_row(vec![Cell::new(category.display_name()), Cell::new(listed)]);
    }

    println!("{}", table);
    Ok(())
}

fn reload_categories(config: &Config) -> Result<()> {
    // Validate before disturbing the watcher.
    Classifier::load(config.categories_path.as_deref())?;

    match ControlClient::connect(&config.socket_path)? {
        Some(mut client) => {
            client.reload_categories()?;
            println!("{} Watcher reloaded the extension table", style("✓").green());
        }
        None => println!(
            "{}",
            style("No watcher is running; the table is read when a command starts").dim()
        ),
    }
    Ok(())
}
