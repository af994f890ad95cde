use civy_core::config::DataConfig;
use civy_core::*;
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "civy")]
#[command(about = "Resource ledger for the Civy chat economy", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Read configuration from this file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a user's gold and resources
    Balance {
        /// Calling user identifier
        #[arg(long)]
        user: String,
    },

    /// Mine a resource (wood, stone or iron) on a short cooldown
    Quickmine {
        /// Calling user identifier
        #[arg(long)]
        user: String,

        resource: Option<String>,
    },

    /// Claim the daily grant of a resource
    Daily {
        /// Calling user identifier
        #[arg(long)]
        user: String,

        resource: Option<String>,
    },

    /// Read commands from stdin, one per line: `<user> <action> [resource]`
    ///
    /// The mining cooldown lives as long as this process.
    Shell,

    /// Export all balances to CSV
    Export {
        /// Output file (defaults to balances.csv in the data directory)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Show journaled ledger events
    History {
        /// Only show events for this user
        #[arg(long)]
        user: Option<String>,
    },
}

fn main() -> Result<ExitCode> {
    // Initialize logging
    civy_core::logging::init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let data = DataConfig {
        data_dir: cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone()),
    };

    match cli.command {
        Commands::Balance { user } => {
            let economy = open_economy(&data, &config);
            Ok(run_request(&economy, Request::new("balance", user, None)))
        }
        Commands::Quickmine { user, resource } => {
            let economy = open_economy(&data, &config);
            Ok(run_request(&economy, Request::new("quickmine", user, resource)))
        }
        Commands::Daily { user, resource } => {
            let economy = open_economy(&data, &config);
            Ok(run_request(&economy, Request::new("daily", user, resource)))
        }
        Commands::Shell => cmd_shell(&open_economy(&data, &config)),
        Commands::Export { out } => cmd_export(&data, out),
        Commands::History { user } => cmd_history(&data, user.as_deref()),
    }
}

fn open_economy(data: &DataConfig, config: &Config) -> Economy<JsonFileStore> {
    Economy::new(
        JsonFileStore::new(data.ledger_path()),
        config.economy.clone(),
    )
    .with_journal(JsonlJournal::new(data.journal_path()))
}

fn run_request(economy: &Economy<JsonFileStore>, request: Request) -> ExitCode {
    let outcome = economy.handle(&request);
    println!("{}", render(&outcome));
    exit_code(&outcome)
}

fn cmd_shell(economy: &Economy<JsonFileStore>) -> Result<ExitCode> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut code = ExitCode::SUCCESS;

    for line in stdin.lock().lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut parts = line.split_whitespace();
        let (Some(user), Some(action)) = (parts.next(), parts.next()) else {
            tracing::warn!("Ignoring malformed shell line: {:?}", line);
            writeln!(stdout, "Usage: <user> <action> [resource]")?;
            continue;
        };
        let request = Request::new(action, user, parts.next().map(String::from));

        let outcome = economy.handle(&request);
        if matches!(outcome, Outcome::Failed) {
            code = ExitCode::FAILURE;
        }
        writeln!(stdout, "{}", render(&outcome))?;
        stdout.flush()?;
    }

    Ok(code)
}

fn cmd_export(data: &DataConfig, out: Option<PathBuf>) -> Result<ExitCode> {
    let out = out.unwrap_or_else(|| data.data_dir.join("balances.csv"));
    let ledger = JsonFileStore::new(data.ledger_path()).load()?;
    let count = export_csv(&ledger, &out)?;

    println!("Exported {} accounts to {}", count, out.display());
    Ok(ExitCode::SUCCESS)
}

fn cmd_history(data: &DataConfig, user: Option<&str>) -> Result<ExitCode> {
    let events = read_events(&data.journal_path())?;
    let mut shown = 0;

    for event in events
        .iter()
        .filter(|e| user.map_or(true, |u| e.user_id == u))
    {
        println!(
            "{}  {}  {}",
            event.at.to_rfc3339(),
            event.user_id,
            describe(&event.kind)
        );
        shown += 1;
    }

    if shown == 0 {
        println!("No ledger events recorded.");
    }
    Ok(ExitCode::SUCCESS)
}

fn exit_code(outcome: &Outcome) -> ExitCode {
    match outcome {
        Outcome::Failed => ExitCode::FAILURE,
        Outcome::MissingArgument { .. } | Outcome::UnknownAction { .. } => ExitCode::from(2),
        _ => ExitCode::SUCCESS,
    }
}

fn render(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Balance(snapshot) => format!(
            "Gold: {}\nWood: {}\nStone: {}\nIron: {}",
            snapshot.gold, snapshot.wood, snapshot.stone, snapshot.iron
        ),
        Outcome::Mine(MineOutcome::Mined {
            resource,
            amount,
            new_total,
        }) => format!("Mined {} {} (now {})", amount, resource, new_total),
        Outcome::Mine(MineOutcome::InvalidResource { .. }) => {
            "You can only mine: wood, stone, or iron.".to_string()
        }
        Outcome::Mine(MineOutcome::CooldownActive { remaining }) => {
            // Round up so "0s" is never shown while still denied
            let secs = (remaining.num_milliseconds() + 999) / 1000;
            format!("Mining is on cooldown. Try again in {}s.", secs)
        }
        Outcome::Daily(DailyOutcome::Claimed {
            resource,
            amount,
            new_total,
        }) => format!("Claimed {} {} (now {})", amount, resource, new_total),
        Outcome::Daily(DailyOutcome::InvalidResource { .. }) => {
            "You can only claim: wood, stone, or iron.".to_string()
        }
        Outcome::Daily(DailyOutcome::AlreadyClaimed { available_at }) => format!(
            "You already claimed your daily reward. Try again after {}.",
            available_at.to_rfc3339()
        ),
        Outcome::MissingArgument { action } => format!(
            "Missing resource. Usage: {} <wood|stone|iron>",
            action.as_str()
        ),
        Outcome::UnknownAction { name } => format!("Unknown command: {}", name),
        Outcome::Failed => "Something went wrong; nothing was changed.".to_string(),
    }
}

fn describe(kind: &EventKind) -> String {
    match kind {
        EventKind::AccountOpened { starting_gold } => {
            format!("opened account with {} gold", starting_gold)
        }
        EventKind::Mined {
            resource,
            amount,
            new_total,
        } => format!("mined {} {} (total {})", amount, resource, new_total),
        EventKind::DailyClaimed {
            resource,
            amount,
            new_total,
        } => format!("claimed daily {} {} (total {})", amount, resource, new_total),
    }
}
