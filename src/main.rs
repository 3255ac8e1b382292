// Squad Ledger - CLI
// Parse chat transcripts into the roster, manage members and payments

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use squad_ledger::logging::{init_tracing, DEFAULT_FILTER};
use squad_ledger::{
    load_roster_csv, seed_roster, ChatIngestor, Config, ConfirmationCounting, MemoryRoster,
    Position, Roster, RosterMember, SqliteStore,
};

#[derive(Parser, Debug)]
#[command(name = "squad-ledger")]
#[command(about = "Chat transcript ingestion for a pick-up football roster", long_about = None)]
#[command(version)]
struct Args {
    /// TOML config file
    #[arg(short, long, env = "SQUAD_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database (overrides the config file)
    #[arg(short, long, env = "SQUAD_DB")]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a chat transcript (file path, or "-" for stdin) and print the outcome as JSON
    Parse {
        input: String,

        /// Run against an in-memory copy of the roster; nothing is written
        #[arg(long)]
        dry_run: bool,

        /// every_line | state_transitions
        #[arg(long)]
        counting: Option<ConfirmationCounting>,
    },

    /// Roster management
    #[command(subcommand)]
    Roster(RosterCommand),

    /// Members whose debt exceeds what they paid
    Debtors,

    /// Record a manual payment (amount > 0)
    Pay {
        name: String,
        amount: f64,

        #[arg(long)]
        note: Option<String>,
    },

    /// Add to a member's debt (e.g. a match fee)
    Charge { name: String, amount: f64 },

    /// List payments, optionally for one member
    Payments {
        #[arg(long)]
        player: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum RosterCommand {
    /// List every member
    List,

    /// Add a member
    Add {
        name: String,

        #[arg(long)]
        skill: Option<u8>,

        /// POR | DEF | MED | DEL
        #[arg(long)]
        position: Option<Position>,
    },

    /// Seed members from a CSV file (name,skill,position)
    Import { csv: PathBuf },

    /// Set a member's skill level (1-10)
    Skill { name: String, level: u8 },

    /// Clear attendance flags before a new session
    ResetAttendance,
}

fn main() -> Result<()> {
    init_tracing(DEFAULT_FILTER);

    let args = Args::parse();

    let mut config = Config::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(database) = args.database {
        config.database_path = database;
    }

    let mut store = SqliteStore::open(&config.database_path).with_context(|| {
        format!("Failed to open database {}", config.database_path.display())
    })?;

    match args.command {
        Command::Parse {
            input,
            dry_run,
            counting,
        } => {
            if let Some(counting) = counting {
                config.confirmation_counting = counting;
            }
            run_parse(&mut store, &config, &input, dry_run)
        }
        Command::Roster(cmd) => run_roster(&mut store, &config, cmd),
        Command::Debtors => {
            let debtors = store.members_with_debt()?;
            if debtors.is_empty() {
                println!("✓ Nobody owes anything");
            }
            for member in debtors {
                println!("💸 {:<24} owes {:>10.2}", member.name, member.debt());
            }
            Ok(())
        }
        Command::Pay { name, amount, note } => {
            let payment = store
                .record_payment(&name, amount, note.as_deref())
                .with_context(|| format!("Failed to record payment for {}", name))?;
            println!("✓ {:.2} recorded for {}", payment.amount, payment.member_name);
            Ok(())
        }
        Command::Charge { name, amount } => {
            let member = store
                .add_debt(&name, amount)
                .with_context(|| format!("Failed to add debt for {}", name))?;
            println!("✓ {} now owes {:.2}", member.name, member.debt());
            Ok(())
        }
        Command::Payments { player } => {
            let payments = match player {
                Some(name) => store.payments_for(&name)?,
                None => store.payments()?,
            };
            for payment in payments {
                let marker = if payment.is_pending_amount() { "⏳" } else { "✓" };
                println!(
                    "{} {}  {:<24} {:>10.2}  {}",
                    marker,
                    payment.timestamp.format("%Y-%m-%d %H:%M"),
                    payment.member_name,
                    payment.amount,
                    payment.note.unwrap_or_default()
                );
            }
            Ok(())
        }
    }
}

fn run_parse(store: &mut SqliteStore, config: &Config, input: &str, dry_run: bool) -> Result<()> {
    let transcript = read_input(input)?;
    let options = config.ingest_options();

    let outcome = if dry_run {
        let mut scratch = MemoryRoster::from_members(store.all_members()?);
        ChatIngestor::with_options(&mut scratch, options).parse(&transcript)
    } else {
        if store.transcript_seen(&transcript)? {
            warn!("this transcript was already parsed; payments will be recorded again");
        }
        let outcome = ChatIngestor::with_options(store, options).parse(&transcript);
        let digest = store.record_transcript(&transcript, &outcome)?;
        info!(digest = %digest, "transcript recorded");
        outcome
    };

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

fn run_roster(store: &mut SqliteStore, config: &Config, cmd: RosterCommand) -> Result<()> {
    match cmd {
        RosterCommand::List => {
            for member in store.all_members()? {
                print_member(&member);
            }
        }
        RosterCommand::Add {
            name,
            skill,
            position,
        } => {
            let member = store
                .create_member(
                    &name,
                    skill.unwrap_or(config.default_skill),
                    position.unwrap_or(config.default_position),
                )
                .with_context(|| format!("Failed to add {}", name))?;
            println!("✓ Added {} ({})", member.name, member.id);
        }
        RosterCommand::Import { csv } => {
            let seeds = load_roster_csv(&csv)
                .with_context(|| format!("Failed to read {}", csv.display()))?;
            let report = seed_roster(store, &seeds)?;
            println!(
                "✓ Imported {} members ({} already on the roster)",
                report.created.len(),
                report.skipped.len()
            );
        }
        RosterCommand::Skill { name, level } => {
            let member = store.update_skill(&name, level)?;
            println!("✓ {} skill is now {}", member.name, member.skill_level);
        }
        RosterCommand::ResetAttendance => {
            let reset = store.reset_attendance()?;
            println!("✓ Attendance cleared for {} members", reset);
        }
    }

    Ok(())
}

fn print_member(member: &RosterMember) {
    let attended = if member.attended { "✅" } else { "  " };
    let active = if member.active { "" } else { " (inactive)" };
    println!(
        "{} {:<24} {} skill {:>2}  balance {:>10.2}{}",
        attended,
        member.name,
        member.position,
        member.skill_level,
        member.balance(),
        active
    );
}

fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut transcript = String::new();
        std::io::stdin()
            .read_to_string(&mut transcript)
            .context("Failed to read transcript from stdin")?;
        return Ok(transcript);
    }

    std::fs::read_to_string(Path::new(input))
        .with_context(|| format!("Failed to read transcript {}", input))
}
