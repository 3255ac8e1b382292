// Squad Ledger - Core Library
// Chat transcript ingestion for a pick-up football roster.
// Exposes all modules for use in CLI, API server, and tests

pub mod classifier;
pub mod config;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod member;
pub mod normalizer;
pub mod resolver;
pub mod splitter;
pub mod store;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use classifier::{classify, match_named_payment, Intent, IntentKind, NamedPayment};
pub use config::Config;
pub use error::{Error, Result};
pub use ingest::{parse_transcript, ChatIngestor, ConfirmationCounting, IngestOptions, ParseOutcome};
pub use member::{
    Event, Payment, Position, RosterMember, CHAT_PAYMENT_NOTE, DEFAULT_SKILL,
};
pub use normalizer::{display_case, normalize_name, strip_invisible};
pub use resolver::{MatchStrategy, Resolution, Resolver};
pub use splitter::{split_line, Grammar, ParsedLine, SplitOutcome};
pub use store::{
    load_roster_csv, read_roster_csv, seed_roster, Ledger, MemoryRoster, Roster, RosterSeed,
    SeedReport, SqliteStore,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
