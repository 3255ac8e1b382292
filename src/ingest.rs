// 📥 Transcript Aggregator - One transcript in, one ParseOutcome out
//
// Per line (no cross-line state):
//   split → classify → resolve → mutate roster/ledger → record in outcome
//
// Nothing aborts a parse. Lines that can't be used end up in
// `unrecognized_messages`, either verbatim or as a diagnostic.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::classifier::{classify, match_named_payment, Intent};
use crate::error::Error;
use crate::member::{RosterMember, CHAT_PAYMENT_NOTE};
use crate::normalizer::strip_invisible;
use crate::resolver::{Resolution, Resolver};
use crate::splitter::{split_line, SplitOutcome};
use crate::store::{Ledger, Roster};

// ============================================================================
// OPTIONS
// ============================================================================

/// How repeat confirmations of an already-attending member are counted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationCounting {
    /// Every confirming line is counted; attendance is only set once
    #[default]
    EveryLine,

    /// Only lines that flipped the attendance flag are counted
    StateTransitions,
}

impl fmt::Display for ConfirmationCounting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfirmationCounting::EveryLine => f.write_str("every_line"),
            ConfirmationCounting::StateTransitions => f.write_str("state_transitions"),
        }
    }
}

impl FromStr for ConfirmationCounting {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "every_line" => Ok(ConfirmationCounting::EveryLine),
            "state_transitions" => Ok(ConfirmationCounting::StateTransitions),
            other => Err(Error::Config(format!(
                "unknown confirmation counting policy: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Note attached to every chat-detected payment
    pub payment_note: String,

    pub counting: ConfirmationCounting,

    pub resolver: Resolver,
}

impl Default for IngestOptions {
    fn default() -> Self {
        IngestOptions {
            payment_note: CHAT_PAYMENT_NOTE.to_string(),
            counting: ConfirmationCounting::default(),
            resolver: Resolver::default(),
        }
    }
}

// ============================================================================
// OUTCOME
// ============================================================================

/// Report for one parse. Display names only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseOutcome {
    pub players_confirmed: usize,
    pub payments_registered: usize,

    /// One entry per confirming line (not deduplicated)
    pub confirmed_players: Vec<String>,

    /// One entry per payment line
    pub paid_players: Vec<String>,

    /// One entry per roster creation
    pub new_players_added: Vec<String>,

    /// Raw lines or diagnostics, in input order
    pub unrecognized_messages: Vec<String>,
}

impl ParseOutcome {
    pub fn is_empty(&self) -> bool {
        self.players_confirmed == 0
            && self.payments_registered == 0
            && self.new_players_added.is_empty()
            && self.unrecognized_messages.is_empty()
    }
}

/// What a single line asks for
#[derive(Debug, Clone, PartialEq, Eq)]
enum LineAction {
    Confirm(String),
    Pay(String),
    Unrecognized,
}

// ============================================================================
// INGESTOR
// ============================================================================

pub struct ChatIngestor<'a, S: Roster + Ledger + ?Sized> {
    store: &'a mut S,
    options: IngestOptions,
}

impl<'a, S: Roster + Ledger + ?Sized> ChatIngestor<'a, S> {
    pub fn new(store: &'a mut S) -> Self {
        Self::with_options(store, IngestOptions::default())
    }

    pub fn with_options(store: &'a mut S, options: IngestOptions) -> Self {
        ChatIngestor { store, options }
    }

    /// Parse a whole transcript, line by line, in order
    pub fn parse(&mut self, transcript: &str) -> ParseOutcome {
        let mut outcome = ParseOutcome::default();

        // "\r\n" yields an empty piece between the two, skipped as blank
        for line in transcript.split(['\n', '\r']) {
            if strip_invisible(line).trim().is_empty() {
                continue;
            }
            self.process_line(line, &mut outcome);
        }

        info!(
            confirmed = outcome.players_confirmed,
            payments = outcome.payments_registered,
            created = outcome.new_players_added.len(),
            unrecognized = outcome.unrecognized_messages.len(),
            "transcript parsed"
        );

        outcome
    }

    fn process_line(&mut self, line: &str, outcome: &mut ParseOutcome) {
        match decide(line) {
            LineAction::Confirm(name) => self.confirm(line, &name, outcome),
            LineAction::Pay(name) => self.pay(line, &name, outcome),
            LineAction::Unrecognized => outcome.unrecognized_messages.push(line.to_string()),
        }
    }

    fn confirm(&mut self, line: &str, name: &str, outcome: &mut ParseOutcome) {
        let Some(member) = self.resolve(line, name, outcome) else {
            return;
        };

        let mut flipped = false;
        if !member.attended {
            if let Err(err) = self.store.set_attendance(&member.id, true) {
                warn!(member = %member.name, error = %err, "attendance update failed");
                outcome
                    .unrecognized_messages
                    .push(format!("error confirming attendance for {}", member.name));
                return;
            }
            flipped = true;
        }

        let counted = match self.options.counting {
            ConfirmationCounting::EveryLine => true,
            ConfirmationCounting::StateTransitions => flipped,
        };

        if counted {
            outcome.players_confirmed += 1;
            outcome.confirmed_players.push(member.name);
        } else {
            debug!(member = %member.name, "repeat confirmation not counted");
        }
    }

    fn pay(&mut self, line: &str, name: &str, outcome: &mut ParseOutcome) {
        let Some(member) = self.resolve(line, name, outcome) else {
            return;
        };

        match self
            .store
            .append_payment(&member.id, 0.0, &self.options.payment_note)
        {
            Ok(_) => {
                outcome.payments_registered += 1;
                outcome.paid_players.push(member.name);
            }
            Err(err) => {
                warn!(member = %member.name, error = %err, "payment append failed");
                outcome
                    .unrecognized_messages
                    .push(format!("error registering payment for {}", member.name));
            }
        }
    }

    /// Resolve a name, recording creations and failures in the outcome
    fn resolve(&mut self, line: &str, name: &str, outcome: &mut ParseOutcome) -> Option<RosterMember> {
        match self.options.resolver.resolve(&mut *self.store, name) {
            Ok(Resolution::Existing { member, .. }) => Some(member),
            Ok(Resolution::Created(member)) => {
                outcome.new_players_added.push(member.name.clone());
                Some(member)
            }
            Ok(Resolution::Unidentifiable) => {
                outcome.unrecognized_messages.push(line.to_string());
                None
            }
            Err(err) => {
                warn!(name, error = %err, "name resolution failed");
                outcome
                    .unrecognized_messages
                    .push(format!("error resolving {}", name));
                None
            }
        }
    }
}

/// Convenience: parse with default options
pub fn parse_transcript<S: Roster + Ledger + ?Sized>(store: &mut S, transcript: &str) -> ParseOutcome {
    ChatIngestor::new(store).parse(transcript)
}

// ============================================================================
// DECISION CHAIN
// ============================================================================

fn decide(line: &str) -> LineAction {
    let split = split_line(line);

    let (sender, intent) = match &split {
        SplitOutcome::RejectedHeader { rule } => {
            debug!(rule, "header line rejected");
            return LineAction::Unrecognized;
        }
        SplitOutcome::NoSplit { cleaned } => {
            // "Flavio pago 7000" carries its own name
            return match match_named_payment(cleaned) {
                Some(named) => {
                    debug!(rule = named.rule, name = %named.name, "unsplit named payment");
                    LineAction::Pay(named.name)
                }
                None => {
                    debug!("no grammar matched");
                    LineAction::Unrecognized
                }
            };
        }
        SplitOutcome::Numbered(parsed) => (parsed.sender.clone(), Intent::implicit_confirmation()),
        SplitOutcome::Timestamped(parsed) | SplitOutcome::Simple(parsed) => {
            (parsed.sender.clone(), classify(&parsed.body))
        }
    };

    debug!(
        split_rule = split.rule(),
        confirmation_rule = intent.confirmation_rule,
        payment_rule = intent.payment_rule,
        "line classified"
    );

    if let Some(name) = intent.payment_sender {
        return LineAction::Pay(name);
    }

    match sender {
        Some(sender) if intent.is_confirmation => LineAction::Confirm(sender),
        Some(sender) if intent.is_payment => LineAction::Pay(sender),
        _ => LineAction::Unrecognized,
    }
}
