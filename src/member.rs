// 👥 Roster Member - Stable identity + ledger totals
//
// "Member name is a VALUE (can be corrected), member UUID is IDENTITY (never changes)"
//
// - Name uniqueness is case-insensitive ("juan perez" == "Juan Perez")
// - Attendance is session-scoped; reset explicitly between sessions
// - Members are never deleted by chat ingestion

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Skill rating given to members created from chat
pub const DEFAULT_SKILL: u8 = 5;

pub const MIN_SKILL: u8 = 1;
pub const MAX_SKILL: u8 = 10;

/// Ledger note attached to payments detected in a transcript
pub const CHAT_PAYMENT_NOTE: &str = "payment detected from chat";

// ============================================================================
// POSITION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Position {
    /// Portero
    #[serde(rename = "POR")]
    Goalkeeper,

    /// Defensa
    #[serde(rename = "DEF")]
    Defender,

    /// Mediocampo (default for new members)
    #[default]
    #[serde(rename = "MED")]
    Midfielder,

    /// Delantero
    #[serde(rename = "DEL")]
    Forward,
}

impl Position {
    pub fn as_str(&self) -> &'static str {
        match self {
            Position::Goalkeeper => "POR",
            Position::Defender => "DEF",
            Position::Midfielder => "MED",
            Position::Forward => "DEL",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Position {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "POR" | "GK" | "ARQUERO" | "PORTERO" => Ok(Position::Goalkeeper),
            "DEF" | "DEFENSA" | "DEFENSOR" => Ok(Position::Defender),
            "MED" | "MID" | "MEDIOCAMPO" | "MIDFIELD" => Ok(Position::Midfielder),
            "DEL" | "FWD" | "DELANTERO" => Ok(Position::Forward),
            other => Err(Error::Validation(format!("unknown position: {}", other))),
        }
    }
}

// ============================================================================
// ROSTER MEMBER
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterMember {
    /// Stable identity (UUID) - NEVER changes
    pub id: String,

    /// Display name, unique case-insensitively
    pub name: String,

    /// 1-10, used to balance teams
    pub skill_level: u8,

    pub position: Position,

    pub total_debt: f64,
    pub total_paid: f64,

    pub games_played: u32,
    pub goals_scored: u32,

    /// Confirmed for the current session
    pub attended: bool,

    pub active: bool,

    pub created_at: DateTime<Utc>,
}

impl RosterMember {
    /// New member with zero ledger totals, not attending, active
    pub fn new(name: String, skill_level: u8, position: Position) -> Self {
        RosterMember {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            skill_level,
            position,
            total_debt: 0.0,
            total_paid: 0.0,
            games_played: 0,
            goals_scored: 0,
            attended: false,
            active: true,
            created_at: Utc::now(),
        }
    }

    /// paid - debt (negative means the member owes money)
    pub fn balance(&self) -> f64 {
        self.total_paid - self.total_debt
    }

    /// Outstanding debt, never negative
    pub fn debt(&self) -> f64 {
        let balance = self.balance();
        if balance < 0.0 {
            balance.abs()
        } else {
            0.0
        }
    }

    pub fn has_debt(&self) -> bool {
        self.total_debt > self.total_paid
    }

    pub fn same_name(&self, other: &str) -> bool {
        self.name.to_lowercase() == other.trim().to_lowercase()
    }
}

/// Reject skill levels outside 1-10
pub fn validate_skill(skill_level: u8) -> Result<u8, Error> {
    if !(MIN_SKILL..=MAX_SKILL).contains(&skill_level) {
        return Err(Error::Validation(format!(
            "skill level must be between {} and {}, got {}",
            MIN_SKILL, MAX_SKILL, skill_level
        )));
    }
    Ok(skill_level)
}

// ============================================================================
// PAYMENT
// ============================================================================

/// One ledger entry. Chat-detected payments carry a 0.0 placeholder amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: String,
    pub member_id: String,
    pub member_name: String,
    pub amount: f64,
    pub timestamp: DateTime<Utc>,
    pub note: Option<String>,
}

impl Payment {
    pub fn new(member: &RosterMember, amount: f64, note: Option<String>) -> Self {
        Payment {
            id: uuid::Uuid::new_v4().to_string(),
            member_id: member.id.clone(),
            member_name: member.name.clone(),
            amount,
            timestamp: Utc::now(),
            note,
        }
    }

    /// Placeholder entry waiting for a manual amount correction
    pub fn is_pending_amount(&self) -> bool {
        self.amount == 0.0
    }
}

/// Amounts must be finite and non-negative (0.0 = pending correction)
pub fn validate_amount(amount: f64) -> Result<f64, Error> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(Error::Validation(format!(
            "payment amount must be a non-negative number, got {}",
            amount
        )));
    }
    Ok(amount)
}

// ============================================================================
// EVENT (audit trail)
// ============================================================================

/// Every roster/ledger mutation is recorded as an event
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Event {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: String,
    pub data: serde_json::Value,
    pub actor: String,
}

impl Event {
    pub fn new(
        event_type: &str,
        entity_type: &str,
        entity_id: &str,
        data: serde_json::Value,
        actor: &str,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            data,
            actor: actor.to_string(),
        }
    }
}
