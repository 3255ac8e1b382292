// 🗄️ SQLite roster + ledger - WAL mode, audit trail
//
// Tables:
//   members   - roster (name_key = Unicode-lowercased name, UNIQUE)
//   payments  - ledger entries (0.0 = chat placeholder awaiting correction)
//   events    - every mutation, append-only

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::debug;

use crate::error::{Error, Result};
use crate::ingest::ParseOutcome;
use crate::member::{
    validate_amount, validate_skill, Event, Payment, Position, RosterMember,
};

use super::{Ledger, Roster};

const MEMBER_COLUMNS: &str = "member_uuid, name, skill_level, position, total_debt, total_paid,
     games_played, goals_scored, attended, active, created_at";

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) a database file and make sure the schema exists
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = SqliteStore { conn };
        store.setup_database()?;
        debug!(path = %path.display(), "roster database opened");
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = SqliteStore { conn };
        store.setup_database()?;
        Ok(store)
    }

    fn setup_database(&self) -> Result<()> {
        // Enable WAL mode for crash recovery
        self.conn.pragma_update(None, "journal_mode", "WAL")?;

        // ==========================================================================
        // Members
        // ==========================================================================
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS members (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                member_uuid TEXT UNIQUE NOT NULL,
                name TEXT NOT NULL,
                name_key TEXT UNIQUE NOT NULL,
                skill_level INTEGER NOT NULL DEFAULT 5,
                position TEXT NOT NULL DEFAULT 'MED',
                total_debt REAL NOT NULL DEFAULT 0,
                total_paid REAL NOT NULL DEFAULT 0,
                games_played INTEGER NOT NULL DEFAULT 0,
                goals_scored INTEGER NOT NULL DEFAULT 0,
                attended INTEGER NOT NULL DEFAULT 0,
                active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        // ==========================================================================
        // Payments
        // ==========================================================================
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS payments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                payment_uuid TEXT UNIQUE NOT NULL,
                member_uuid TEXT NOT NULL REFERENCES members(member_uuid),
                member_name TEXT NOT NULL,
                amount REAL NOT NULL,
                timestamp TEXT NOT NULL,
                note TEXT
            )",
            [],
        )?;

        // ==========================================================================
        // Events Table (audit trail)
        // ==========================================================================
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                event_id TEXT UNIQUE NOT NULL,
                timestamp TEXT NOT NULL,
                event_type TEXT NOT NULL,
                entity_type TEXT NOT NULL,
                entity_id TEXT NOT NULL,
                data TEXT NOT NULL,
                actor TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_payments_member ON payments(member_uuid)",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_type, entity_id)",
            [],
        )?;

        Ok(())
    }

    // ========================================================================
    // ROSTER QUERIES
    // ========================================================================

    /// Every member (active or not) in insertion order
    pub fn all_members(&self) -> Result<Vec<RosterMember>> {
        self.query_members("SELECT {cols} FROM members ORDER BY id", [])
    }

    /// Members whose debt exceeds what they paid
    pub fn members_with_debt(&self) -> Result<Vec<RosterMember>> {
        self.query_members(
            "SELECT {cols} FROM members WHERE total_debt > total_paid ORDER BY total_debt - total_paid DESC",
            [],
        )
    }

    pub fn member_by_id(&self, member_id: &str) -> Result<Option<RosterMember>> {
        let sql = format!("SELECT {} FROM members WHERE member_uuid = ?1", MEMBER_COLUMNS);
        let member = self
            .conn
            .query_row(&sql, [member_id], row_to_member)
            .optional()?;
        Ok(member)
    }

    fn require_member_named(&self, name: &str) -> Result<RosterMember> {
        self.find_member_by_name(name)?
            .ok_or_else(|| Error::NotFound(format!("member {}", name)))
    }

    fn query_members<P: rusqlite::Params>(&self, template: &str, params: P) -> Result<Vec<RosterMember>> {
        let sql = template.replace("{cols}", MEMBER_COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let members = stmt
            .query_map(params, row_to_member)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(members)
    }

    // ========================================================================
    // ROSTER MUTATIONS
    // ========================================================================

    pub fn update_skill(&mut self, name: &str, skill_level: u8) -> Result<RosterMember> {
        validate_skill(skill_level)?;
        let member = self.require_member_named(name)?;

        let tx = self.conn.transaction()?;
        tx.execute(
            "UPDATE members SET skill_level = ?1 WHERE member_uuid = ?2",
            params![skill_level, member.id],
        )?;
        insert_event(
            &tx,
            &Event::new(
                "skill_updated",
                "member",
                &member.id,
                serde_json::json!({ "from": member.skill_level, "to": skill_level }),
                "roster",
            ),
        )?;
        tx.commit()?;

        Ok(RosterMember { skill_level, ..member })
    }

    /// Add to a member's debt (e.g. the fee for one match)
    pub fn add_debt(&mut self, name: &str, amount: f64) -> Result<RosterMember> {
        validate_amount(amount)?;
        let member = self.require_member_named(name)?;

        let tx = self.conn.transaction()?;
        tx.execute(
            "UPDATE members SET total_debt = total_debt + ?1 WHERE member_uuid = ?2",
            params![amount, member.id],
        )?;
        insert_event(
            &tx,
            &Event::new(
                "debt_added",
                "member",
                &member.id,
                serde_json::json!({ "amount": amount }),
                "ledger",
            ),
        )?;
        tx.commit()?;

        Ok(RosterMember {
            total_debt: member.total_debt + amount,
            ..member
        })
    }

    /// Clear every attendance flag before a new session. Returns how many were reset.
    pub fn reset_attendance(&mut self) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let reset = tx.execute("UPDATE members SET attended = 0 WHERE attended = 1", [])?;
        insert_event(
            &tx,
            &Event::new(
                "attendance_reset",
                "roster",
                "all",
                serde_json::json!({ "members_reset": reset }),
                "roster",
            ),
        )?;
        tx.commit()?;

        Ok(reset)
    }

    // ========================================================================
    // LEDGER
    // ========================================================================

    /// Manual payment with a real amount (must be > 0)
    pub fn record_payment(&mut self, name: &str, amount: f64, note: Option<&str>) -> Result<Payment> {
        if validate_amount(amount)? == 0.0 {
            return Err(Error::Validation("manual payments need an amount above 0".to_string()));
        }
        let member = self.require_member_named(name)?;
        self.insert_payment(&member, amount, note)
    }

    pub fn payments(&self) -> Result<Vec<Payment>> {
        self.query_payments(
            "SELECT payment_uuid, member_uuid, member_name, amount, timestamp, note
             FROM payments ORDER BY id",
            [],
        )
    }

    pub fn payments_for(&self, name: &str) -> Result<Vec<Payment>> {
        let member = self.require_member_named(name)?;
        self.query_payments(
            "SELECT payment_uuid, member_uuid, member_name, amount, timestamp, note
             FROM payments WHERE member_uuid = ?1 ORDER BY id",
            [member.id],
        )
    }

    fn query_payments<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Vec<Payment>> {
        let mut stmt = self.conn.prepare(sql)?;
        let payments = stmt
            .query_map(params, |row| {
                let timestamp_str: String = row.get(4)?;
                Ok(Payment {
                    id: row.get(0)?,
                    member_id: row.get(1)?,
                    member_name: row.get(2)?,
                    amount: row.get(3)?,
                    timestamp: parse_timestamp(&timestamp_str),
                    note: row.get(5)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(payments)
    }

    fn insert_payment(&mut self, member: &RosterMember, amount: f64, note: Option<&str>) -> Result<Payment> {
        let payment = Payment::new(member, amount, note.map(str::to_string));

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO payments (payment_uuid, member_uuid, member_name, amount, timestamp, note)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                payment.id,
                payment.member_id,
                payment.member_name,
                payment.amount,
                payment.timestamp.to_rfc3339(),
                payment.note,
            ],
        )?;
        tx.execute(
            "UPDATE members SET total_paid = total_paid + ?1 WHERE member_uuid = ?2",
            params![amount, member.id],
        )?;
        insert_event(
            &tx,
            &Event::new(
                "payment_recorded",
                "member",
                &member.id,
                serde_json::json!({ "amount": amount, "payment_id": payment.id, "note": payment.note }),
                "ledger",
            ),
        )?;
        tx.commit()?;

        Ok(payment)
    }

    // ========================================================================
    // TRANSCRIPTS
    // ========================================================================

    /// Log a parsed transcript by digest. Returns the digest.
    pub fn record_transcript(&mut self, transcript: &str, outcome: &ParseOutcome) -> Result<String> {
        let digest = transcript_digest(transcript);

        insert_event(
            &self.conn,
            &Event::new(
                "transcript_parsed",
                "transcript",
                &digest,
                serde_json::json!({
                    "players_confirmed": outcome.players_confirmed,
                    "payments_registered": outcome.payments_registered,
                    "new_players_added": outcome.new_players_added,
                    "unrecognized": outcome.unrecognized_messages.len(),
                }),
                "chat_ingestor",
            ),
        )?;

        Ok(digest)
    }

    /// Has this exact transcript been parsed before?
    pub fn transcript_seen(&self, transcript: &str) -> Result<bool> {
        let digest = transcript_digest(transcript);
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM events WHERE entity_type = 'transcript' AND entity_id = ?1",
            [digest],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn events_for_entity(&self, entity_type: &str, entity_id: &str) -> Result<Vec<Event>> {
        get_events_for_entity(&self.conn, entity_type, entity_id)
    }
}

// ============================================================================
// COLLABORATOR TRAITS
// ============================================================================

impl Roster for SqliteStore {
    fn find_member_by_name(&self, name: &str) -> Result<Option<RosterMember>> {
        let sql = format!("SELECT {} FROM members WHERE name_key = ?1", MEMBER_COLUMNS);
        let member = self
            .conn
            .query_row(&sql, [name_key(name)], row_to_member)
            .optional()?;
        Ok(member)
    }

    fn active_members(&self) -> Result<Vec<RosterMember>> {
        self.query_members("SELECT {cols} FROM members WHERE active = 1 ORDER BY id", [])
    }

    fn create_member(
        &mut self,
        name: &str,
        skill_level: u8,
        position: Position,
    ) -> Result<RosterMember> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Validation("member name cannot be empty".to_string()));
        }
        validate_skill(skill_level)?;

        if self.find_member_by_name(name)?.is_some() {
            return Err(Error::Duplicate(name.to_string()));
        }

        let member = RosterMember::new(name.to_string(), skill_level, position);

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO members (member_uuid, name, name_key, skill_level, position, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                member.id,
                member.name,
                name_key(&member.name),
                member.skill_level,
                member.position.as_str(),
                member.created_at.to_rfc3339(),
            ],
        )?;
        insert_event(
            &tx,
            &Event::new(
                "member_created",
                "member",
                &member.id,
                serde_json::json!({
                    "name": member.name,
                    "skill_level": member.skill_level,
                    "position": member.position.as_str(),
                }),
                "roster",
            ),
        )?;
        tx.commit()?;

        Ok(member)
    }

    fn set_attendance(&mut self, member_id: &str, attended: bool) -> Result<()> {
        // Flag and audit event land together or not at all
        let tx = self.conn.transaction()?;
        let updated = tx.execute(
            "UPDATE members SET attended = ?1 WHERE member_uuid = ?2",
            params![attended, member_id],
        )?;

        if updated == 0 {
            return Err(Error::NotFound(format!("member {}", member_id)));
        }

        insert_event(
            &tx,
            &Event::new(
                "attendance_marked",
                "member",
                member_id,
                serde_json::json!({ "attended": attended }),
                "roster",
            ),
        )?;
        tx.commit()?;

        Ok(())
    }
}

impl Ledger for SqliteStore {
    fn append_payment(&mut self, member_id: &str, amount: f64, note: &str) -> Result<Payment> {
        validate_amount(amount)?;
        let member = self
            .member_by_id(member_id)?
            .ok_or_else(|| Error::NotFound(format!("member {}", member_id)))?;
        self.insert_payment(&member, amount, Some(note))
    }
}

// ============================================================================
// HELPERS
// ============================================================================

/// Unicode-aware case folding (SQLite's NOCASE only folds ASCII)
fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// SHA-256 of the transcript text, hex encoded
pub fn transcript_digest(transcript: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(transcript.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn row_to_member(row: &Row<'_>) -> rusqlite::Result<RosterMember> {
    let position: String = row.get(3)?;
    let created_at: String = row.get(10)?;

    Ok(RosterMember {
        id: row.get(0)?,
        name: row.get(1)?,
        skill_level: row.get(2)?,
        position: position.parse().unwrap_or_default(),
        total_debt: row.get(4)?,
        total_paid: row.get(5)?,
        games_played: row.get(6)?,
        goals_scored: row.get(7)?,
        attended: row.get(8)?,
        active: row.get(9)?,
        created_at: parse_timestamp(&created_at),
    })
}

/// Insert event into audit trail
pub fn insert_event(conn: &Connection, event: &Event) -> Result<()> {
    let data_json = serde_json::to_string(&event.data)?;

    conn.execute(
        "INSERT INTO events (
            event_id, timestamp, event_type, entity_type, entity_id, data, actor
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            event.event_id,
            event.timestamp.to_rfc3339(),
            event.event_type,
            event.entity_type,
            event.entity_id,
            data_json,
            event.actor,
        ],
    )?;

    Ok(())
}

/// Get events for a specific entity, oldest first
pub fn get_events_for_entity(
    conn: &Connection,
    entity_type: &str,
    entity_id: &str,
) -> Result<Vec<Event>> {
    let mut stmt = conn.prepare(
        "SELECT event_id, timestamp, event_type, entity_type, entity_id, data, actor
         FROM events
         WHERE entity_type = ?1 AND entity_id = ?2
         ORDER BY id",
    )?;

    let events = stmt
        .query_map(params![entity_type, entity_id], |row| {
            let timestamp_str: String = row.get(1)?;
            let data_json: String = row.get(5)?;

            Ok(Event {
                event_id: row.get(0)?,
                timestamp: parse_timestamp(&timestamp_str),
                event_type: row.get(2)?,
                entity_type: row.get(3)?,
                entity_id: row.get(4)?,
                data: serde_json::from_str(&data_json).unwrap_or_default(),
                actor: row.get(6)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::member::CHAT_PAYMENT_NOTE;

    fn store_with(names: &[&str]) -> SqliteStore {
        let mut store = SqliteStore::open_in_memory().unwrap();
        for name in names {
            store.create_member(name, 5, Position::Midfielder).unwrap();
        }
        store
    }

    #[test]
    fn test_create_and_find_member() {
        let store = store_with(&["Juan Perez"]);

        let found = store.find_member_by_name("juan perez").unwrap().unwrap();
        assert_eq!(found.name, "Juan Perez");
        assert_eq!(found.skill_level, 5);
        assert_eq!(found.position, Position::Midfielder);
        assert!(!found.attended);
        assert!(found.active);
    }

    #[test]
    fn test_unicode_case_insensitive_uniqueness() {
        let mut store = store_with(&["María"]);

        assert!(store.find_member_by_name("MARÍA").unwrap().is_some());
        let result = store.create_member("MARÍA", 5, Position::Midfielder);
        assert!(matches!(result, Err(Error::Duplicate(_))));
    }

    #[test]
    fn test_active_members_insertion_order() {
        let store = store_with(&["Zoe", "Ana", "Mario"]);

        let names: Vec<String> = store
            .active_members()
            .unwrap()
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(names, vec!["Zoe", "Ana", "Mario"]);
    }

    #[test]
    fn test_set_attendance_and_reset() {
        let mut store = store_with(&["Juan", "Ana"]);
        let juan = store.find_member_by_name("Juan").unwrap().unwrap();

        store.set_attendance(&juan.id, true).unwrap();
        assert!(store.member_by_id(&juan.id).unwrap().unwrap().attended);

        assert_eq!(store.reset_attendance().unwrap(), 1);
        assert!(!store.member_by_id(&juan.id).unwrap().unwrap().attended);
    }

    #[test]
    fn test_set_attendance_unknown_member() {
        let mut store = store_with(&[]);
        assert!(matches!(
            store.set_attendance("nope", true),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_chat_payment_placeholder() {
        let mut store = store_with(&["Flavio"]);
        let flavio = store.find_member_by_name("Flavio").unwrap().unwrap();

        let payment = store.append_payment(&flavio.id, 0.0, CHAT_PAYMENT_NOTE).unwrap();
        assert!(payment.is_pending_amount());

        let payments = store.payments().unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].member_name, "Flavio");
        assert_eq!(payments[0].note.as_deref(), Some(CHAT_PAYMENT_NOTE));
    }

    #[test]
    fn test_manual_payment_and_debt() {
        let mut store = store_with(&["Carlos", "Ana"]);

        store.add_debt("Carlos", 7000.0).unwrap();
        store.add_debt("Ana", 7000.0).unwrap();
        store.record_payment("ana", 7000.0, Some("efectivo")).unwrap();

        let debtors: Vec<String> = store
            .members_with_debt()
            .unwrap()
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(debtors, vec!["Carlos"]);

        let carlos = store.find_member_by_name("Carlos").unwrap().unwrap();
        assert_eq!(carlos.debt(), 7000.0);
        assert_eq!(store.payments_for("Ana").unwrap().len(), 1);
    }

    #[test]
    fn test_manual_payment_requires_positive_amount() {
        let mut store = store_with(&["Carlos"]);
        assert!(matches!(
            store.record_payment("Carlos", 0.0, None),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            store.record_payment("Nadie", 10.0, None),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_update_skill_validates_range() {
        let mut store = store_with(&["Carlos"]);

        let updated = store.update_skill("carlos", 9).unwrap();
        assert_eq!(updated.skill_level, 9);
        assert!(store.update_skill("carlos", 0).is_err());
        assert_eq!(store.find_member_by_name("Carlos").unwrap().unwrap().skill_level, 9);
    }

    #[test]
    fn test_mutations_are_audited() {
        let mut store = store_with(&["Juan"]);
        let juan = store.find_member_by_name("Juan").unwrap().unwrap();
        store.set_attendance(&juan.id, true).unwrap();
        store.append_payment(&juan.id, 0.0, CHAT_PAYMENT_NOTE).unwrap();

        let types: Vec<String> = store
            .events_for_entity("member", &juan.id)
            .unwrap()
            .into_iter()
            .map(|e| e.event_type)
            .collect();
        assert_eq!(types, vec!["member_created", "attendance_marked", "payment_recorded"]);
    }

    /// Make every insert of one event type fail
    fn reject_events(store: &SqliteStore, event_type: &str) {
        store
            .conn
            .execute_batch(&format!(
                "CREATE TRIGGER reject_{t} BEFORE INSERT ON events
                 WHEN NEW.event_type = '{t}'
                 BEGIN SELECT RAISE(ABORT, 'audit trail unavailable'); END;",
                t = event_type
            ))
            .unwrap();
    }

    #[test]
    fn test_failed_audit_rolls_back_attendance() {
        let mut store = store_with(&["Juan"]);
        let juan = store.find_member_by_name("Juan").unwrap().unwrap();
        reject_events(&store, "attendance_marked");

        assert!(store.set_attendance(&juan.id, true).is_err());
        assert!(!store.member_by_id(&juan.id).unwrap().unwrap().attended);
    }

    #[test]
    fn test_failed_audit_rolls_back_roster_updates() {
        let mut store = store_with(&["Carlos"]);
        let carlos = store.find_member_by_name("Carlos").unwrap().unwrap();
        store.set_attendance(&carlos.id, true).unwrap();

        reject_events(&store, "skill_updated");
        reject_events(&store, "debt_added");
        reject_events(&store, "attendance_reset");

        assert!(store.update_skill("Carlos", 9).is_err());
        assert!(store.add_debt("Carlos", 7000.0).is_err());
        assert!(store.reset_attendance().is_err());

        let carlos = store.member_by_id(&carlos.id).unwrap().unwrap();
        assert_eq!(carlos.skill_level, 5);
        assert_eq!(carlos.total_debt, 0.0);
        assert!(carlos.attended);
    }

    #[test]
    fn test_transcript_digest_and_seen() {
        let mut store = store_with(&[]);
        let transcript = "Juan: +1";

        assert!(!store.transcript_seen(transcript).unwrap());
        let digest = store.record_transcript(transcript, &ParseOutcome::default()).unwrap();

        assert_eq!(digest.len(), 64, "SHA-256 hash should be 64 hex characters");
        assert_eq!(digest, transcript_digest(transcript));
        assert!(store.transcript_seen(transcript).unwrap());
        assert!(!store.transcript_seen("Juan: voy").unwrap());
    }
}
