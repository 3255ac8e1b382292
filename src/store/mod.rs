// 🗄️ Roster & Ledger collaborators
//
// The ingestion core only sees these two traits. Two implementations:
// - MemoryRoster: plain in-memory registry (tests, dry runs)
// - SqliteStore: rusqlite + WAL + audit trail (CLI, API server)

use serde::Deserialize;
use std::io::Read;
use std::path::Path;

use crate::error::{Error, Result};
use crate::member::{Payment, Position, RosterMember, DEFAULT_SKILL};

pub mod memory;
pub mod sqlite;

pub use memory::MemoryRoster;
pub use sqlite::SqliteStore;

// ============================================================================
// COLLABORATOR TRAITS
// ============================================================================

/// Roster store: find/create members, flip attendance
///
/// Implementations may be transactional; callers treat every method as
/// able to fail independently.
pub trait Roster {
    /// Case-insensitive exact lookup (active or not)
    fn find_member_by_name(&self, name: &str) -> Result<Option<RosterMember>>;

    /// Active members in insertion order
    fn active_members(&self) -> Result<Vec<RosterMember>>;

    /// Register a new member. Fails with `Error::Duplicate` if the name is taken.
    fn create_member(
        &mut self,
        name: &str,
        skill_level: u8,
        position: Position,
    ) -> Result<RosterMember>;

    fn set_attendance(&mut self, member_id: &str, attended: bool) -> Result<()>;
}

/// Payment ledger: append a record, bump the member's paid total
pub trait Ledger {
    fn append_payment(&mut self, member_id: &str, amount: f64, note: &str) -> Result<Payment>;
}

// ============================================================================
// CSV SEEDING
// ============================================================================

/// One roster row from a CSV file: `name,skill,position`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RosterSeed {
    pub name: String,

    #[serde(default)]
    pub skill: Option<u8>,

    #[serde(default)]
    pub position: Option<String>,
}

/// Read seed rows from any CSV source (header row required)
pub fn read_roster_csv<R: Read>(reader: R) -> Result<Vec<RosterSeed>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut seeds = Vec::new();
    for result in rdr.deserialize() {
        let seed: RosterSeed = result?;
        seeds.push(seed);
    }

    Ok(seeds)
}

pub fn load_roster_csv(path: &Path) -> Result<Vec<RosterSeed>> {
    let file = std::fs::File::open(path)?;
    read_roster_csv(file)
}

/// Summary of a seeding run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub created: Vec<String>,
    pub skipped: Vec<String>,
}

/// Create every seed not already on the roster. Invalid rows abort the run.
pub fn seed_roster<R: Roster + ?Sized>(roster: &mut R, seeds: &[RosterSeed]) -> Result<SeedReport> {
    let mut report = SeedReport::default();

    for seed in seeds {
        let name = seed.name.trim();
        if name.is_empty() {
            return Err(Error::Validation("roster row with empty name".to_string()));
        }

        if roster.find_member_by_name(name)?.is_some() {
            report.skipped.push(name.to_string());
            continue;
        }

        let position = match seed.position.as_deref().map(str::trim) {
            Some(p) if !p.is_empty() => p.parse()?,
            _ => Position::default(),
        };

        let member = roster.create_member(name, seed.skill.unwrap_or(DEFAULT_SKILL), position)?;
        report.created.push(member.name);
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_roster_csv() {
        let data = "name,skill,position\nJuan Perez,7,DEL\nAna,,\n  Carlos , 4 , por\n";
        let seeds = read_roster_csv(data.as_bytes()).unwrap();

        assert_eq!(seeds.len(), 3);
        assert_eq!(seeds[0].name, "Juan Perez");
        assert_eq!(seeds[0].skill, Some(7));
        assert_eq!(seeds[1].skill, None);
        assert_eq!(seeds[2].name, "Carlos");
        assert_eq!(seeds[2].position.as_deref(), Some("por"));
    }

    #[test]
    fn test_seed_roster_skips_existing() {
        let mut roster = MemoryRoster::new();
        roster.create_member("Juan Perez", 5, Position::Midfielder).unwrap();

        let seeds = read_roster_csv("name,skill,position\njuan perez,7,DEL\nCarlos,4,POR\n".as_bytes()).unwrap();
        let report = seed_roster(&mut roster, &seeds).unwrap();

        assert_eq!(report.created, vec!["Carlos".to_string()]);
        assert_eq!(report.skipped, vec!["juan perez".to_string()]);

        let carlos = roster.find_member_by_name("carlos").unwrap().unwrap();
        assert_eq!(carlos.skill_level, 4);
        assert_eq!(carlos.position, Position::Goalkeeper);
    }

    #[test]
    fn test_seed_roster_rejects_bad_skill() {
        let mut roster = MemoryRoster::new();
        let seeds = vec![RosterSeed {
            name: "Pedro".to_string(),
            skill: Some(11),
            position: None,
        }];

        assert!(matches!(seed_roster(&mut roster, &seeds), Err(Error::Validation(_))));
    }
}
