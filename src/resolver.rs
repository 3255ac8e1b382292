// 🔎 Roster Resolver - Free-text name → roster member
//
// Strategies, tried in order (first match wins):
//   1. Exact      - case-insensitive equality
//   2. Containment - "Juan" ⊂ "Juan Perez" (either direction)
//   3. SharedWord  - both names share a word of 3+ letters
// Nothing matched → create a member with default attributes.

use serde::Serialize;
use tracing::{debug, info};

use crate::error::Result;
use crate::member::{Position, RosterMember, DEFAULT_SKILL};
use crate::normalizer::{display_case, normalize_name};
use crate::store::Roster;

/// Names shorter than this (after normalization) are not identifiable
pub const MIN_NAME_CHARS: usize = 2;

/// Shared-word heuristic ignores words shorter than this
pub const MIN_SHARED_WORD_CHARS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MatchStrategy {
    Exact,
    Containment,
    SharedWord,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Resolved to a member already on the roster
    Existing {
        member: RosterMember,
        strategy: MatchStrategy,
    },

    /// No match; a new member was registered
    Created(RosterMember),

    /// Name normalizes to fewer than 2 characters
    Unidentifiable,
}

impl Resolution {
    pub fn member(&self) -> Option<&RosterMember> {
        match self {
            Resolution::Existing { member, .. } | Resolution::Created(member) => Some(member),
            Resolution::Unidentifiable => None,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Resolution::Created(_))
    }
}

#[derive(Debug, Clone)]
pub struct Resolver {
    pub default_skill: u8,
    pub default_position: Position,
}

impl Default for Resolver {
    fn default() -> Self {
        Resolver {
            default_skill: DEFAULT_SKILL,
            default_position: Position::default(),
        }
    }
}

impl Resolver {
    pub fn new(default_skill: u8, default_position: Position) -> Self {
        Resolver {
            default_skill,
            default_position,
        }
    }

    /// Resolve a free-text name, creating a member when nothing matches.
    ///
    /// Lookup misses never fail; only roster errors are returned.
    pub fn resolve<R: Roster + ?Sized>(&self, roster: &mut R, name: &str) -> Result<Resolution> {
        let normalized = normalize_name(name);
        if normalized.chars().count() < MIN_NAME_CHARS {
            debug!(name, "name not identifiable");
            return Ok(Resolution::Unidentifiable);
        }

        if let Some(member) = roster.find_member_by_name(&normalized)? {
            if member.active {
                return Ok(Resolution::Existing {
                    member,
                    strategy: MatchStrategy::Exact,
                });
            }
        }

        let candidates = roster.active_members()?;
        if let Some((member, strategy)) = fuzzy_match(&normalized, candidates) {
            debug!(name = %normalized, matched = %member.name, ?strategy, "fuzzy match");
            return Ok(Resolution::Existing { member, strategy });
        }

        let member = roster.create_member(
            &display_case(&normalized),
            self.default_skill,
            self.default_position,
        )?;
        info!(name = %member.name, id = %member.id, "new roster member");

        Ok(Resolution::Created(member))
    }
}

/// First candidate (in roster order) matching by containment, then by shared word
fn fuzzy_match(
    normalized: &str,
    candidates: Vec<RosterMember>,
) -> Option<(RosterMember, MatchStrategy)> {
    let needle = normalized.to_lowercase();

    let position = candidates
        .iter()
        .position(|m| contains_either(&needle, &m.name.to_lowercase()))
        .map(|i| (i, MatchStrategy::Containment))
        .or_else(|| {
            candidates
                .iter()
                .position(|m| shares_word(&needle, &m.name.to_lowercase()))
                .map(|i| (i, MatchStrategy::SharedWord))
        });

    position.and_then(|(i, strategy)| candidates.into_iter().nth(i).map(|m| (m, strategy)))
}

fn contains_either(a: &str, b: &str) -> bool {
    !b.is_empty() && (a.contains(b) || b.contains(a))
}

fn shares_word(a: &str, b: &str) -> bool {
    a.split_whitespace()
        .filter(|w| w.chars().count() >= MIN_SHARED_WORD_CHARS)
        .any(|w| b.split_whitespace().any(|other| other == w))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryRoster;

    fn roster_with(names: &[&str]) -> MemoryRoster {
        let mut roster = MemoryRoster::new();
        for name in names {
            roster.create_member(name, 5, Position::Midfielder).unwrap();
        }
        roster
    }

    fn resolved_name(resolution: &Resolution) -> &str {
        &resolution.member().unwrap().name
    }

    #[test]
    fn test_exact_match_case_insensitive() {
        let mut roster = roster_with(&["Juan Perez"]);
        let resolution = Resolver::default().resolve(&mut roster, "JUAN PEREZ").unwrap();

        assert!(matches!(
            resolution,
            Resolution::Existing { strategy: MatchStrategy::Exact, .. }
        ));
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn test_normalization_before_lookup() {
        let mut roster = roster_with(&["Juan Perez"]);
        let resolution = Resolver::default().resolve(&mut roster, "~ Juan  Perez 🙂").unwrap();

        assert_eq!(resolved_name(&resolution), "Juan Perez");
        assert!(!resolution.is_created());
    }

    #[test]
    fn test_containment_both_directions() {
        let mut roster = roster_with(&["Juan Perez", "Ana"]);
        let resolver = Resolver::default();

        let short = resolver.resolve(&mut roster, "juan").unwrap();
        assert_eq!(resolved_name(&short), "Juan Perez");
        assert!(matches!(
            short,
            Resolution::Existing { strategy: MatchStrategy::Containment, .. }
        ));

        let long = resolver.resolve(&mut roster, "Ana Gomez").unwrap();
        assert_eq!(resolved_name(&long), "Ana");
    }

    #[test]
    fn test_shared_word_heuristic() {
        let mut roster = roster_with(&["Flavio Gomez"]);
        let resolution = Resolver::default().resolve(&mut roster, "Tito Gomez").unwrap();

        assert_eq!(resolved_name(&resolution), "Flavio Gomez");
        assert!(matches!(
            resolution,
            Resolution::Existing { strategy: MatchStrategy::SharedWord, .. }
        ));
    }

    #[test]
    fn test_short_words_are_not_shared() {
        let mut roster = roster_with(&["Juan de Dios"]);
        let resolution = Resolver::default().resolve(&mut roster, "Pedro de Mendoza").unwrap();
        assert!(resolution.is_created());
    }

    #[test]
    fn test_first_match_in_insertion_order() {
        let mut roster = roster_with(&["Carlos Ruiz", "Carlos Paz"]);
        let resolution = Resolver::default().resolve(&mut roster, "Carlos").unwrap();
        assert_eq!(resolved_name(&resolution), "Carlos Ruiz");
    }

    #[test]
    fn test_creates_with_defaults_and_display_case() {
        let mut roster = MemoryRoster::new();
        let resolution = Resolver::default().resolve(&mut roster, "nuevo JUGADOR").unwrap();

        let Resolution::Created(member) = resolution else {
            panic!("expected a created member");
        };
        assert_eq!(member.name, "Nuevo Jugador");
        assert_eq!(member.skill_level, DEFAULT_SKILL);
        assert_eq!(member.position, Position::Midfielder);
        assert!(!member.attended);
        assert!(member.active);
    }

    #[test]
    fn test_custom_defaults() {
        let mut roster = MemoryRoster::new();
        let resolver = Resolver::new(7, Position::Forward);
        let member = resolver.resolve(&mut roster, "Lucas").unwrap().member().cloned().unwrap();

        assert_eq!(member.skill_level, 7);
        assert_eq!(member.position, Position::Forward);
    }

    #[test]
    fn test_unidentifiable_names() {
        let mut roster = roster_with(&["Juan"]);
        let resolver = Resolver::default();

        for name in ["", "   ", "J", "+54 9 11 5555", "🙂🙂"] {
            assert_eq!(resolver.resolve(&mut roster, name).unwrap(), Resolution::Unidentifiable);
        }
        assert_eq!(roster.len(), 1, "no junk members");
    }

    #[test]
    fn test_deterministic_resolution() {
        let mut roster = roster_with(&["Maria"]);
        let resolver = Resolver::default();

        let first = resolver.resolve(&mut roster, "Pedro").unwrap();
        let second = resolver.resolve(&mut roster, "pedro").unwrap();

        assert!(first.is_created());
        assert!(!second.is_created());
        assert_eq!(first.member().unwrap().id, second.member().unwrap().id);
        assert_eq!(roster.len(), 2);
    }

    #[test]
    fn test_inactive_members_are_skipped() {
        let mut roster = roster_with(&["Juan Perez", "Pedro"]);
        let juan = roster.find_member_by_name("Juan Perez").unwrap().unwrap();
        roster.deactivate(&juan.id).unwrap();

        let resolution = Resolver::default().resolve(&mut roster, "Juan").unwrap();
        assert!(resolution.is_created());
        assert_eq!(resolved_name(&resolution), "Juan");
    }
}
