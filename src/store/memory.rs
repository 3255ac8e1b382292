// 🧠 In-memory roster + ledger
//
// Append-only registry in insertion order. Used by tests and by dry runs
// (a snapshot of the persistent roster that is thrown away afterwards).

use crate::error::{Error, Result};
use crate::member::{validate_amount, validate_skill, Payment, Position, RosterMember};

use super::{Ledger, Roster};

#[derive(Debug, Clone, Default)]
pub struct MemoryRoster {
    members: Vec<RosterMember>,
    payments: Vec<Payment>,
}

impl MemoryRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing snapshot (insertion order preserved)
    pub fn from_members(members: Vec<RosterMember>) -> Self {
        MemoryRoster {
            members,
            payments: Vec::new(),
        }
    }

    pub fn payments(&self) -> &[Payment] {
        &self.payments
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Mark a member inactive (kept, but skipped by resolution)
    pub fn deactivate(&mut self, member_id: &str) -> Result<()> {
        let member = self.member_mut(member_id)?;
        member.active = false;
        Ok(())
    }

    fn member_mut(&mut self, member_id: &str) -> Result<&mut RosterMember> {
        self.members
            .iter_mut()
            .find(|m| m.id == member_id)
            .ok_or_else(|| Error::NotFound(format!("member {}", member_id)))
    }
}

impl Roster for MemoryRoster {
    fn find_member_by_name(&self, name: &str) -> Result<Option<RosterMember>> {
        Ok(self.members.iter().find(|m| m.same_name(name)).cloned())
    }

    fn active_members(&self) -> Result<Vec<RosterMember>> {
        Ok(self.members.iter().filter(|m| m.active).cloned().collect())
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

        if self.members.iter().any(|m| m.same_name(name)) {
            return Err(Error::Duplicate(name.to_string()));
        }

        let member = RosterMember::new(name.to_string(), skill_level, position);
        self.members.push(member.clone());
        Ok(member)
    }

    fn set_attendance(&mut self, member_id: &str, attended: bool) -> Result<()> {
        self.member_mut(member_id)?.attended = attended;
        Ok(())
    }
}

impl Ledger for MemoryRoster {
    fn append_payment(&mut self, member_id: &str, amount: f64, note: &str) -> Result<Payment> {
        validate_amount(amount)?;

        let member = self.member_mut(member_id)?;
        member.total_paid += amount;

        let payment = Payment::new(member, amount, Some(note.to_string()));
        self.payments.push(payment.clone());
        Ok(payment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_find_case_insensitive() {
        let mut roster = MemoryRoster::new();
        let created = roster.create_member("María José", 5, Position::Midfielder).unwrap();

        let found = roster.find_member_by_name("MARÍA JOSÉ").unwrap().unwrap();
        assert_eq!(found.id, created.id);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut roster = MemoryRoster::new();
        roster.create_member("Juan", 5, Position::Midfielder).unwrap();

        let result = roster.create_member("juan", 5, Position::Midfielder);
        assert!(matches!(result, Err(Error::Duplicate(_))));
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn test_active_members_in_insertion_order() {
        let mut roster = MemoryRoster::new();
        let a = roster.create_member("Ana", 5, Position::Midfielder).unwrap();
        let b = roster.create_member("Beto", 5, Position::Midfielder).unwrap();
        let c = roster.create_member("Ceci", 5, Position::Midfielder).unwrap();
        roster.deactivate(&b.id).unwrap();

        let active: Vec<String> = roster
            .active_members()
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(active, vec![a.id, c.id]);
    }

    #[test]
    fn test_set_attendance_unknown_member() {
        let mut roster = MemoryRoster::new();
        assert!(matches!(
            roster.set_attendance("missing", true),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_append_payment_updates_total() {
        let mut roster = MemoryRoster::new();
        let juan = roster.create_member("Juan", 5, Position::Midfielder).unwrap();

        let payment = roster.append_payment(&juan.id, 0.0, "payment detected from chat").unwrap();
        assert!(payment.is_pending_amount());
        assert_eq!(payment.member_name, "Juan");

        roster.append_payment(&juan.id, 7000.0, "cash").unwrap();
        let juan = roster.find_member_by_name("juan").unwrap().unwrap();
        assert_eq!(juan.total_paid, 7000.0);
        assert_eq!(roster.payments().len(), 2);
    }

    #[test]
    fn test_negative_payment_rejected() {
        let mut roster = MemoryRoster::new();
        let juan = roster.create_member("Juan", 5, Position::Midfielder).unwrap();

        assert!(roster.append_payment(&juan.id, -5.0, "oops").is_err());
        assert!(roster.payments().is_empty());
    }
}
