//! Faction context resolution and the rank hierarchy.
//!
//! Every command resolves the invoking guild and user to a `(faction, member)`
//! pair through [`resolve`] before touching anything else. Rank comparisons go
//! through [`Rank`]'s total order; the two fine-specific exceptions live here
//! as [`can_fine`] and [`can_remove_fine`] so no handler re-derives them.

use crate::db::{Database, FactionRecord, FineRecord, MemberRecord};

/// Member ranks, ordered MEMBER < OFFICER < LEADER.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Rank {
    Member,
    Officer,
    Leader,
}

impl Rank {
    pub fn parse(role: &str) -> Option<Rank> {
        match role {
            "LEADER" => Some(Rank::Leader),
            "OFFICER" => Some(Rank::Officer),
            "MEMBER" => Some(Rank::Member),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Rank::Leader => "LEADER",
            Rank::Officer => "OFFICER",
            Rank::Member => "MEMBER",
        }
    }
}

impl MemberRecord {
    /// Unknown role strings demote to MEMBER rather than escalate.
    pub fn rank(&self) -> Rank {
        Rank::parse(&self.role).unwrap_or(Rank::Member)
    }
}

/// Outcome of resolving an invocation against the persisted faction state.
#[derive(Debug)]
pub enum Resolution {
    /// No faction registered for this guild.
    Unregistered,
    /// Faction exists but the invoking user holds no membership.
    NotAMember,
    Authorized {
        faction: FactionRecord,
        member: MemberRecord,
    },
}

/// Read-only lookup; persistence failures surface to the caller.
pub fn resolve(db: &Database, guild_id: u64, user_id: u64) -> anyhow::Result<Resolution> {
    let Some(faction) = db.get_faction_by_guild(&guild_id.to_string())? else {
        return Ok(Resolution::Unregistered);
    };
    let Some(member) = db.get_member(faction.id, &user_id.to_string())? else {
        return Ok(Resolution::NotAMember);
    };
    Ok(Resolution::Authorized { faction, member })
}

pub fn has_rank(member: &MemberRecord, required: Rank) -> bool {
    member.rank() >= required
}

/// Rank-relative fine guard, checked after the base OFFICER+ requirement:
/// an officer may not fine an officer or a leader, and a leader may not fine
/// another leader except themself.
pub fn can_fine(issuer: &MemberRecord, target: &MemberRecord) -> bool {
    match issuer.rank() {
        Rank::Member => false,
        Rank::Officer => target.rank() < Rank::Officer,
        Rank::Leader => target.rank() < Rank::Leader || target.user_id == issuer.user_id,
    }
}

/// A fine may be removed by its issuer or by any leader.
pub fn can_remove_fine(requester: &MemberRecord, fine: &FineRecord) -> bool {
    requester.rank() == Rank::Leader || fine.issuer_id == requester.user_id
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(user_id: &str, role: &str) -> MemberRecord {
        MemberRecord {
            id: 1,
            faction_id: 1,
            user_id: user_id.to_string(),
            role: role.to_string(),
            joined_at: "2026-01-01 00:00:00".to_string(),
            phone: None,
            handle: None,
        }
    }

    fn fine(issuer_id: &str) -> FineRecord {
        FineRecord {
            id: 1,
            faction_id: 1,
            user_id: "u1".to_string(),
            issuer_id: issuer_id.to_string(),
            amount: 100,
            reason: "test".to_string(),
            paid: false,
            created_at: "2026-01-01 00:00:00".to_string(),
        }
    }

    #[test]
    fn test_rank_total_order() {
        let ranks = [Rank::Member, Rank::Officer, Rank::Leader];
        for (i, held) in ranks.iter().enumerate() {
            for (j, required) in ranks.iter().enumerate() {
                let m = member("u1", held.as_str());
                assert_eq!(
                    has_rank(&m, *required),
                    i >= j,
                    "{:?} vs required {:?}",
                    held,
                    required
                );
            }
        }
    }

    #[test]
    fn test_unknown_role_is_member() {
        let m = member("u1", "WARLORD");
        assert_eq!(m.rank(), Rank::Member);
        assert!(!has_rank(&m, Rank::Officer));
    }

    #[test]
    fn test_officer_cannot_fine_equal_or_higher() {
        let officer = member("u1", "OFFICER");
        assert!(can_fine(&officer, &member("u2", "MEMBER")));
        assert!(!can_fine(&officer, &member("u2", "OFFICER")));
        assert!(!can_fine(&officer, &member("u2", "LEADER")));
        // Not even themself
        assert!(!can_fine(&officer, &member("u1", "OFFICER")));
    }

    #[test]
    fn test_leader_fines_anyone_but_other_leaders() {
        let leader = member("u1", "LEADER");
        assert!(can_fine(&leader, &member("u2", "MEMBER")));
        assert!(can_fine(&leader, &member("u2", "OFFICER")));
        assert!(!can_fine(&leader, &member("u2", "LEADER")));
        // A leader fining themself is allowed
        assert!(can_fine(&leader, &member("u1", "LEADER")));
    }

    #[test]
    fn test_plain_member_cannot_fine() {
        let m = member("u1", "MEMBER");
        assert!(!can_fine(&m, &member("u2", "MEMBER")));
    }

    #[test]
    fn test_fine_removal_rules() {
        assert!(can_remove_fine(&member("u1", "OFFICER"), &fine("u1")));
        assert!(!can_remove_fine(&member("u1", "OFFICER"), &fine("u2")));
        assert!(can_remove_fine(&member("u1", "LEADER"), &fine("u2")));
    }
}
