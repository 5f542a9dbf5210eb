//! Agent ownership of a session (§4.3 "Ownership"). One exclusive owner by
//! default; `shared` mode enumerates multiple allowed owners and refuses
//! further claims once the set is full.

use std::collections::HashSet;

use parking_lot::RwLock;
use soulbrowser_core_types::AgentId;

use crate::errors::{SessionError, SessionResult};
use crate::types::OwnerMode;

#[derive(Debug)]
enum Owners {
    Unclaimed,
    Exclusive(AgentId),
    Shared(HashSet<AgentId>),
}

pub struct OwnershipGuard {
    owners: RwLock<Owners>,
}

impl Default for OwnershipGuard {
    fn default() -> Self {
        Self {
            owners: RwLock::new(Owners::Unclaimed),
        }
    }
}

impl OwnershipGuard {
    pub fn claim(&self, agent: AgentId, mode: OwnerMode) -> SessionResult<()> {
        let mut guard = self.owners.write();
        match (&*guard, mode) {
            (Owners::Unclaimed, OwnerMode::Exclusive) => {
                *guard = Owners::Exclusive(agent);
                Ok(())
            }
            (Owners::Unclaimed, OwnerMode::Shared) => {
                let mut set = HashSet::new();
                set.insert(agent);
                *guard = Owners::Shared(set);
                Ok(())
            }
            (Owners::Exclusive(owner), _) if *owner == agent => Ok(()),
            (Owners::Exclusive(owner), _) => {
                Err(SessionError::AlreadyClaimed(owner.0.clone()))
            }
            (Owners::Shared(set), OwnerMode::Shared) => {
                let mut set = set.clone();
                set.insert(agent);
                *guard = Owners::Shared(set);
                Ok(())
            }
            (Owners::Shared(_), OwnerMode::Exclusive) => Err(SessionError::AlreadyClaimed(
                "session is in shared mode".to_string(),
            )),
        }
    }

    pub fn release(&self, agent: &AgentId) -> SessionResult<()> {
        let mut guard = self.owners.write();
        match &mut *guard {
            Owners::Exclusive(owner) if owner == agent => {
                *guard = Owners::Unclaimed;
                Ok(())
            }
            Owners::Shared(set) if set.contains(agent) => {
                set.remove(agent);
                if set.is_empty() {
                    *guard = Owners::Unclaimed;
                }
                Ok(())
            }
            _ => Err(SessionError::NotOwner(agent.0.clone())),
        }
    }

    pub fn is_claimed(&self) -> bool {
        !matches!(&*self.owners.read(), Owners::Unclaimed)
    }

    pub fn is_owner(&self, agent: &AgentId) -> bool {
        match &*self.owners.read() {
            Owners::Unclaimed => false,
            Owners::Exclusive(owner) => owner == agent,
            Owners::Shared(set) => set.contains(agent),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exclusive_claim_blocks_other_claimants_until_release() {
        let guard = OwnershipGuard::default();
        let a = AgentId::new();
        let b = AgentId::new();
        guard.claim(a.clone(), OwnerMode::Exclusive).unwrap();
        assert!(guard.claim(b.clone(), OwnerMode::Exclusive).is_err());
        assert!(guard.claim(b.clone(), OwnerMode::Shared).is_err());
        guard.release(&a).unwrap();
        assert!(guard.claim(b, OwnerMode::Exclusive).is_ok());
    }

    #[test]
    fn shared_mode_accumulates_owners() {
        let guard = OwnershipGuard::default();
        let a = AgentId::new();
        let b = AgentId::new();
        guard.claim(a.clone(), OwnerMode::Shared).unwrap();
        guard.claim(b.clone(), OwnerMode::Shared).unwrap();
        assert!(guard.is_owner(&a));
        assert!(guard.is_owner(&b));
    }
}
