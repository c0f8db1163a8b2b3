//! Pause registry
//!
//! Shared between the kill-switch governance, which writes to it when a
//! council round completes, and every ledger component, which consults it
//! before mutating state.

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use crate::error::LedgerError;
use crate::types::principal::ResourceId;

/// Set of currently paused resources
#[derive(Debug, Default, Clone)]
pub struct PauseRegistry {
    paused: Arc<RwLock<BTreeSet<ResourceId>>>,
}

impl PauseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pause a resource. Returns `false` if it was already paused.
    pub fn pause(&self, resource: &ResourceId) -> bool {
        let inserted = self.paused.write().insert(resource.clone());
        if inserted {
            info!(resource = %resource, "Resource paused");
        }
        inserted
    }

    /// Resume a resource. Returns `false` if it was not paused.
    pub fn unpause(&self, resource: &ResourceId) -> bool {
        let removed = self.paused.write().remove(resource);
        if removed {
            info!(resource = %resource, "Resource unpaused");
        }
        removed
    }

    pub fn is_paused(&self, resource: &ResourceId) -> bool {
        self.paused.read().contains(resource)
    }

    /// Fail with [`LedgerError::Paused`] if the resource is paused
    pub fn ensure_active(&self, resource: &ResourceId) -> Result<(), LedgerError> {
        if self.is_paused(resource) {
            return Err(LedgerError::Paused {
                resource: resource.to_string(),
            });
        }
        Ok(())
    }

    /// Snapshot of paused resources, sorted
    pub fn paused(&self) -> Vec<ResourceId> {
        self.paused.read().iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pause_unpause() {
        let registry = PauseRegistry::new();
        let token = ResourceId::new("0xtoken").unwrap();

        assert!(registry.ensure_active(&token).is_ok());
        assert!(registry.pause(&token));
        assert!(!registry.pause(&token));
        assert!(registry.is_paused(&token));
        assert!(matches!(
            registry.ensure_active(&token),
            Err(LedgerError::Paused { .. })
        ));

        assert!(registry.unpause(&token));
        assert!(!registry.unpause(&token));
        assert!(registry.paused().is_empty());
    }

    #[test]
    fn test_clones_share_state() {
        let registry = PauseRegistry::new();
        let view = registry.clone();
        let token = ResourceId::new("0xtoken").unwrap();

        registry.pause(&token);
        assert!(view.is_paused(&token));
        assert_eq!(view.paused(), vec![token]);
    }
}
