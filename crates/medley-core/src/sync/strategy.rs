//! Direction arbitration for a linked record pair.
//!
//! The reconciler gathers state and applies effects; the strategy only
//! decides which side wins. Version tokens are the sole input; wall-clock
//! timestamps never order edits.

use crate::models::SyncMeta;

/// What the reconciler should do with a linked local/remote pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    /// Both sides already agree.
    Keep,
    /// Remote wins: overwrite the replica row.
    Pull,
    /// Local wins: attempt a conditional remote update.
    Push,
}

/// Pluggable conflict arbitration.
///
/// `name` is persisted in conflict rows so a log survives strategy changes.
pub trait SyncStrategy: Send + Sync {
    fn arbitrate(&self, local: &SyncMeta, remote_version: i64) -> SyncAction;
    fn name(&self) -> &'static str;
}

/// Higher version wins; ties mean already-synced.
#[derive(Debug, Default, Clone, Copy)]
pub struct VersionedStrategy;

impl SyncStrategy for VersionedStrategy {
    fn arbitrate(&self, local: &SyncMeta, remote_version: i64) -> SyncAction {
        match local.version.cmp(&remote_version) {
            std::cmp::Ordering::Less => SyncAction::Pull,
            std::cmp::Ordering::Equal => SyncAction::Keep,
            std::cmp::Ordering::Greater => SyncAction::Push,
        }
    }

    fn name(&self) -> &'static str {
        "versioned"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LocalId, RemoteId};
    use pretty_assertions::assert_eq;

    fn meta(version: i64) -> SyncMeta {
        SyncMeta {
            local_id: LocalId::new(1),
            remote_id: Some(RemoteId::new(1)),
            version,
            is_deleted: false,
            created_at: 0,
            updated_at: 0,
            last_synced_at: None,
        }
    }

    #[test]
    fn higher_local_version_pushes() {
        assert_eq!(VersionedStrategy.arbitrate(&meta(5), 3), SyncAction::Push);
    }

    #[test]
    fn higher_remote_version_pulls() {
        assert_eq!(VersionedStrategy.arbitrate(&meta(2), 6), SyncAction::Pull);
    }

    #[test]
    fn equal_versions_keep() {
        assert_eq!(VersionedStrategy.arbitrate(&meta(4), 4), SyncAction::Keep);
    }
}
