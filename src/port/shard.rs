use crate::domain::UserId;

/// Maps a user id to the storage shard holding their rows.
///
/// A single shard is the common case, but the state machine's transactional
/// guarantees hold per shard, so the indirection stays explicit: anything
/// that must commit atomically has to land on the shards this router names.
pub trait ShardRouter: Send + Sync {
    fn shard_count(&self) -> usize;

    fn resolve(&self, user_id: &UserId) -> usize;
}
