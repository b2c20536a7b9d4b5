use agentspace_common::{EntityId, EntityKind, UnrecognizedCategory};

/// Errors raised by session state operations.
///
/// `DuplicateId` and `Corrupted` mean the id-uniqueness invariant was (or
/// would have been) broken upstream; callers should treat them as defects.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StateError {
    #[error("cannot add {kind}: registry already contains id {id}")]
    DuplicateId { kind: EntityKind, id: EntityId },
    #[error("{count} {kind} entries share id {id}")]
    Corrupted {
        kind: EntityKind,
        id: EntityId,
        count: usize,
    },
    #[error("{kind} {id} cannot be renamed to {new_id}")]
    IdChanged {
        kind: EntityKind,
        id: EntityId,
        new_id: EntityId,
    },
    #[error(transparent)]
    UnrecognizedCategory(#[from] UnrecognizedCategory),
}
