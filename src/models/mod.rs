pub mod mutation;
pub mod sync;

pub use mutation::{
    BagRegistration, Collection, MutationKind, MutationPayload, Payload, PointsAward,
    QueuedMutation, RewardRedemption,
};
pub use sync::{FlushOutcome, FlushReport, SyncState, WriteResponse};
