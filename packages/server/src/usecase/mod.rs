//! UseCase layer.

mod broadcast;

pub use broadcast::{BroadcastReport, BroadcastUseCase};
