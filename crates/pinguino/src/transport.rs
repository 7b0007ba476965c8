use crate::{Assignment, MoveCommand, PlayerId, Result};
use core::future::Future;

/// Client-side handle to a worker process.
///
/// The coordinator uses it for heartbeat probes; player agents use it for
/// move submission. Handles are cloned into background tasks, so they must
/// be cheap to clone and `'static`.
///
/// Delivery guarantees behind [`fast_move`] and [`stable_move`] are the
/// worker's responsibility. This trait only separates the two paths.
///
/// [`fast_move`]: WorkerTransport::fast_move
/// [`stable_move`]: WorkerTransport::stable_move
pub trait WorkerTransport: Clone + Send + Sync + 'static {
    /// Liveness probe. `Ok` means the worker acknowledged.
    fn heartbeat(&self) -> impl Future<Output = Result<()>> + Send;

    /// Best-effort, latency-optimised move submission.
    fn fast_move(&self, command: MoveCommand) -> impl Future<Output = Result<()>> + Send;

    /// Move submission that waits for the worker's durable acknowledgement.
    fn stable_move(&self, command: MoveCommand) -> impl Future<Output = Result<()>> + Send;
}

/// Client-side handle to the coordinator, as seen by a player agent.
pub trait CoordinatorTransport: Send + Sync + 'static {
    /// Requests (or re-reads) the player's region assignment.
    ///
    /// An unsuccessful reply surfaces as [`Error::NoRegions`]; an unreachable
    /// coordinator as [`Error::Transport`].
    ///
    /// [`Error::NoRegions`]: crate::Error::NoRegions
    /// [`Error::Transport`]: crate::Error::Transport
    fn assign_player_to_region(
        &self,
        player: &PlayerId,
    ) -> impl Future<Output = Result<Assignment>> + Send;
}
