//! The step-execution context (§5 "Step-execution context is an external
//! collaborator"): an ISR-driven consumer of planner blocks that the core
//! never calls into directly. The core only exchanges data with it through
//! this trait's lock-free-shaped surface: enqueue, a per-cycle snapshot of
//! motor position, and the two event kinds it can raise (block completion,
//! probe trigger).

use fluidnc_planner::Block;

/// Snapshot taken when a block is fully consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockCompletion {
    /// How many blocks have now been fully stepped since the engine started.
    pub blocks_consumed: u64,
}

/// Snapshot taken the instant a probe switch asserts mid-block (§4.11:
/// "the step engine snapshots `motor_steps` into `probe_steps`").
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeSnapshot {
    pub contacted: bool,
    pub motor_steps: Vec<i64>,
}

/// What the main context can ask of the step-execution context. A real
/// implementation runs on a timer ISR plus a helper thread/core and treats
/// `motor_steps` as the only data shared back, matching §5's "lock-free
/// consumer interface".
pub trait StepEngine: Send {
    /// Hand the engine the next block to consume. The engine is expected
    /// to accept it unconditionally; back-pressure is the planner ring's
    /// job (it refuses to grow past capacity), not this trait's.
    fn enqueue(&mut self, block: &Block);

    /// Current per-motor step position, read non-atomically (§5: "torn
    /// read is tolerable for status reports").
    fn motor_steps(&self) -> Vec<i64>;

    /// Drain one completed-block event, if any arrived since the last poll.
    fn poll_completion(&mut self) -> Option<BlockCompletion>;

    /// Drain one probe-trigger/probe-miss event, if a probe block is
    /// currently outstanding and reached a conclusion.
    fn poll_probe(&mut self) -> Option<ProbeSnapshot>;

    /// Drain one realtime-queue-overflow event: the engine fell behind and
    /// ran out of already-stepped blocks to consume. A critical fault (§7);
    /// the caller raises `Alarm::AbortCycle` and clears the planner.
    fn poll_queue_overflow(&mut self) -> bool;

    /// Hard-cancel: drop every queued block and come to an immediate stop
    /// (`Reset`, §5: "a hard cancel; it clears the planner").
    fn cancel_all(&mut self);

    /// Soft-cancel the currently-running block only (`JogCancel`).
    fn decelerate_current(&mut self);

    /// Whether the engine still has unconsumed blocks.
    fn is_busy(&self) -> bool;
}
