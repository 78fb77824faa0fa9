//! Guest-side admission wait loop for anteroom.
//!
//! A guest asking to enter a room submits a `join-request` and then
//! waits for the host's decision. The transport gives at-least-once
//! semantics the cheap way — the guest resubmits on a fixed period
//! until resolved, and the server coalesces retries by the durable
//! guest id. This crate owns that loop:
//!
//! - [`RetrySchedule`] — the one schedulable, cancellable unit in the
//!   design: fires immediately, then on a fixed period, and pends
//!   forever once cancelled. The caller owns it and drives it from a
//!   `select!`, so cancellation is a synchronous method call with no
//!   task left behind to fire stale events.
//! - [`AdmissionWait`] — drives submission and filters room-wide
//!   decision broadcasts down to the one addressed to this guest, by
//!   comparing the event's guest id against its own.
//! - [`generate_guest_id`] — mints the durable identity a client keeps
//!   across reconnects.
//!
//! There is deliberately no timeout here: a request lives until the
//! host decides or the guest gives up (drops the wait). A guest whose
//! host never responds retries forever — a known usability gap of the
//! protocol, kept rather than silently papered over.

use std::time::Duration;

use anteroom_protocol::{GuestId, ServerEvent};
use rand::Rng;
use tokio::sync::mpsc;
use tokio::time::{self, Instant as TokioInstant};

/// Default resubmission period while waiting for a decision.
pub const DEFAULT_RETRY_PERIOD: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Guest identity
// ---------------------------------------------------------------------------

/// Generates a durable guest id: `g_` plus 16 hex characters
/// (64 bits of randomness).
///
/// The client mints this once and repeats it on every submission and
/// across every reconnect — it is the identity decisions are matched
/// on, precisely because the transport's connection id is not stable.
pub fn generate_guest_id() -> GuestId {
    let mut rng = rand::rng();
    let bytes: [u8; 8] = rng.random();
    let hex: String =
        bytes.iter().map(|b| format!("{b:02x}")).collect();
    GuestId::new(&format!("g_{hex}")).expect("generated id is non-empty")
}

// ---------------------------------------------------------------------------
// RetrySchedule
// ---------------------------------------------------------------------------

/// A cancellable fixed-period resubmission schedule.
///
/// The first [`wait`](Self::wait) resolves immediately (the initial
/// submission is not delayed); each subsequent one resolves `period`
/// after the previous fire. After [`cancel`](Self::cancel), `wait`
/// pends forever — inside a `select!` the other branches still run,
/// and no retry can ever fire again.
///
/// Must be created inside a Tokio runtime (it captures the current
/// instant as the first deadline).
pub struct RetrySchedule {
    period: Duration,
    /// Next fire deadline. `None` once cancelled.
    next: Option<TokioInstant>,
    fires: u64,
}

impl RetrySchedule {
    /// Creates a schedule with the given period, due immediately.
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            next: Some(TokioInstant::now()),
            fires: 0,
        }
    }

    /// Waits until the next fire is due. Returns the fire count
    /// (1 for the initial submission).
    ///
    /// Pends forever once cancelled.
    pub async fn wait(&mut self) -> u64 {
        let Some(due) = self.next else {
            std::future::pending::<()>().await;
            unreachable!()
        };
        time::sleep_until(due).await;
        self.fires += 1;
        // Schedule from now, not from the missed deadline — a slow
        // submit callback must not cause a burst of catch-up retries.
        self.next = Some(TokioInstant::now() + self.period);
        self.fires
    }

    /// Cancels the schedule. Synchronous: once this returns, no
    /// further fire can be observed.
    ///
    /// Idempotent.
    pub fn cancel(&mut self) {
        if self.next.take().is_some() {
            tracing::debug!(fires = self.fires, "retry schedule cancelled");
        }
    }

    /// Whether the schedule has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.next.is_none()
    }

    /// How many times the schedule has fired.
    pub fn fires(&self) -> u64 {
        self.fires
    }

    /// The configured resubmission period.
    pub fn period(&self) -> Duration {
        self.period
    }
}

// ---------------------------------------------------------------------------
// Wait state machine
// ---------------------------------------------------------------------------

/// The guest's admission state.
///
/// ```text
/// Idle → Requesting → Waiting → Admitted ─┐
///                        │     → Denied  ─┼→ Idle
///                        └──(abandoned)───┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitState {
    /// Not asking to enter anything.
    Idle,
    /// First submission is being sent.
    Requesting,
    /// Submitted; resubmitting on the period until a decision lands.
    Waiting,
    /// The host admitted this guest.
    Admitted,
    /// The host denied this guest.
    Denied,
}

impl WaitState {
    /// Returns `true` while a decision is still outstanding.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Requesting | Self::Waiting)
    }

    /// Returns `true` once a decision has been received.
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Admitted | Self::Denied)
    }

    /// State after a submission has been sent.
    pub fn after_submit(self) -> Self {
        match self {
            Self::Idle | Self::Requesting | Self::Waiting => Self::Waiting,
            resolved => resolved,
        }
    }

    /// State after a decision addressed to this guest arrived.
    pub fn after_decision(self, admitted: bool) -> Self {
        if admitted { Self::Admitted } else { Self::Denied }
    }
}

// ---------------------------------------------------------------------------
// AdmissionWait
// ---------------------------------------------------------------------------

/// The request a waiting guest submits, verbatim on every retry.
#[derive(Debug, Clone)]
pub struct AdmissionRequest {
    /// Raw room id as the user entered it; the server normalizes.
    pub room_id: String,
    /// The durable guest identity.
    pub guest_id: GuestId,
    /// Display name shown to the host. Unverified.
    pub guest_name: String,
}

/// How a wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The host admitted this guest.
    Admitted,
    /// The host denied this guest.
    Denied,
    /// The event stream ended before any decision (connection lost or
    /// caller tore the session down).
    Abandoned,
}

/// Drives a guest's admission wait: submit immediately, resubmit on a
/// fixed period, and resolve on the first decision carrying this
/// guest's id.
pub struct AdmissionWait {
    request: AdmissionRequest,
    schedule: RetrySchedule,
    state: WaitState,
}

impl AdmissionWait {
    /// Creates a wait with the default retry period.
    pub fn new(request: AdmissionRequest) -> Self {
        Self::with_period(request, DEFAULT_RETRY_PERIOD)
    }

    /// Creates a wait with a custom retry period.
    pub fn with_period(
        request: AdmissionRequest,
        period: Duration,
    ) -> Self {
        Self {
            request,
            schedule: RetrySchedule::new(period),
            state: WaitState::Idle,
        }
    }

    /// The current wait state.
    pub fn state(&self) -> WaitState {
        self.state
    }

    /// Runs until a decision for this guest arrives or the event
    /// stream ends.
    ///
    /// `submit` is invoked with the identical request on every fire;
    /// the server's supersede-by-guest-id coalesces the retries into a
    /// single pending entry. `events` is the room-scoped stream of
    /// server events; decisions are broadcast room-wide, so this loop
    /// filters by its own guest id and ignores everything else.
    ///
    /// Exiting for any reason cancels the schedule before returning —
    /// the schedule is owned by this task, so no retry can fire after
    /// the wait has resolved. Dropping the future mid-wait drops the
    /// schedule with it, which is equally final.
    pub async fn run<S, Fut>(
        mut self,
        mut submit: S,
        mut events: mpsc::UnboundedReceiver<ServerEvent>,
    ) -> WaitOutcome
    where
        S: FnMut(AdmissionRequest) -> Fut,
        Fut: Future<Output = ()>,
    {
        self.state = WaitState::Requesting;

        loop {
            tokio::select! {
                fire = self.schedule.wait() => {
                    tracing::debug!(
                        guest_id = %self.request.guest_id,
                        room_id = %self.request.room_id,
                        fire,
                        "submitting admission request"
                    );
                    submit(self.request.clone()).await;
                    self.state = self.state.after_submit();
                }
                ev = events.recv() => match ev {
                    Some(ServerEvent::AdmissionDecision {
                        guest_id, admitted, ..
                    }) if guest_id == self.request.guest_id => {
                        self.schedule.cancel();
                        self.state = self.state.after_decision(admitted);
                        tracing::info!(
                            guest_id = %self.request.guest_id,
                            admitted,
                            "admission decided"
                        );
                        return if admitted {
                            WaitOutcome::Admitted
                        } else {
                            WaitOutcome::Denied
                        };
                    }
                    // Someone else's decision, a replayed request, an
                    // occupancy update — not ours to act on.
                    Some(_) => {}
                    None => {
                        self.schedule.cancel();
                        tracing::debug!(
                            guest_id = %self.request.guest_id,
                            "event stream ended, abandoning wait"
                        );
                        return WaitOutcome::Abandoned;
                    }
                }
            }
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wait_state_is_pending() {
        assert!(!WaitState::Idle.is_pending());
        assert!(WaitState::Requesting.is_pending());
        assert!(WaitState::Waiting.is_pending());
        assert!(!WaitState::Admitted.is_pending());
        assert!(!WaitState::Denied.is_pending());
    }

    #[test]
    fn test_wait_state_after_submit_enters_waiting() {
        assert_eq!(WaitState::Idle.after_submit(), WaitState::Waiting);
        assert_eq!(
            WaitState::Requesting.after_submit(),
            WaitState::Waiting
        );
        assert_eq!(WaitState::Waiting.after_submit(), WaitState::Waiting);
    }

    #[test]
    fn test_wait_state_after_submit_preserves_resolution() {
        assert_eq!(
            WaitState::Admitted.after_submit(),
            WaitState::Admitted
        );
        assert_eq!(WaitState::Denied.after_submit(), WaitState::Denied);
    }

    #[test]
    fn test_wait_state_after_decision() {
        assert_eq!(
            WaitState::Waiting.after_decision(true),
            WaitState::Admitted
        );
        assert_eq!(
            WaitState::Waiting.after_decision(false),
            WaitState::Denied
        );
    }

    #[test]
    fn test_generate_guest_id_shape() {
        let id = generate_guest_id();
        let s = id.as_str();
        assert!(s.starts_with("g_"));
        assert_eq!(s.len(), 2 + 16);
        assert!(s[2..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_generate_guest_id_unique() {
        let a = generate_guest_id();
        let b = generate_guest_id();
        assert_ne!(a, b);
    }
}
