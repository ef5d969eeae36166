//! Three-state run lifecycle.
//!
//! `Idle -> Analyzing -> Complete`, with `Analyzing -> Idle` on a fatal
//! extraction failure. A run is represented by a [`RunTicket`] that only
//! [`RunStateMachine::begin_run`] can mint, and only outside `Analyzing`.
//! Finishing or aborting consumes the ticket.

use vrev_models::PipelineState;

/// Proof that a batch run owns the `Analyzing` state.
#[derive(Debug, PartialEq, Eq)]
pub struct RunTicket {
    epoch: u64,
    run_id: String,
}

impl RunTicket {
    pub fn run_id(&self) -> &str {
        &self.run_id
    }
}

#[derive(Debug, Default)]
pub struct RunStateMachine {
    state: PipelineState,
    epoch: u64,
}

impl RunStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Enter `Analyzing`. Returns `None` while a run is already active.
    pub fn begin_run(&mut self) -> Option<RunTicket> {
        if self.state == PipelineState::Analyzing {
            return None;
        }
        self.epoch += 1;
        self.state = PipelineState::Analyzing;
        Some(RunTicket {
            epoch: self.epoch,
            run_id: uuid::Uuid::new_v4().to_string(),
        })
    }

    /// `Analyzing -> Complete`. False if the ticket was superseded.
    pub fn complete(&mut self, ticket: RunTicket) -> bool {
        self.exit(ticket, PipelineState::Complete)
    }

    /// `Analyzing -> Idle`. False if the ticket was superseded.
    pub fn abort(&mut self, ticket: RunTicket) -> bool {
        self.exit(ticket, PipelineState::Idle)
    }

    /// Back to `Idle` for a new or removed video; outstanding tickets go stale.
    pub fn reset(&mut self) {
        self.epoch += 1;
        self.state = PipelineState::Idle;
    }

    fn exit(&mut self, ticket: RunTicket, to: PipelineState) -> bool {
        if ticket.epoch != self.epoch || self.state != PipelineState::Analyzing {
            return false;
        }
        self.state = to;
        true
    }
}
