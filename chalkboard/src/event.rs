//! Progress events emitted while a run executes.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;

use crate::message::{Message, Role};

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Termination {
    /// `idle_threshold` consecutive cycles passed with no agent acting.
    IdleStopped,
    /// `max_global_cycles` ran without an idle stop.
    BudgetExhausted,
}

impl std::fmt::Display for Termination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Termination::IdleStopped => write!(f, "idle-stopped"),
            Termination::BudgetExhausted => write!(f, "budget-exhausted"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum RunEvent {
    RunStarted {
        request: Arc<Message>,
    },
    CycleStarted {
        cycle: u32,
    },
    /// An agent's output was appended to the board.
    AgentActed {
        cycle: u32,
        role: Role,
        trigger_id: u64,
        message: Arc<Message>,
        iteration: u32,
        summary: String,
    },
    /// An act failed; nothing was appended for this turn.
    AgentFailed {
        cycle: u32,
        role: Role,
        iteration: u32,
        error: String,
    },
    CycleIdle {
        cycle: u32,
        idle_cycles: u32,
    },
    RunFinished {
        termination: Termination,
        cycles_run: u32,
    },
}

/// Optional event channel. Sending never blocks and a dropped receiver is
/// ignored.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<RunEvent>>,
}

impl EventSink {
    pub fn new(tx: mpsc::UnboundedSender<RunEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn emit(&self, event: RunEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}
