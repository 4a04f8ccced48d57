//! Coordinator: drives agents through discrete cycles over one board.
//!
//! Each cycle visits agents in [`Role::ORDER`]. Every evaluation sees the
//! board as it stands at that moment, so a later agent can react within the
//! same cycle to what an earlier one just posted. Acts are awaited one at a
//! time; the pipeline holds the only mutable reference to the board.

use std::sync::Arc;

use serde::Serialize;

use crate::agent::{ActOptions, Agent, TriggerState};
use crate::board::Board;
use crate::config::RunConfig;
use crate::error::RunError;
use crate::event::{EventSink, RunEvent, Termination};
use crate::generate::Generator;
use crate::message::{Author, Category, Message, Role};
use crate::pacing::{NoDelay, Pacing};

/// Result of one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// At least one agent appended a message.
    Progressed { acted: usize },
    /// Nobody appended anything; the run continues.
    Idle { idle_cycles: u32 },
    /// The run is over.
    Finished(Termination),
}

/// Final state of one agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentReport {
    pub role: Role,
    pub iteration_count: u32,
    pub iteration_budget: u32,
    pub last_category: Option<Category>,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub termination: Termination,
    pub cycles_run: u32,
    /// Every message of the run in append order.
    pub board: Vec<Arc<Message>>,
    pub agents: Vec<AgentReport>,
}

/// One run's state: the board, the agents, and the termination counters.
#[derive(Debug)]
pub struct Pipeline {
    board: Board,
    agents: Vec<Agent>,
    config: RunConfig,
    options: ActOptions,
    events: EventSink,
    cycle: u32,
    idle_cycles: u32,
    termination: Option<Termination>,
}

impl Pipeline {
    /// Validate inputs and seed a fresh board with `request`.
    ///
    /// Rejected requests never create a board and consume no cycle.
    pub fn new(request: &str, config: RunConfig) -> Result<Self, RunError> {
        let request = request.trim();
        if request.is_empty() {
            return Err(RunError::EmptyRequest);
        }
        config.validate()?;

        let mut board = Board::new();
        board.post(Author::Initiator, Category::Request, request.to_string());

        let agents = Role::ORDER
            .iter()
            .map(|role| Agent::new(*role, config.budgets.for_role(*role)))
            .collect();
        let options = ActOptions {
            summary_max_len: config.summary_max_len,
            retry: config.retry.clone(),
            timeout: config.act_timeout,
        };

        Ok(Self {
            board,
            agents,
            config,
            options,
            events: EventSink::none(),
            cycle: 0,
            idle_cycles: 0,
            termination: None,
        })
    }

    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn agent(&self, role: Role) -> Option<&Agent> {
        self.agents.iter().find(|a| a.role() == role)
    }

    /// Cycles completed so far.
    pub fn cycle(&self) -> u32 {
        self.cycle
    }

    pub fn idle_cycles(&self) -> u32 {
        self.idle_cycles
    }

    pub fn termination(&self) -> Option<Termination> {
        self.termination
    }

    /// Run one full cycle over every agent in order.
    pub async fn run_cycle(&mut self, generator: &dyn Generator) -> CycleOutcome {
        if let Some(termination) = self.termination {
            return CycleOutcome::Finished(termination);
        }

        self.cycle += 1;
        let cycle = self.cycle;
        self.events.emit(RunEvent::CycleStarted { cycle });

        let mut acted = 0;
        for agent in self.agents.iter_mut() {
            let role = agent.role();
            let trigger = match agent.evaluate(&self.board) {
                state @ (TriggerState::AwaitingUpstream | TriggerState::Exhausted) => {
                    tracing::debug!(cycle, role = %role, state = state.label(), "Skipping agent");
                    continue;
                }
                TriggerState::FirstResponse(m) | TriggerState::Refining(m) => m,
            };

            let iteration = agent.state().iteration_count + 1;

            match agent.act(&trigger, &self.board, generator, &self.options).await {
                Ok(draft) => {
                    agent.complete_iteration();
                    let message = self.board.post(draft.author, draft.category, draft.content);
                    let summary = agent.state().last_output_summary.clone().unwrap_or_default();
                    tracing::info!(
                        cycle,
                        role = %role,
                        iteration,
                        trigger_id = trigger.id,
                        message_id = message.id,
                        "Agent posted {}",
                        message.category
                    );
                    self.events.emit(RunEvent::AgentActed {
                        cycle,
                        role,
                        trigger_id: trigger.id,
                        message,
                        iteration,
                        summary,
                    });
                    acted += 1;
                }
                Err(e) => {
                    tracing::warn!(cycle, role = %role, iteration, error = %e, "Agent act failed");
                    self.events.emit(RunEvent::AgentFailed {
                        cycle,
                        role,
                        iteration,
                        error: e.to_string(),
                    });
                }
            }
        }

        let outcome = if acted > 0 {
            self.idle_cycles = 0;
            CycleOutcome::Progressed { acted }
        } else {
            self.idle_cycles += 1;
            self.events.emit(RunEvent::CycleIdle {
                cycle,
                idle_cycles: self.idle_cycles,
            });
            CycleOutcome::Idle {
                idle_cycles: self.idle_cycles,
            }
        };

        if self.idle_cycles >= self.config.idle_threshold {
            return self.finish(Termination::IdleStopped);
        }
        if cycle >= self.config.max_global_cycles {
            return self.finish(Termination::BudgetExhausted);
        }
        outcome
    }

    fn finish(&mut self, termination: Termination) -> CycleOutcome {
        self.termination = Some(termination);
        tracing::info!(
            cycles = self.cycle,
            messages = self.board.log().len(),
            %termination,
            "Run finished"
        );
        self.events.emit(RunEvent::RunFinished {
            termination,
            cycles_run: self.cycle,
        });
        CycleOutcome::Finished(termination)
    }

    /// Summarise the run. `None` until the run has terminated.
    pub fn report(&self) -> Option<RunReport> {
        self.termination.map(|termination| self.report_as(termination))
    }

    fn report_as(&self, termination: Termination) -> RunReport {
        RunReport {
            termination,
            cycles_run: self.cycle,
            board: self.board.log().all().to_vec(),
            agents: self
                .agents
                .iter()
                .map(|a| AgentReport {
                    role: a.role(),
                    iteration_count: a.state().iteration_count,
                    iteration_budget: a.state().iteration_budget,
                    last_category: a.state().last_category,
                    summary: a.state().last_output_summary.clone(),
                })
                .collect(),
        }
    }
}

/// Runs pipelines to completion with a shared generator and pacing policy.
pub struct Coordinator {
    generator: Arc<dyn Generator>,
    pacing: Arc<dyn Pacing>,
    config: RunConfig,
    events: EventSink,
}

impl Coordinator {
    pub fn new(generator: Arc<dyn Generator>, config: RunConfig) -> Self {
        Self {
            generator,
            pacing: Arc::new(NoDelay),
            config,
            events: EventSink::none(),
        }
    }

    pub fn with_pacing(mut self, pacing: impl Pacing + 'static) -> Self {
        self.pacing = Arc::new(pacing);
        self
    }

    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run one request from a fresh board until it terminates.
    pub async fn run(&self, request: &str) -> Result<RunReport, RunError> {
        let mut pipeline =
            Pipeline::new(request, self.config.clone())?.with_events(self.events.clone());

        if let Some(seed) = pipeline.board().request() {
            tracing::info!(
                request_id = seed.id,
                max_cycles = self.config.max_global_cycles,
                idle_threshold = self.config.idle_threshold,
                "Run started"
            );
            self.events.emit(RunEvent::RunStarted { request: seed });
        }

        let termination = loop {
            match pipeline.run_cycle(self.generator.as_ref()).await {
                CycleOutcome::Finished(termination) => break termination,
                CycleOutcome::Progressed { .. } | CycleOutcome::Idle { .. } => {
                    self.pacing.pause(pipeline.cycle()).await;
                }
            }
        };

        Ok(pipeline.report_as(termination))
    }
}
