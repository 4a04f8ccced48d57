//! Agents: one role, its trigger state machine, and its runtime counters.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::board::Board;
use crate::capability::CapabilityDescriptor;
use crate::error::GenerationError;
use crate::generate::{self, Generator};
use crate::message::{Author, Category, Message, Role};
use crate::prompt;
use crate::retry::RetryPolicy;

/// Outcome of evaluating an agent against the board.
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerState {
    /// The upstream category has not appeared yet.
    AwaitingUpstream,
    /// Upstream exists and the agent has not produced anything: react to it.
    FirstResponse(Arc<Message>),
    /// The agent has output and budget left: revise its latest output.
    Refining(Arc<Message>),
    /// Budget spent. Permanent for the rest of the run.
    Exhausted,
}

impl TriggerState {
    /// The message to react to, if the agent should act.
    pub fn message(&self) -> Option<&Arc<Message>> {
        match self {
            TriggerState::FirstResponse(m) | TriggerState::Refining(m) => Some(m),
            TriggerState::AwaitingUpstream | TriggerState::Exhausted => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TriggerState::AwaitingUpstream => "awaiting-upstream",
            TriggerState::FirstResponse(_) => "first-response",
            TriggerState::Refining(_) => "refining",
            TriggerState::Exhausted => "exhausted",
        }
    }
}

/// Act output, not yet on the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub author: Author,
    pub category: Category,
    pub content: String,
}

/// Per-act knobs supplied by the coordinator.
#[derive(Debug, Clone)]
pub struct ActOptions {
    pub summary_max_len: usize,
    pub retry: RetryPolicy,
    pub timeout: Option<Duration>,
}

/// Mutable per-run state of one agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentState {
    pub iteration_count: u32,
    pub iteration_budget: u32,
    pub last_output_summary: Option<String>,
    pub last_category: Option<Category>,
}

#[derive(Debug)]
pub struct Agent {
    role: Role,
    capability: &'static CapabilityDescriptor,
    state: AgentState,
}

impl Agent {
    pub fn new(role: Role, iteration_budget: u32) -> Self {
        Self {
            role,
            capability: CapabilityDescriptor::for_role(role),
            state: AgentState {
                iteration_count: 0,
                iteration_budget,
                last_output_summary: None,
                last_category: None,
            },
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn capability(&self) -> &'static CapabilityDescriptor {
        self.capability
    }

    pub fn state(&self) -> &AgentState {
        &self.state
    }

    pub fn is_exhausted(&self) -> bool {
        self.state.iteration_count >= self.state.iteration_budget
    }

    /// Decide whether to act and on which message. Pure: reads the board,
    /// changes nothing.
    pub fn evaluate(&self, board: &Board) -> TriggerState {
        if self.is_exhausted() {
            return TriggerState::Exhausted;
        }
        if let Some(own) = board.latest(self.role.output()) {
            return TriggerState::Refining(own);
        }
        match board.latest(self.role.upstream()) {
            Some(upstream) => TriggerState::FirstResponse(upstream),
            None => TriggerState::AwaitingUpstream,
        }
    }

    /// Count one iteration. Called by the coordinator once [`Agent::act`] has
    /// returned a draft; failed acts leave the count alone.
    pub(crate) fn complete_iteration(&mut self) {
        self.state.iteration_count += 1;
    }

    /// Clear counters and summary for a fresh run.
    pub fn reset(&mut self) {
        self.state.iteration_count = 0;
        self.state.last_output_summary = None;
        self.state.last_category = None;
    }

    /// Produce this agent's next artifact in response to `trigger`.
    ///
    /// The board is only read; the caller posts the returned draft. On
    /// success the agent's summary is refreshed.
    pub async fn act(
        &mut self,
        trigger: &Message,
        board: &Board,
        generator: &dyn Generator,
        options: &ActOptions,
    ) -> Result<Draft, GenerationError> {
        let request = prompt::build(self.role, trigger, board);
        let max_attempts = options.retry.max_attempts.max(1);
        let mut failures = 0;

        let content = loop {
            let attempt = async {
                let stream = generator.generate(&request).await?;
                generate::collect(stream).await
            };
            let result = match options.timeout {
                Some(limit) => tokio::time::timeout(limit, attempt)
                    .await
                    .unwrap_or_else(|_| Err(GenerationError::Timeout(limit))),
                None => attempt.await,
            };
            match result {
                Ok(text) => break text,
                Err(e) => {
                    failures += 1;
                    if failures >= max_attempts {
                        return Err(e);
                    }
                    let delay = options.retry.delay_after(failures);
                    tracing::warn!(
                        role = %self.role,
                        error = %e,
                        attempt = failures,
                        delay_ms = delay.as_millis() as u64,
                        "Generation failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        };

        self.state.last_output_summary = Some(summarize(&content, options.summary_max_len));
        self.state.last_category = Some(self.role.output());
        Ok(Draft {
            author: Author::Agent(self.role),
            category: self.role.output(),
            content,
        })
    }
}

/// First non-blank line of `text`, cut to `max_len` characters with a `...`
/// marker when it is longer.
pub fn summarize(text: &str, max_len: usize) -> String {
    let line = text
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("");
    if line.chars().count() <= max_len {
        return line.to_string();
    }
    if max_len <= 3 {
        return "...".chars().take(max_len).collect();
    }
    let head: String = line.chars().take(max_len - 3).collect();
    format!("{head}...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::{Script, ScriptedGenerator};

    fn options() -> ActOptions {
        ActOptions {
            summary_max_len: 20,
            retry: RetryPolicy::none(),
            timeout: None,
        }
    }

    #[test]
    fn trigger_walks_through_states() {
        let mut board = Board::new();
        let mut agent = Agent::new(Role::Frontend, 2);
        assert_eq!(agent.evaluate(&board), TriggerState::AwaitingUpstream);

        board.post(Author::Initiator, Category::Request, "app".into());
        assert_eq!(agent.evaluate(&board), TriggerState::AwaitingUpstream);

        let spec = board.post(Author::Agent(Role::Design), Category::DesignSpec, "spec".into());
        assert_eq!(agent.evaluate(&board), TriggerState::FirstResponse(spec));

        agent.complete_iteration();
        let plan = board.post(Author::Agent(Role::Frontend), Category::FrontendPlan, "plan".into());
        assert_eq!(agent.evaluate(&board), TriggerState::Refining(plan));

        agent.complete_iteration();
        assert_eq!(agent.evaluate(&board), TriggerState::Exhausted);
    }

    #[test]
    fn first_response_picks_newest_upstream() {
        let mut board = Board::new();
        board.post(Author::Initiator, Category::Request, "old".into());
        let newest = board.post(Author::Initiator, Category::Request, "new".into());
        let agent = Agent::new(Role::Design, 1);
        match agent.evaluate(&board) {
            TriggerState::FirstResponse(m) => assert_eq!(m.id, newest.id),
            other => panic!("expected first response, got {other:?}"),
        }
    }

    #[test]
    fn reset_clears_counters() {
        let mut agent = Agent::new(Role::Design, 1);
        agent.complete_iteration();
        assert!(agent.is_exhausted());
        agent.reset();
        assert_eq!(agent.state().iteration_count, 0);
        assert!(!agent.is_exhausted());
    }

    #[tokio::test]
    async fn act_returns_draft_and_updates_summary() {
        let mut board = Board::new();
        let request = board.post(Author::Initiator, Category::Request, "app".into());
        let generator = ScriptedGenerator::new();
        generator.push(
            Role::Design,
            Script::Reply(vec!["\n\n  # Habit tracker ".into(), "design\nmore".into()]),
        );

        let mut agent = Agent::new(Role::Design, 3);
        let draft = agent.act(&request, &board, &generator, &options()).await.unwrap();
        assert_eq!(draft.author, Author::Agent(Role::Design));
        assert_eq!(draft.category, Category::DesignSpec);
        assert_eq!(draft.content, "# Habit tracker design\nmore");
        assert_eq!(agent.state().last_output_summary.as_deref(), Some("# Habit tracker d..."));
        assert_eq!(board.log().len(), 1);
    }

    #[tokio::test]
    async fn act_retries_then_succeeds() {
        let mut board = Board::new();
        let request = board.post(Author::Initiator, Category::Request, "app".into());
        let generator = ScriptedGenerator::new();
        generator.fail(Role::Design, "503").reply(Role::Design, "ok");

        let mut opts = options();
        opts.retry = RetryPolicy {
            max_attempts: 2,
            initial_delay: Duration::ZERO,
            ..RetryPolicy::default()
        };
        let mut agent = Agent::new(Role::Design, 3);
        let draft = agent.act(&request, &board, &generator, &opts).await.unwrap();
        assert_eq!(draft.content, "ok");
        assert_eq!(generator.calls_for(Role::Design).len(), 2);
    }

    #[tokio::test]
    async fn act_failure_leaves_summary_untouched() {
        let mut board = Board::new();
        let request = board.post(Author::Initiator, Category::Request, "app".into());
        let generator = ScriptedGenerator::new();
        generator.push(Role::Design, Script::Truncated(vec!["half".into()], "reset".into()));

        let mut agent = Agent::new(Role::Design, 3);
        let err = agent.act(&request, &board, &generator, &options()).await.unwrap_err();
        assert!(matches!(err, GenerationError::Stream(_)));
        assert!(agent.state().last_output_summary.is_none());
    }

    #[test]
    fn summary_truncates_to_exact_length() {
        let long = format!("\n   \n{}\nsecond line", "x".repeat(100));
        let summary = summarize(&long, 40);
        assert_eq!(summary.chars().count(), 40);
        assert_eq!(summary, format!("{}...", "x".repeat(37)));
    }

    #[test]
    fn summary_keeps_short_lines_and_counts_chars() {
        assert_eq!(summarize("  short  \nrest", 40), "short");
        assert_eq!(summarize("", 10), "");
        let accented = "é".repeat(12);
        assert_eq!(summarize(&accented, 10), format!("{}...", "é".repeat(7)));
    }
}
