//! chalkboard: a blackboard coordination engine for cooperating LLM agents.
//!
//! A run starts from one operator request posted to a fresh [`Board`].
//! The [`Coordinator`] then cycles through a fixed set of agents:
//! - Design: turns the request into a design spec
//! - Frontend: plans the client from the design spec
//! - Backend: plans the server from the design spec
//!
//! Each agent refines its own output until its iteration budget is spent.
//! A run stops after a number of consecutive idle cycles or when the global
//! cycle budget runs out.

pub mod agent;
pub mod board;
pub mod capability;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod event;
pub mod generate;
pub mod message;
pub mod pacing;
pub mod prompt;
pub mod retry;

pub use board::Board;
pub use config::{Budgets, RunConfig};
pub use coordinator::{Coordinator, CycleOutcome, Pipeline, RunReport};
pub use error::{GenerationError, RunError};
pub use event::{EventSink, RunEvent, Termination};
pub use message::{Author, Category, Message, Role};
