//! Deterministic generator for tests and dry runs.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use futures::{StreamExt, stream};
use parking_lot::Mutex;

use super::{FragmentStream, GenerationRequest, Generator};
use crate::error::GenerationError;
use crate::message::Role;

/// One queued reply.
#[derive(Debug, Clone)]
pub enum Script {
    /// Stream these fragments, in order.
    Reply(Vec<String>),
    /// Fail before producing a stream.
    Fail(String),
    /// Stream these fragments, then fail mid-stream.
    Truncated(Vec<String>, String),
}

/// Replays queued [`Script`]s per role. When a role's queue is empty it
/// answers with `"<role> draft <n>"` split into a few fragments.
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    queues: Mutex<HashMap<Role, VecDeque<Script>>>,
    calls: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, role: Role, script: Script) -> &Self {
        self.queues.lock().entry(role).or_default().push_back(script);
        self
    }

    pub fn reply(&self, role: Role, text: &str) -> &Self {
        self.push(role, Script::Reply(vec![text.to_string()]))
    }

    pub fn fail(&self, role: Role, reason: &str) -> &Self {
        self.push(role, Script::Fail(reason.to_string()))
    }

    /// Every request received so far, oldest first.
    pub fn calls(&self) -> Vec<GenerationRequest> {
        self.calls.lock().clone()
    }

    pub fn calls_for(&self, role: Role) -> Vec<GenerationRequest> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.role == role)
            .cloned()
            .collect()
    }
}

fn ok_items(parts: Vec<String>) -> Vec<Result<String, GenerationError>> {
    parts.into_iter().map(Ok).collect()
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<FragmentStream, GenerationError> {
        let n = {
            let mut calls = self.calls.lock();
            calls.push(request.clone());
            calls.iter().filter(|c| c.role == request.role).count()
        };
        let next = self
            .queues
            .lock()
            .get_mut(&request.role)
            .and_then(|q| q.pop_front());

        let items = match next {
            Some(Script::Fail(reason)) => return Err(GenerationError::Other(reason)),
            Some(Script::Reply(parts)) => ok_items(parts),
            Some(Script::Truncated(parts, reason)) => {
                let mut items = ok_items(parts);
                items.push(Err(GenerationError::Stream(reason)));
                items
            }
            None => ok_items(vec![
                format!("{} ", request.role),
                "draft ".to_string(),
                format!("{n}\n\nDetails follow."),
            ]),
        };
        Ok(stream::iter(items).boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::collect;

    fn request(role: Role) -> GenerationRequest {
        GenerationRequest {
            role,
            instruction: String::new(),
            context: String::new(),
        }
    }

    #[tokio::test]
    async fn falls_back_to_numbered_drafts() {
        let generator = ScriptedGenerator::new();
        let first = collect(generator.generate(&request(Role::Design)).await.unwrap()).await.unwrap();
        let second = collect(generator.generate(&request(Role::Design)).await.unwrap()).await.unwrap();
        assert!(first.starts_with("design draft 1"));
        assert!(second.starts_with("design draft 2"));
    }

    #[tokio::test]
    async fn replays_queue_in_order() {
        let generator = ScriptedGenerator::new();
        generator.reply(Role::Backend, "schema").fail(Role::Backend, "boom");

        let text = collect(generator.generate(&request(Role::Backend)).await.unwrap()).await.unwrap();
        assert_eq!(text, "schema");
        assert!(generator.generate(&request(Role::Backend)).await.is_err());
        assert_eq!(generator.calls_for(Role::Backend).len(), 2);
    }
}
