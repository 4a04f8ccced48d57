//! The generation collaborator: whatever turns a prompt into artifact text.
//!
//! Output arrives as a stream of fragments. A stream is consumed once; to
//! retry, call [`Generator::generate`] again.

mod anthropic;
mod scripted;

pub use anthropic::{AnthropicGenerator, DEFAULT_API_URL, DEFAULT_MODEL};
pub use scripted::{Script, ScriptedGenerator};

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;

use crate::error::GenerationError;
use crate::message::Role;

/// Text fragments in arrival order.
pub type FragmentStream = BoxStream<'static, Result<String, GenerationError>>;

/// Prompt for one act.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub role: Role,
    /// Role-specific system instruction.
    pub instruction: String,
    /// Board context: capability, trigger, request and related artifacts.
    pub context: String,
}

#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<FragmentStream, GenerationError>;
}

/// Drain a fragment stream into the final artifact text.
///
/// Fragments are concatenated in order and the result trimmed. Whitespace-only
/// output is an error.
pub async fn collect(mut stream: FragmentStream) -> Result<String, GenerationError> {
    let mut text = String::new();
    while let Some(fragment) = stream.next().await {
        text.push_str(&fragment?);
    }
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(GenerationError::Empty);
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn fragments(parts: &[&str]) -> FragmentStream {
        let items: Vec<Result<String, GenerationError>> =
            parts.iter().map(|p| Ok(p.to_string())).collect();
        stream::iter(items).boxed()
    }

    #[tokio::test]
    async fn collect_concatenates_and_trims() {
        let text = collect(fragments(&["\n  Hel", "lo ", "wor", "ld \n\n"])).await.unwrap();
        assert_eq!(text, "Hello world");
    }

    #[tokio::test]
    async fn collect_rejects_blank_output() {
        let err = collect(fragments(&[" ", "\n\t"])).await.unwrap_err();
        assert!(matches!(err, GenerationError::Empty));
    }

    #[tokio::test]
    async fn collect_stops_at_first_error() {
        let items = vec![
            Ok("partial".to_string()),
            Err(GenerationError::Stream("cut off".into())),
            Ok("never".to_string()),
        ];
        let err = collect(stream::iter(items).boxed()).await.unwrap_err();
        assert!(matches!(err, GenerationError::Stream(_)));
    }
}
