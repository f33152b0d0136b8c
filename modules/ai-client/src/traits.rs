use anyhow::Result;
use async_trait::async_trait;

// =============================================================================
// PromptBuilder Trait
// =============================================================================

/// Single-shot completion request. Sampling knobs are optional; unset ones
/// are left out of the wire request so the provider default applies.
#[async_trait]
pub trait PromptBuilder: Send + Sized {
    fn preamble(self, preamble: impl Into<String>) -> Self;
    fn temperature(self, temperature: f32) -> Self;
    fn max_tokens(self, max_tokens: u32) -> Self;
    fn presence_penalty(self, presence_penalty: f32) -> Self;
    async fn send(self) -> Result<String>;
}
