//! The unit of work a caller hands to the coordinator.

use std::future::Future;

use async_trait::async_trait;

use super::signal::CancelSignal;

/// A long-running generation routine run under admission control.
///
/// The routine receives the job's [`CancelSignal`] and must check it at safe
/// points (between diffusion steps, before expensive calls) and return early
/// once it is raised. The coordinator never stops it forcibly.
///
/// Closures of the form `|signal| async move { ... }` implement this trait, so
/// a dedicated type is only needed when the work carries its own state.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use generation_gate::core::{CancelSignal, GenerationWork};
///
/// struct Diffuse {
///     prompt: String,
///     steps: u32,
/// }
///
/// #[async_trait]
/// impl GenerationWork<Vec<u8>, PipelineError> for Diffuse {
///     async fn run(self, signal: CancelSignal) -> Result<Vec<u8>, PipelineError> {
///         let mut latents = encode(&self.prompt)?;
///         for _ in 0..self.steps {
///             signal.checkpoint().map_err(|_| PipelineError::Interrupted)?;
///             latents = denoise_step(latents).await?;
///         }
///         decode(latents)
///     }
/// }
/// ```
#[async_trait]
pub trait GenerationWork<T, E>: Send {
    /// Run to completion, or until `signal` is observed raised.
    async fn run(self, signal: CancelSignal) -> Result<T, E>;
}

#[async_trait]
impl<F, Fut, T, E> GenerationWork<T, E> for F
where
    F: FnOnce(CancelSignal) -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    async fn run(self, signal: CancelSignal) -> Result<T, E> {
        self(signal).await
    }
}
