//! Remote model provider implementations

pub mod gemini;
pub mod translate;

pub use gemini::{AuthMode, GeminiClient};
pub use translate::TranslateClient;
