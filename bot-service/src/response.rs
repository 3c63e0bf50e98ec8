use bot_core::{ConfigError, CoreError, REDDIT_COMMENT_LIMIT};
use std::path::Path;

/// Replaced by the thread id so every reply carries its provenance.
pub const SIGNATURE_PLACEHOLDER: &str = "{signature}";

const BUILTIN_RESPONSE: &str = include_str!("response.md");

/// The canned reply posted under every eligible event.
#[derive(Debug, Clone)]
pub struct ResponseTemplate {
    text: String,
}

impl ResponseTemplate {
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_text(BUILTIN_RESPONSE)
    }

    pub fn from_text(text: impl Into<String>) -> Result<Self, ConfigError> {
        let text = text.into();

        let length = text.chars().count();
        if length >= REDDIT_COMMENT_LIMIT {
            return Err(ConfigError::ValidationFailed {
                reason: format!(
                    "response is {} characters, Reddit accepts fewer than {}",
                    length, REDDIT_COMMENT_LIMIT
                ),
            });
        }
        if !text.contains(SIGNATURE_PLACEHOLDER) {
            return Err(ConfigError::ValidationFailed {
                reason: format!("response has no {} placeholder", SIGNATURE_PLACEHOLDER),
            });
        }

        Ok(Self { text })
    }

    pub fn load(path: &Path) -> Result<Self, CoreError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.display().to_string(),
            }
            .into());
        }
        let text = std::fs::read_to_string(path)?;
        Ok(Self::from_text(text)?)
    }

    /// Built-in document unless `path` points at a replacement.
    pub fn from_path(path: Option<&Path>) -> Result<Self, CoreError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::builtin()?),
        }
    }

    pub fn render(&self, thread_id: &str) -> String {
        self.text.replace(SIGNATURE_PLACEHOLDER, thread_id)
    }

    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}
