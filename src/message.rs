//! Deprecation messages.
//!
//! Messages are only ever created by rules while the engine runs. Once
//! recorded they are never changed; the host decides how to surface them.
use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// How serious a deprecation is. The engine does not act on the level; the
/// host refuses to start on [`DeprecationLevel::Critical`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeprecationLevel {
    #[default]
    Warning,
    Critical,
}

/// One detected use of a deprecated setting.
///
/// # Example
///
/// ```rust
/// use config_deprecation::message::{DeprecationLevel, DeprecationMessage};
///
/// let message = DeprecationMessage::builder()
///     .message("\"logging.dest\" has been deprecated")
///     .documentation_url("https://example.com/logging")
///     .level(DeprecationLevel::Warning)
///     .manual_step("Use the console appender instead.")
///     .build()?;
///
/// assert_eq!(message.manual_steps.len(), 1);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Builder)]
#[builder(setter(into))]
pub struct DeprecationMessage {
    pub message: String,

    #[builder(default, setter(into, strip_option))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation_url: Option<String>,

    #[builder(default, setter(strip_option))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<DeprecationLevel>,

    /// Steps the operator can take to resolve the deprecation.
    #[builder(default, setter(each(name = "manual_step", into)))]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub manual_steps: Vec<String>,
}

impl DeprecationMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            documentation_url: None,
            level: None,
            manual_steps: Vec::new(),
        }
    }

    pub fn builder() -> DeprecationMessageBuilder {
        DeprecationMessageBuilder::default()
    }

    /// The effective level; messages without one are warnings.
    pub fn effective_level(&self) -> DeprecationLevel {
        self.level.unwrap_or_default()
    }
}

impl From<&str> for DeprecationMessage {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for DeprecationMessage {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

/// A message as recorded by the engine, tagged with the domain (config path
/// of the contributing component, empty for the root) and the rule name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedDeprecation {
    pub domain: String,
    pub rule: String,
    #[serde(flatten)]
    pub message: DeprecationMessage,
}

impl RecordedDeprecation {
    pub fn is_critical(&self) -> bool {
        self.message.effective_level() == DeprecationLevel::Critical
    }
}
