use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization: {0}")]
    Serialization(#[from] serde_value::SerializerError),

    #[error("YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML Serialization: {0}")]
    TomlSerialization(#[from] toml::ser::Error),

    #[error("TOML Deserialization: {0}")]
    TomlDeserialization(#[from] toml::de::Error),

    /// A dotted path could not be used to address the settings tree.
    ///
    /// Returned by [`path::set`](crate::path::set) when a path contains an
    /// empty segment such as `"server..port"`.
    #[error("Invalid path \"{path}\": {reason}")]
    InvalidPath { path: String, reason: String },

    /// A rule found a value whose shape it cannot interpret.
    ///
    /// This is a structural failure, not a deprecation: the engine aborts
    /// and the host must refuse to start.
    #[error("Unexpected value at \"{path}\": expected {expected}, found {found}")]
    UnexpectedType {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A rule failed while being applied. Wraps the rule's own error with
    /// the domain and rule that raised it.
    #[error("Deprecation rule \"{rule}\" of [{domain}] failed: {source}")]
    Rule {
        domain: String,
        rule: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Deprecation message: {0}")]
    Message(#[from] crate::message::DeprecationMessageBuilderError),

    #[error("Unsupported settings format: {0}")]
    UnsupportedFormat(String),

    /// A command-line override was not of the form `key.path=value`.
    #[error("Invalid override \"{0}\", expected key=value")]
    InvalidOverride(String),

    /// Writing the rewritten settings back was requested for an input it
    /// cannot be written to unambiguously.
    #[error("Cannot write rewritten settings back: {0}")]
    WriteRejected(&'static str),

    /// The host policy refused the settings because at least one
    /// critical-level deprecation was reported.
    #[error("{0} critical deprecation(s) must be resolved before startup")]
    CriticalDeprecations(usize),
}
