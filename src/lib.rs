//! Configuration deprecation engine.
//!
//! Components register rules that detect deprecated settings, report them
//! and rewrite the settings tree into its supported form before anything
//! validates or reads it.
//!
//! ```rust
//! use config_deprecation::{AmbientContext, DeprecationRegistry, Value, apply_deprecations};
//!
//! let settings: Value =
//!     serde_yaml::from_str("server:\n  xsrf:\n    whitelist: [/api/a]\n").unwrap();
//! let applied = apply_deprecations(
//!     settings,
//!     &DeprecationRegistry::standard(),
//!     &AmbientContext::default(),
//! )
//! .unwrap();
//!
//! assert!(config_deprecation::path::has(&applied.settings, "server.xsrf.allowlist"));
//! assert_eq!(applied.deprecations.len(), 2);
//! ```
extern crate self as config_deprecation;

pub mod atomic;
pub mod builtin;
pub mod context;
pub mod engine;
pub mod error;
pub mod factory;
pub mod loader;
pub mod message;
pub mod path;
pub mod registry;
pub mod report;
pub mod rule;
pub mod service;
pub mod value;

pub use context::AmbientContext;
pub use engine::{AppliedDeprecations, DeprecationEngine, apply_deprecations};
pub use error::Error;
pub use factory::ConfigDeprecationFactory;
pub use message::{DeprecationLevel, DeprecationMessage, RecordedDeprecation};
pub use registry::{DeprecationProvider, DeprecationRegistry, Plugin, RegistryBuilder};
pub use report::{CheckOptions, CheckOutcome, ReportFormat, check};
pub use rule::{ConfigDeprecation, Deprecation, DeprecationCollector, DeprecationContext};
pub use service::{ConfigService, ValidatedSettings};
pub use value::{Mapping, Value};

// re-export derive macro
pub use config_deprecation_macros::Plugin;

#[doc(hidden)]
pub use inventory;
