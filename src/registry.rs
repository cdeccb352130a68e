//! Assembling the ordered rule list.
//!
//! Rules run in exactly the order they are registered: some rules are meant
//! to run after narrower ones (a blanket `xpack.monitoring` -> `monitoring`
//! rename must come after the renames of individual keys below it). The
//! [`RegistryBuilder`] collects rules from each contributing component in a
//! fixed order and [`RegistryBuilder::build`] freezes the result.
//!
//! # Example
//!
//! ```rust
//! use config_deprecation::{
//!     deprecations,
//!     factory::ConfigDeprecationFactory,
//!     registry::RegistryBuilder,
//!     rule::Deprecation,
//! };
//!
//! let registry = RegistryBuilder::new()
//!     .provider("", &|f: &ConfigDeprecationFactory| -> Vec<Deprecation> {
//!         deprecations![f.unused_from_root("optimize.lazy")]
//!     })
//!     .provider("monitoring", &|f: &ConfigDeprecationFactory| -> Vec<Deprecation> {
//!         deprecations![f.rename("enabled", "ui.enabled")]
//!     })
//!     .build();
//!
//! assert_eq!(registry.len(), 2);
//! assert_eq!(registry.domains(), vec!["", "monitoring"]);
//! ```
use std::{collections::HashSet, sync::Arc};

use tracing::{debug, warn};

use crate::{factory::ConfigDeprecationFactory, rule::Deprecation};

/// A component that contributes deprecation rules.
pub trait DeprecationProvider: Send + Sync {
    fn deprecations(&self, factory: &ConfigDeprecationFactory) -> Vec<Deprecation>;
}

impl<F> DeprecationProvider for F
where
    F: Fn(&ConfigDeprecationFactory) -> Vec<Deprecation> + Send + Sync,
{
    fn deprecations(&self, factory: &ConfigDeprecationFactory) -> Vec<Deprecation> {
        self(factory)
    }
}

/// A provider with a fixed config path, usually implemented through
/// `#[derive(Plugin)]`.
///
/// Plugins submitted with [`submit_plugin!`](crate::submit_plugin) are picked
/// up by [`RegistryBuilder::registered_plugins`] without being named by the
/// host. They are ordered by `(ORDER, PATH)`.
pub trait Plugin: DeprecationProvider + Default + 'static {
    const PATH: &'static str;
    const ORDER: u32;
}

/// A plugin descriptor collected at link time.
pub struct RegisteredPlugin {
    pub path: fn() -> &'static str,
    pub order: fn() -> u32,
    pub provider: fn() -> Box<dyn DeprecationProvider>,
}

impl RegisteredPlugin {
    pub const fn new<T: Plugin>() -> Self {
        Self {
            path: || T::PATH,
            order: || T::ORDER,
            provider: || Box::new(T::default()),
        }
    }
}

inventory::collect!(RegisteredPlugin);

#[macro_export]
macro_rules! submit_plugin {
    ($plugin_type:ty) => {
        $crate::inventory::submit! {
            $crate::registry::RegisteredPlugin::new::<$plugin_type>()
        }
    };
}

/// A rule together with the config path of the component that contributed
/// it.
#[derive(Debug)]
pub struct RegistryEntry {
    domain: String,
    deprecation: Deprecation,
}

impl RegistryEntry {
    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn deprecation(&self) -> &Deprecation {
        &self.deprecation
    }
}

/// Collects rules before they are frozen into a [`DeprecationRegistry`].
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    entries: Vec<RegistryEntry>,
    domains: HashSet<String>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the rules of `provider`, resolved against `path`.
    pub fn provider(mut self, path: impl Into<String>, provider: &dyn DeprecationProvider) -> Self {
        let factory = ConfigDeprecationFactory::new(path);
        let rules = provider.deprecations(&factory);
        debug!(
            domain = factory.path(),
            rules = rules.len(),
            "Registered config deprecations"
        );
        self.push(factory.path(), rules);
        self
    }

    /// Appends the rules of a plugin type, resolved against its path.
    pub fn plugin<T: Plugin>(self) -> Self {
        self.provider(T::PATH, &T::default())
    }

    /// Appends every plugin submitted with
    /// [`submit_plugin!`](crate::submit_plugin), ordered by order then path.
    /// A plugin whose path was already registered is skipped.
    pub fn registered_plugins(mut self) -> Self {
        let mut plugins: Vec<&RegisteredPlugin> = inventory::iter::<RegisteredPlugin>
            .into_iter()
            .collect();
        plugins.sort_by_key(|p| ((p.order)(), (p.path)()));

        for plugin in plugins {
            let path = (plugin.path)();
            if self.domains.contains(path) {
                warn!(domain = path, "Skipping plugin registered more than once");
                continue;
            }
            let provider = (plugin.provider)();
            self = self.provider(path, provider.as_ref());
        }
        self
    }

    /// Appends already built rules under `domain`.
    pub fn rules(mut self, domain: impl Into<String>, rules: Vec<Deprecation>) -> Self {
        let domain = domain.into();
        self.push(&domain, rules);
        self
    }

    fn push(&mut self, domain: &str, rules: Vec<Deprecation>) {
        self.domains.insert(domain.to_string());
        self.entries
            .extend(rules.into_iter().map(|deprecation| RegistryEntry {
                domain: domain.to_string(),
                deprecation,
            }));
    }

    pub fn build(self) -> DeprecationRegistry {
        DeprecationRegistry {
            entries: self.entries.into(),
        }
    }
}

/// The frozen, ordered rule list for one process. Cheap to clone and safe to
/// share between threads.
#[derive(Debug, Clone)]
pub struct DeprecationRegistry {
    entries: Arc<[RegistryEntry]>,
}

impl DeprecationRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// The root rules, then the bundled plugins, then every plugin submitted
    /// with [`submit_plugin!`](crate::submit_plugin).
    pub fn standard() -> Self {
        crate::builtin::bundled(RegistryBuilder::new())
            .registered_plugins()
            .build()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.entries.iter()
    }

    /// Distinct domains in registration order.
    pub fn domains(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.entries
            .iter()
            .map(RegistryEntry::domain)
            .filter(|domain| seen.insert(*domain))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deprecations;

    #[derive(Default)]
    struct Legacy;

    impl DeprecationProvider for Legacy {
        fn deprecations(&self, factory: &ConfigDeprecationFactory) -> Vec<Deprecation> {
            deprecations![factory.unused("old"), factory.rename("a", "b")]
        }
    }

    impl Plugin for Legacy {
        const PATH: &'static str = "legacy";
        const ORDER: u32 = 5;
    }

    #[test]
    fn test_entries_keep_registration_order() {
        let registry = RegistryBuilder::new()
            .plugin::<Legacy>()
            .rules("", deprecations![ConfigDeprecationFactory::new("").unused("x")])
            .build();

        let names: Vec<_> = registry.iter().map(|e| e.deprecation().name()).collect();
        assert_eq!(
            names,
            vec!["unused(legacy.old)", "rename(legacy.a -> legacy.b)", "unused(x)"]
        );
        assert_eq!(registry.domains(), vec!["legacy", ""]);
    }

    #[test]
    fn test_registry_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<DeprecationRegistry>();

        let registry = RegistryBuilder::new().plugin::<Legacy>().build();
        let clone = registry.clone();
        assert_eq!(clone.len(), registry.len());
    }

    #[test]
    fn test_empty_registry() {
        let registry = DeprecationRegistry::builder().build();
        assert!(registry.is_empty());
        assert!(registry.domains().is_empty());
    }
}
