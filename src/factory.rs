//! Declarative rule factories.
//!
//! Every rule carries its base path explicitly. A factory is bound to the
//! config path of the component that uses it: [`ConfigDeprecationFactory::rename`]
//! and [`ConfigDeprecationFactory::unused`] resolve paths below that base,
//! while the `*_from_root` variants resolve paths from the root of the tree.
use crate::{
    error::Error,
    message::{DeprecationLevel, DeprecationMessage},
    path,
    rule::{ConfigDeprecation, CustomDeprecation, DeprecationCollector, DeprecationContext},
    value::Value,
};

/// Moves a setting to its new location.
#[derive(Debug, Clone)]
pub struct RenameDeprecation {
    name: String,
    base: String,
    old_path: String,
    new_path: String,
    level: Option<DeprecationLevel>,
    documentation_url: Option<String>,
}

impl RenameDeprecation {
    /// `old_key` and `new_key` are relative to `base`; an empty base means
    /// the root of the settings tree.
    pub fn new(base: impl Into<String>, old_key: &str, new_key: &str) -> Self {
        let base = base.into();
        let old_path = path::join(&base, old_key);
        let new_path = path::join(&base, new_key);
        Self {
            name: format!("rename({old_path} -> {new_path})"),
            base,
            old_path,
            new_path,
            level: None,
            documentation_url: None,
        }
    }

    pub fn level(mut self, level: DeprecationLevel) -> Self {
        self.level = Some(level);
        self
    }

    pub fn documentation_url(mut self, url: impl Into<String>) -> Self {
        self.documentation_url = Some(url.into());
        self
    }

    pub fn old_path(&self) -> &str {
        &self.old_path
    }

    pub fn new_path(&self) -> &str {
        &self.new_path
    }
}

impl ConfigDeprecation for RenameDeprecation {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(
        &self,
        settings: &mut Value,
        _ctx: &DeprecationContext<'_>,
        collector: &mut DeprecationCollector<'_>,
    ) -> Result<(), Error> {
        let Some(old_value) = path::unset_pruning(settings, &self.old_path, &self.base) else {
            return Ok(());
        };

        let (old, new) = (&self.old_path, &self.new_path);
        let conflict = path::has(settings, new);
        if !conflict {
            path::set(settings, new, old_value)?;
        }

        let mut message = DeprecationMessage::builder();
        if conflict {
            message
                .message(format!(
                    "\"{old}\" is deprecated and has been replaced by \"{new}\". \
                     However both keys are present, ignoring \"{old}\""
                ))
                .manual_step(format!(
                    "Make sure \"{new}\" contains the correct value in the config file."
                ))
                .manual_step(format!("Remove \"{old}\" from the config."));
        } else {
            message
                .message(format!(
                    "\"{old}\" is deprecated and has been replaced by \"{new}\""
                ))
                .manual_step(format!("Replace \"{old}\" with \"{new}\" in the config file."));
        }

        if let Some(level) = self.level {
            message.level(level);
        }
        if let Some(url) = &self.documentation_url {
            message.documentation_url(url.clone());
        }
        collector.add(message.build()?);
        Ok(())
    }
}

/// Reports a setting that no longer has any effect. The tree is left as is.
#[derive(Debug, Clone)]
pub struct UnusedDeprecation {
    name: String,
    path: String,
    level: Option<DeprecationLevel>,
    documentation_url: Option<String>,
}

impl UnusedDeprecation {
    pub fn new(base: &str, key: &str) -> Self {
        let path = path::join(base, key);
        Self {
            name: format!("unused({path})"),
            path,
            level: None,
            documentation_url: None,
        }
    }

    pub fn level(mut self, level: DeprecationLevel) -> Self {
        self.level = Some(level);
        self
    }

    pub fn documentation_url(mut self, url: impl Into<String>) -> Self {
        self.documentation_url = Some(url.into());
        self
    }
}

impl ConfigDeprecation for UnusedDeprecation {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(
        &self,
        settings: &mut Value,
        _ctx: &DeprecationContext<'_>,
        collector: &mut DeprecationCollector<'_>,
    ) -> Result<(), Error> {
        if !path::has(settings, &self.path) {
            return Ok(());
        }

        let mut message = DeprecationMessage::builder();
        message
            .message(format!("\"{}\" is deprecated and is no longer used", self.path))
            .manual_step(format!("Remove \"{}\" from the config.", self.path));
        if let Some(level) = self.level {
            message.level(level);
        }
        if let Some(url) = &self.documentation_url {
            message.documentation_url(url.clone());
        }
        collector.add(message.build()?);
        Ok(())
    }
}

/// Creates rules for one component. Handed to every
/// [`DeprecationProvider`](crate::registry::DeprecationProvider) so
/// components never build structural rules by hand.
#[derive(Debug, Clone)]
pub struct ConfigDeprecationFactory {
    path: String,
}

impl ConfigDeprecationFactory {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// The config path relative rules are resolved against.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn rename(&self, old_key: &str, new_key: &str) -> RenameDeprecation {
        RenameDeprecation::new(self.path.clone(), old_key, new_key)
    }

    pub fn rename_from_root(&self, old_path: &str, new_path: &str) -> RenameDeprecation {
        RenameDeprecation::new(String::new(), old_path, new_path)
    }

    pub fn unused(&self, key: &str) -> UnusedDeprecation {
        UnusedDeprecation::new(&self.path, key)
    }

    pub fn unused_from_root(&self, path: &str) -> UnusedDeprecation {
        UnusedDeprecation::new("", path)
    }

    pub fn custom<F>(&self, name: impl Into<String>, f: F) -> CustomDeprecation<F>
    where
        F: Fn(
                &mut Value,
                &DeprecationContext<'_>,
                &mut DeprecationCollector<'_>,
            ) -> Result<(), Error>
            + Send
            + Sync,
    {
        CustomDeprecation::new(name, f)
    }
}
