//! Ambient inputs a rule may read besides the settings tree.
use std::{collections::BTreeMap, ffi::OsString};

/// A snapshot of the process environment.
///
/// The engine takes one snapshot per invocation and hands the same snapshot
/// to every rule, so two rules looking at the same variable always agree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AmbientContext {
    env: BTreeMap<String, String>,
}

impl AmbientContext {
    /// Snapshots the current process environment. Names and values that are
    /// not valid unicode are kept, with invalid sequences replaced.
    pub fn capture() -> Self {
        Self::from_os_vars(std::env::vars_os())
    }

    fn from_os_vars(vars: impl IntoIterator<Item = (OsString, OsString)>) -> Self {
        Self {
            env: vars
                .into_iter()
                .map(|(k, v)| {
                    (
                        k.to_string_lossy().into_owned(),
                        v.to_string_lossy().into_owned(),
                    )
                })
                .collect(),
        }
    }

    pub fn from_vars<K, V>(vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            env: vars
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn env_var(&self, name: &str) -> Option<&str> {
        self.env.get(name).map(String::as_str)
    }

    pub fn has_env_var(&self, name: &str) -> bool {
        self.env.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_vars() {
        let ambient = AmbientContext::from_vars([("CONFIG_PATH", "/etc/app")]);
        assert_eq!(ambient.env_var("CONFIG_PATH"), Some("/etc/app"));
        assert!(!ambient.has_env_var("DATA_PATH"));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_unicode_values_are_kept() {
        use std::os::unix::ffi::OsStringExt;

        let ambient = AmbientContext::from_os_vars([(
            OsString::from("DATA_PATH"),
            OsString::from_vec(vec![b'/', 0xff, b'd']),
        )]);
        assert!(ambient.has_env_var("DATA_PATH"));
        assert_eq!(ambient.env_var("DATA_PATH"), Some("/\u{fffd}d"));
    }

    #[test]
    fn test_capture_sees_process_environment() {
        let ambient = AmbientContext::capture();
        assert_eq!(ambient.has_env_var("PATH"), std::env::var_os("PATH").is_some());
    }

    #[test]
    fn test_empty_by_default() {
        assert!(!AmbientContext::default().has_env_var("PATH"));
    }
}
