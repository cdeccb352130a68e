//! Reading settings files and command-line overrides into a settings tree.
//!
//! Keys written in dotted form (`server.port: 5601`) are expanded into
//! nested mappings, so `server.port` and `server: { port: 5601 }` load to the
//! same tree. Several files are merged in order, later files winning.
use std::{fs, path::Path};

use tracing::debug;

use crate::{
    error::Error,
    path,
    value::{Mapping, Value},
};

/// The serialization format of a settings file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Toml,
    Json,
}

impl Format {
    /// Picks the format from the file extension.
    pub fn from_path(path: &Path) -> Result<Self, Error> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yml" | "yaml") => Ok(Format::Yaml),
            Some("toml") => Ok(Format::Toml),
            Some("json") => Ok(Format::Json),
            _ => Err(Error::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Reads and parses one settings file.
pub fn read_settings(file: &Path) -> Result<Value, Error> {
    let format = Format::from_path(file)?;
    let contents = fs::read_to_string(file)?;
    debug!(file = %file.display(), ?format, "Read settings file");
    parse_settings(&contents, format)
}

/// Parses settings from a string. An empty file, or one holding only
/// `null`, is an empty mapping.
pub fn parse_settings(contents: &str, format: Format) -> Result<Value, Error> {
    if contents.trim().is_empty() {
        return Ok(Value::mapping());
    }

    let parsed: Value = match format {
        Format::Yaml => serde_yaml::from_str(contents)?,
        Format::Toml => toml::from_str(contents)?,
        Format::Json => serde_json::from_str(contents)?,
    };
    match parsed {
        Value::Null => Ok(Value::mapping()),
        Value::Mapping(_) => expand_dotted_keys(parsed),
        other => Err(Error::UnexpectedType {
            path: String::new(),
            expected: "mapping",
            found: other.type_name(),
        }),
    }
}

pub fn render_settings(settings: &Value, format: Format) -> Result<String, Error> {
    Ok(match format {
        Format::Yaml => serde_yaml::to_string(settings)?,
        Format::Toml => toml::to_string_pretty(settings)?,
        Format::Json => {
            let mut rendered = serde_json::to_string_pretty(settings)?;
            rendered.push('\n');
            rendered
        }
    })
}

/// Rebuilds every mapping so that a dotted key becomes a chain of nested
/// mappings. Empty keys and keys with an empty segment are rejected.
pub fn expand_dotted_keys(value: Value) -> Result<Value, Error> {
    match value {
        Value::Mapping(entries) => {
            let mut expanded = Value::Mapping(Mapping::with_capacity(entries.len()));
            for (key, child) in entries {
                if key.is_empty() {
                    return Err(Error::InvalidPath {
                        path: key,
                        reason: "empty key".to_string(),
                    });
                }
                let child = expand_dotted_keys(child)?;
                match path::get_mut(&mut expanded, &key) {
                    Some(existing) => merge_settings(existing, child),
                    None => {
                        path::set(&mut expanded, &key, child)?;
                    }
                }
            }
            Ok(expanded)
        }
        Value::Sequence(items) => Ok(Value::Sequence(
            items
                .into_iter()
                .map(expand_dotted_keys)
                .collect::<Result<_, _>>()?,
        )),
        scalar => Ok(scalar),
    }
}

/// Deep-merges `overlay` into `base`. Mappings merge key by key; any other
/// value in `overlay` replaces the one in `base`.
pub fn merge_settings(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Mapping(base), Value::Mapping(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_settings(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Parses a `key.path=value` override. The value is read as a YAML scalar,
/// so `true`, `5601` and `null` keep their types; anything that does not
/// parse stays a string.
pub fn parse_override(raw: &str) -> Result<(String, Value), Error> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| Error::InvalidOverride(raw.to_string()))?;
    let key = key.trim();
    if key.is_empty() || key.split('.').any(str::is_empty) {
        return Err(Error::InvalidOverride(raw.to_string()));
    }

    if value.is_empty() {
        return Ok((key.to_string(), Value::String(String::new())));
    }
    let value = match serde_yaml::from_str::<Value>(value) {
        Ok(Value::Sequence(_) | Value::Mapping(_)) | Err(_) => Value::String(value.to_string()),
        Ok(scalar) => scalar,
    };
    Ok((key.to_string(), value))
}

/// Applies one `key.path=value` override to the tree.
pub fn apply_override(settings: &mut Value, raw: &str) -> Result<(), Error> {
    let (key, value) = parse_override(raw)?;
    debug!(key = %key, "Applying settings override");
    path::set(settings, &key, value)?;
    Ok(())
}

/// Reads every file in order, merges them, then applies the overrides.
pub fn load_settings<P, S>(files: &[P], overrides: &[S]) -> Result<Value, Error>
where
    P: AsRef<Path>,
    S: AsRef<str>,
{
    let mut settings = Value::mapping();
    for file in files {
        merge_settings(&mut settings, read_settings(file.as_ref())?);
    }
    for raw in overrides {
        apply_override(&mut settings, raw.as_ref())?;
    }
    Ok(settings)
}
