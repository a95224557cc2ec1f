//! Model configuration from TOML files and command-line overrides
//!
//! A configuration is one flat table: the `model` key selects the structure,
//! every other key is a parameter of it. Overrides of the form `key=value`
//! are applied on top of the file, with the value typed as integer, float,
//! boolean or string, in that order.

use crate::error::{Error, Result};
use crate::models::ModelConfig;
use std::fs;
use std::path::Path;
use toml::value::Table;
use toml::Value;

/// Model used when neither the file nor the caller names one
pub const DEFAULT_MODEL: &str = "default";

/// Typed value of an override
pub fn parse_value(text: &str) -> Value {
    let text = text.trim();
    if let Ok(i) = text.parse::<i64>() {
        Value::Integer(i)
    } else if let Ok(f) = text.parse::<f64>() {
        Value::Float(f)
    } else if let Ok(b) = text.parse::<bool>() {
        Value::Boolean(b)
    } else {
        Value::String(text.to_string())
    }
}

/// Split `key=value` into the key and its typed value
pub fn parse_override(assignment: &str) -> Result<(String, Value)> {
    let (key, value) = assignment.split_once('=').ok_or_else(|| {
        Error::Configuration(format!("override '{assignment}' is not of the form key=value"))
    })?;
    let key = key.trim();
    if key.is_empty() {
        return Err(Error::Configuration(format!(
            "override '{assignment}' has an empty key"
        )));
    }
    Ok((key.to_string(), parse_value(value)))
}

/// Read a configuration table from a TOML file
pub fn read_table(path: &Path) -> Result<Table> {
    let text = fs::read_to_string(path)?;
    Ok(toml::from_str(&text)?)
}

/// Build a model configuration
///
/// `model` takes precedence over a `model` key in the file; overrides take
/// precedence over everything.
pub fn load(model: Option<&str>, file: Option<&Path>, overrides: &[String]) -> Result<ModelConfig> {
    let mut table = match file {
        Some(path) => read_table(path)?,
        None => Table::new(),
    };
    if let Some(name) = model {
        table.insert("model".into(), Value::String(name.to_string()));
    }
    for assignment in overrides {
        let (key, value) = parse_override(assignment)?;
        table.insert(key, value);
    }
    table
        .entry("model")
        .or_insert_with(|| Value::String(DEFAULT_MODEL.to_string()));

    Ok(Value::Table(table).try_into()?)
}
