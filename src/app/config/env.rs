//! `ELMAH_IO_*` environment overrides. A missing variable leaves the field untouched.

use super::ConfigError;
use std::str::FromStr;

fn var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}

pub fn override_parsed<T>(name: &str, field: &mut T) -> Result<(), ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(raw) = var(name) {
        *field = raw
            .trim()
            .parse()
            .map_err(|e| ConfigError::EnvError(format!("{name}='{raw}': {e}")))?;
    }
    Ok(())
}

pub fn override_string(name: &str, field: &mut String) {
    if let Some(value) = var(name) {
        *field = value;
    }
}

pub fn override_optional(name: &str, field: &mut Option<String>) {
    if let Some(value) = var(name) {
        *field = Some(value);
    }
}
