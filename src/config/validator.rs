//! Declarative environment-variable validation, evaluated in one pass.
//!
//! Grounded in the prior implementation's `EnvironmentValidator`: a table of
//! `{name, description, default, validator, optional_if}` entries is checked
//! as a whole rather than var-by-var, so a service reports every missing or
//! invalid variable at once instead of failing on the first one found.

use crate::domain::errors::ConfigError;
use std::env;

/// One row of a validation table.
pub struct VarSpec {
    pub name: &'static str,
    pub description: &'static str,
    /// `None` means the variable is required unless `optional_if` applies.
    pub default: Option<&'static str>,
    pub validator: fn(&str) -> Result<(), String>,
    /// When `Some((var, expected))`, the variable is not required if the
    /// named env var currently equals `expected` (case-insensitive).
    pub optional_if: Option<(&'static str, &'static str)>,
    pub sensitive: bool,
}

fn condition_met(var: &str, expected: &str) -> bool {
    env::var(var)
        .map(|v| v.eq_ignore_ascii_case(expected))
        .unwrap_or(false)
}

/// Validates every entry in `specs`, accumulating all failures, and returns
/// the resolved values (default-filled) keyed by variable name in the same
/// order as `specs`. Logs each outcome at the level the original printed.
pub fn validate_all(specs: &[VarSpec], service_name: &str) -> Result<Vec<(String, String)>, ConfigError> {
    let mut resolved = Vec::with_capacity(specs.len());
    let mut errors: Vec<ConfigError> = Vec::new();

    tracing::info!(service = service_name, "validating configuration");

    for spec in specs {
        let raw = env::var(spec.name).ok();

        if let Some((var, expected)) = spec.optional_if {
            if raw.is_none() && condition_met(var, expected) {
                tracing::info!(var = spec.name, condition = %format!("{var}={expected}"), "optional, condition met, skipping");
                continue;
            }
        }

        let value = match (raw, spec.default) {
            (Some(v), _) => v,
            (None, Some(d)) => {
                tracing::info!(var = spec.name, value = d, "using default");
                d.to_string()
            }
            (None, None) => {
                errors.push(ConfigError::Missing {
                    name: spec.name.to_string(),
                    description: spec.description.to_string(),
                });
                continue;
            }
        };

        if let Err(reason) = (spec.validator)(&value) {
            errors.push(ConfigError::Invalid {
                name: spec.name.to_string(),
                reason,
            });
            continue;
        }

        let display = if spec.sensitive { "********".to_string() } else { value.clone() };
        tracing::info!(var = spec.name, value = display, "resolved");
        resolved.push((spec.name.to_string(), value));
    }

    if !errors.is_empty() {
        for err in &errors {
            tracing::error!(%err, "configuration error");
        }
        return Err(ConfigError::Multiple(errors));
    }

    Ok(resolved)
}

pub fn get(resolved: &[(String, String)], name: &str) -> Option<String> {
    resolved.iter().find(|(n, _)| n == name).map(|(_, v)| v.clone())
}

pub fn non_empty(v: &str) -> Result<(), String> {
    if v.is_empty() {
        Err("must not be empty".to_string())
    } else {
        Ok(())
    }
}

pub fn valid_port(v: &str) -> Result<(), String> {
    match v.parse::<u32>() {
        Ok(p) if (1..=65535).contains(&p) => Ok(()),
        _ => Err("must be a valid port number (1-65535)".to_string()),
    }
}

pub fn starts_with_http(v: &str) -> Result<(), String> {
    if v.starts_with("http://") || v.starts_with("https://") {
        Ok(())
    } else {
        Err("must be a valid http(s) URL".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_port_accepts_range() {
        assert!(valid_port("1").is_ok());
        assert!(valid_port("65535").is_ok());
        assert!(valid_port("0").is_err());
        assert!(valid_port("65536").is_err());
        assert!(valid_port("abc").is_err());
    }

    #[test]
    fn validate_all_collects_missing_required_var() {
        let specs = [VarSpec {
            name: "CRYPTOSENT_TEST_DOES_NOT_EXIST",
            description: "test var",
            default: None,
            validator: non_empty,
            optional_if: None,
            sensitive: false,
        }];
        let result = validate_all(&specs, "test-service");
        assert!(result.is_err());
    }

    #[test]
    fn validate_all_uses_default_when_unset() {
        let specs = [VarSpec {
            name: "CRYPTOSENT_TEST_DEFAULTED_VAR",
            description: "test var",
            default: Some("fallback"),
            validator: non_empty,
            optional_if: None,
            sensitive: false,
        }];
        let result = validate_all(&specs, "test-service").unwrap();
        assert_eq!(get(&result, "CRYPTOSENT_TEST_DEFAULTED_VAR").as_deref(), Some("fallback"));
    }
}
