//! `${VAR}` expansion for configuration values.

use anyhow::{bail, Result};
use regex_lite::Regex;

/// Expand ${VAR_NAME} patterns with environment variable values.
///
/// Unset variables are left in place.
pub fn expand_env(s: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([^}]+)\}")?;
    let mut result = s.to_string();

    for cap in re.captures_iter(s) {
        if let (Some(full_match), Some(var_match)) = (cap.get(0), cap.get(1)) {
            if let Ok(value) = std::env::var(var_match.as_str()) {
                result = result.replace(full_match.as_str(), &value);
            }
        }
    }

    Ok(result)
}

/// Expand and fail if any variable stayed unresolved.
pub fn expand_env_strict(field: &str, s: &str) -> Result<String> {
    let expanded = expand_env(s)?;
    if let Some(start) = expanded.find("${") {
        let rest = &expanded[start..];
        let end = rest.find('}').map(|i| i + 1).unwrap_or(rest.len());
        bail!("{}: environment variable {} is not set", field, &rest[..end]);
    }
    Ok(expanded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_env() {
        // Unique var names, tests run in parallel
        std::env::set_var("FORTRESS_ENV_TEST_VAR", "test_value");
        assert_eq!(expand_env("${FORTRESS_ENV_TEST_VAR}").unwrap(), "test_value");
        assert_eq!(
            expand_env("prefix_${FORTRESS_ENV_TEST_VAR}_suffix").unwrap(),
            "prefix_test_value_suffix"
        );
        assert_eq!(expand_env("no_vars").unwrap(), "no_vars");
        assert_eq!(
            expand_env("${FORTRESS_ENV_TEST_UNSET}").unwrap(),
            "${FORTRESS_ENV_TEST_UNSET}"
        );
        std::env::remove_var("FORTRESS_ENV_TEST_VAR");
    }

    #[test]
    fn test_strict_expansion_reports_variable() {
        let err = expand_env_strict("rpc_url", "https://${FORTRESS_ENV_STRICT_UNSET}/rpc").unwrap_err();
        assert_eq!(
            err.to_string(),
            "rpc_url: environment variable ${FORTRESS_ENV_STRICT_UNSET} is not set"
        );
        assert_eq!(expand_env_strict("rpc_url", "http://localhost:8545").unwrap(), "http://localhost:8545");
    }
}
