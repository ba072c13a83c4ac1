//! Secret references in configuration values.
//!
//! - `pass::path/in/store`: first line of `pass show path/in/store`
//! - `env::VAR_NAME`: the value of `$VAR_NAME`
//! - anything else is used as-is

use std::process::Command;

/// Resolves a value that may be a secret reference.
pub fn resolve(value: &str) -> Result<String, String> {
    if let Some(path) = value.strip_prefix("pass::") {
        resolve_pass(path)
    } else if let Some(var) = value.strip_prefix("env::") {
        std::env::var(var).map_err(|_| format!("environment variable `{}` is not set", var))
    } else {
        Ok(value.to_string())
    }
}

/// Returns true when the value points somewhere else instead of holding the
/// secret itself.
pub fn is_reference(value: &str) -> bool {
    value.starts_with("pass::") || value.starts_with("env::")
}

fn resolve_pass(path: &str) -> Result<String, String> {
    let output = Command::new("pass")
        .arg("show")
        .arg(path)
        .output()
        .map_err(|e| format!("failed to run `pass show {}`: {}", path, e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!(
            "`pass show {}` failed ({}): {}",
            path,
            output.status,
            stderr.trim()
        ));
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(str::to_string)
        .ok_or_else(|| format!("`pass show {}` produced no output", path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_values_pass_through() {
        assert_eq!(resolve("s3cret").unwrap(), "s3cret");
        assert_eq!(resolve("").unwrap(), "");
        assert!(!is_reference("s3cret"));
    }

    #[test]
    fn env_reference() {
        unsafe {
            std::env::set_var("_CALTRACK_TEST_SECRET", "from-env");
        }
        assert_eq!(resolve("env::_CALTRACK_TEST_SECRET").unwrap(), "from-env");
        assert!(is_reference("env::_CALTRACK_TEST_SECRET"));
        unsafe {
            std::env::remove_var("_CALTRACK_TEST_SECRET");
        }
    }

    #[test]
    fn missing_env_var() {
        let err = resolve("env::_CALTRACK_SURELY_UNSET_9731").unwrap_err();
        assert!(err.contains("not set"));
    }

    #[test]
    fn pass_reference_that_cannot_resolve() {
        assert!(is_reference("pass::caltrack/none"));
        assert!(resolve("pass::caltrack/does/not/exist/9731").is_err());
    }
}
