use std::collections::HashMap;
use std::env as stdenv;
use std::path::PathBuf;
use std::str::FromStr;

/// Snapshot of the process environment.
///
/// Worker subprocesses are launched with exactly these variables and this
/// working directory, and configuration overrides are looked up here.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Key-value store of environment variables (e.g., PATH, FORKCALC_LOG).
    pub vars: HashMap<String, String>,
    /// Working directory handed to worker processes.
    pub current_dir: PathBuf,
}

impl Environment {
    /// Capture the current process state into a new `Environment` instance.
    pub fn new() -> Self {
        let mut vars = HashMap::new();
        for (k, v) in stdenv::vars() {
            vars.insert(k, v);
        }
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self { vars, current_dir }
    }

    /// An environment with no variables, rooted at `current_dir`.
    pub fn empty(current_dir: impl Into<PathBuf>) -> Self {
        Self {
            vars: HashMap::new(),
            current_dir: current_dir.into(),
        }
    }

    /// Get the value of an environment variable.
    pub fn get_var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Get a variable and parse it. Blank values count as unset.
    pub fn get_parsed<T: FromStr>(&self, key: &str) -> Option<Result<T, T::Err>> {
        self.get_var(key)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::parse)
    }

    /// Set or override an environment variable in `self.vars`.
    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use crate::env::Environment;
    use std::env as stdenv;

    #[test]
    fn test_env_set_and_get_var() {
        let mut env = Environment::empty(stdenv::current_dir().unwrap());

        // initially absent
        assert_eq!(env.get_var("SOME_RANDOM_ENV_VAR_12345"), None);

        env.set_var("KEY", "VALUE");

        assert_eq!(env.get_var("KEY"), Some("VALUE"));
    }

    #[test]
    fn test_env_reads_from_process_env() {
        let env = Environment::new();
        assert!(env.get_var("PATH").is_some());
    }

    #[test]
    fn test_get_parsed() {
        let mut env = Environment::empty(".");
        env.set_var("LIMIT", " 64 ");
        env.set_var("BLANK", "");
        env.set_var("BROKEN", "lots");

        assert_eq!(env.get_parsed::<usize>("LIMIT"), Some(Ok(64)));
        assert!(env.get_parsed::<usize>("BLANK").is_none());
        assert!(env.get_parsed::<usize>("MISSING").is_none());
        assert!(matches!(env.get_parsed::<usize>("BROKEN"), Some(Err(_))));
    }
}
