// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Placeholder resolution for schedule literals

use super::ScheduleError;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

// Regex pattern for ${name} and ${name:default}
#[allow(clippy::expect_used)]
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_.\-]*)(?::([^}]*))?\}")
        .expect("constant regex pattern is valid")
});

/// Values available to `${name}` placeholders
///
/// Lookup order: configured vars, then environment variables, then the inline
/// default. A placeholder with none of those is an error.
#[derive(Debug, Clone, Default)]
pub struct Vars {
    values: HashMap<String, String>,
    use_env: bool,
}

impl Vars {
    /// Vars backed by the given map and the process environment
    pub fn new(values: HashMap<String, String>) -> Self {
        Self {
            values,
            use_env: true,
        }
    }

    /// Vars backed only by the given map
    pub fn isolated(values: HashMap<String, String>) -> Self {
        Self {
            values,
            use_env: false,
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    fn lookup(&self, name: &str) -> Option<String> {
        if let Some(value) = self.values.get(name) {
            return Some(value.clone());
        }
        if self.use_env {
            return std::env::var(name).ok();
        }
        None
    }

    /// Expand every placeholder in `template`
    pub fn resolve(&self, template: &str) -> Result<String, ScheduleError> {
        let mut out = String::with_capacity(template.len());
        let mut last = 0;

        for caps in PLACEHOLDER.captures_iter(template) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            let name = &caps[1];
            let value = match (self.lookup(name), caps.get(2)) {
                (Some(value), _) => value,
                (None, Some(default)) => default.as_str().to_string(),
                (None, None) => return Err(ScheduleError::UnresolvedPlaceholder(name.to_string())),
            };
            out.push_str(&template[last..whole.start()]);
            out.push_str(&value);
            last = whole.end();
        }

        out.push_str(&template[last..]);
        Ok(out)
    }
}

#[cfg(test)]
#[path = "resolve_tests.rs"]
mod tests;
