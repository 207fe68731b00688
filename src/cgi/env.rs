//! Child process environment construction.
//!
//! # Responsibilities
//! - Capture the parent environment once at startup (`EnvSnapshot`)
//! - Copy whitelisted variables into every child (the inherit-list)
//! - Forward whitelisted request headers as environment variables
//!
//! # Design Decisions
//! - The process environment is never mutated; `PATH` augmentation is
//!   applied to the snapshot
//! - Header matching ignores case and treats `-` and `_` alike, so the
//!   header `Auth-Type` matches the configured name `AUTH_TYPE`
//! - Absent variables are omitted, never set to the empty string

use std::collections::HashMap;

use axum::http::HeaderMap;

/// Immutable copy of the parent process environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    /// Capture the current process environment.
    ///
    /// Variables whose name or value is not valid Unicode are skipped.
    pub fn capture() -> Self {
        let vars = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect();
        Self { vars }
    }

    /// Build a snapshot from explicit pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    /// Look up a variable.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Append `entry` to `PATH` as an extra search directory.
    ///
    /// An unset `PATH` becomes `:<entry>`.
    pub fn with_path_entry(mut self, entry: &str) -> Self {
        let current = self.vars.remove("PATH").unwrap_or_default();
        self.vars.insert("PATH".to_string(), format!("{}:{}", current, entry));
        self
    }
}

/// Lookup from normalized header name to canonical variable name.
#[derive(Debug, Clone, Default)]
pub struct PassthroughHeaders {
    by_normalized: HashMap<String, String>,
}

impl PassthroughHeaders {
    /// Build the lookup from canonical names such as `AUTH_TYPE`.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let by_normalized = names
            .into_iter()
            .map(Into::into)
            .map(|canonical| (normalize(&canonical), canonical))
            .collect();
        Self { by_normalized }
    }

    /// Canonical variable name for a request header, if whitelisted.
    pub fn lookup(&self, header: &str) -> Option<&str> {
        self.by_normalized.get(&normalize(header)).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.by_normalized.is_empty()
    }
}

fn normalize(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '_' => '-',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

/// Computes the per-request `NAME=VALUE` list handed to the CGI executor.
#[derive(Debug, Clone)]
pub struct EnvironmentBuilder {
    inherit: Vec<String>,
    passthrough: PassthroughHeaders,
    snapshot: EnvSnapshot,
}

impl EnvironmentBuilder {
    pub fn new(inherit: Vec<String>, passthrough: PassthroughHeaders, snapshot: EnvSnapshot) -> Self {
        Self {
            inherit,
            passthrough,
            snapshot,
        }
    }

    /// The parent environment snapshot the builder reads from.
    pub fn snapshot(&self) -> &EnvSnapshot {
        &self.snapshot
    }

    /// Inherited variables only, in inherit-list order.
    ///
    /// Unset and empty variables are both left out.
    pub fn inherited(&self) -> Vec<String> {
        self.inherit
            .iter()
            .filter_map(|name| {
                self.snapshot
                    .get(name)
                    .filter(|value| !value.is_empty())
                    .map(|value| format!("{}={}", name, value))
            })
            .collect()
    }

    /// Inherited variables followed by matched passthrough headers.
    pub fn build(&self, headers: &HeaderMap) -> Vec<String> {
        let mut env = self.inherited();
        if self.passthrough.is_empty() {
            return env;
        }

        for name in headers.keys() {
            let Some(canonical) = self.passthrough.lookup(name.as_str()) else {
                continue;
            };
            // First value wins for repeated headers.
            let Some(value) = headers.get(name) else {
                continue;
            };
            let value = String::from_utf8_lossy(value.as_bytes());
            if value.is_empty() {
                continue;
            }
            env.push(format!("{}={}", canonical, value));
        }

        env
    }
}
