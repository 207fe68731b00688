//! Configuration loading.
//!
//! Flags win over the file, the file wins over built-in defaults.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::cgi::EnvSnapshot;
use crate::config::cli::Cli;
use crate::config::schema::{
    inherit_list, normalize_program, FileConfig, GatewayConfig, TransportMode,
    DEFAULT_LISTEN_ADDRESS, DEFAULT_PASSTHROUGH_HEADERS, DEFAULT_ROOT,
};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no CGI program configured")]
    MissingProgram,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Read the TOML configuration file.
pub fn load_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Load the file named by `--config` (if any) and resolve against the
/// current process environment.
pub fn load_config(cli: Cli) -> Result<GatewayConfig, ConfigError> {
    let file = match &cli.config {
        Some(path) => load_file(path)?,
        None => FileConfig::default(),
    };
    resolve(cli, file, EnvSnapshot::capture())
}

/// Merge flags, file and the parent environment into the final config.
///
/// `PATH` in the snapshot gets the current directory appended.
pub fn resolve(cli: Cli, file: FileConfig, env: EnvSnapshot) -> Result<GatewayConfig, ConfigError> {
    let program = cli
        .program
        .or(file.program)
        .filter(|p| !p.is_empty())
        .ok_or(ConfigError::MissingProgram)?;

    let extra_env = cli.env_vars.unwrap_or_default();
    let inherit_env = inherit_list(
        file.inherit_env
            .iter()
            .map(String::as_str)
            .chain(extra_env.split(',')),
    );

    let mode = if cli.fastcgi || file.fastcgi {
        TransportMode::FastCgi
    } else {
        TransportMode::Http
    };

    let args = if cli.args.is_empty() { file.args } else { cli.args };

    let config = GatewayConfig {
        program: normalize_program(&program),
        args,
        working_dir: cli.working_dir.or(file.working_dir),
        root: cli.root.or(file.root).unwrap_or_else(|| DEFAULT_ROOT.to_string()),
        inherit_env,
        passthrough_headers: file
            .passthrough_headers
            .unwrap_or_else(|| DEFAULT_PASSTHROUGH_HEADERS.iter().map(|s| s.to_string()).collect()),
        listen_address: cli
            .address
            .or(file.listen_address)
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDRESS.to_string()),
        mode,
        fastcgi_passthrough: cli.fcgi_passthrough || file.fastcgi_passthrough,
        debug: cli.debug || file.debug,
        metrics_address: cli.metrics_address.or(file.metrics_address),
        env: Arc::new(env.with_path_entry(".")),
    };

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(program: Option<&str>) -> Cli {
        Cli {
            program: program.map(str::to_string),
            ..Cli::default()
        }
    }

    #[test]
    fn missing_program_is_reported() {
        let err = resolve(cli(None), FileConfig::default(), EnvSnapshot::default()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingProgram));

        let err = resolve(cli(Some("")), FileConfig::default(), EnvSnapshot::default()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingProgram));
    }

    #[test]
    fn defaults_are_applied() {
        let env = EnvSnapshot::from_pairs([("PATH", "/usr/bin")]);
        let config = resolve(cli(Some("myscript")), FileConfig::default(), env).unwrap();

        assert_eq!(config.program, "./myscript");
        assert_eq!(config.listen_address, ":3333");
        assert_eq!(config.root, "/");
        assert_eq!(config.mode, TransportMode::Http);
        assert_eq!(config.inherit_env, vec!["PATH", "PLAN9"]);
        assert_eq!(config.passthrough_headers, vec!["AUTH_TYPE", "REMOTE_USER"]);
        assert_eq!(config.env.get("PATH"), Some("/usr/bin:."));
        assert!(!config.fastcgi_passthrough);
    }

    #[test]
    fn flags_override_file() {
        let file = FileConfig {
            program: Some("/srv/file.cgi".into()),
            listen_address: Some("127.0.0.1:1".into()),
            inherit_env: vec!["HOME".into()],
            ..FileConfig::default()
        };
        let mut flags = cli(Some("/srv/flag.cgi"));
        flags.address = Some("127.0.0.1:2".into());
        flags.env_vars = Some("TZ".into());
        flags.fastcgi = true;

        let config = resolve(flags, file, EnvSnapshot::default()).unwrap();

        assert_eq!(config.program, "/srv/flag.cgi");
        assert_eq!(config.listen_address, "127.0.0.1:2");
        assert_eq!(config.inherit_env, vec!["PATH", "PLAN9", "HOME", "TZ"]);
        assert_eq!(config.mode, TransportMode::FastCgi);
    }

    #[test]
    fn program_may_come_from_file() {
        let file = FileConfig {
            program: Some("app.cgi".into()),
            ..FileConfig::default()
        };
        let config = resolve(cli(None), file, EnvSnapshot::default()).unwrap();
        assert_eq!(config.program, "./app.cgi");
    }

    #[test]
    fn invalid_values_fail_validation() {
        let mut flags = cli(Some("x"));
        flags.root = Some("cgi".into());
        let file = FileConfig {
            passthrough_headers: Some(vec!["".into(), "A=B".into()]),
            ..FileConfig::default()
        };

        match resolve(flags, file, EnvSnapshot::default()) {
            Err(ConfigError::Validation(errors)) => assert_eq!(errors.len(), 3),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
