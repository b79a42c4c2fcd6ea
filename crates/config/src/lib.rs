//! HSL Engine Configuration
//!
//! Loads interpreter settings from a plain `key = value` file (`hsl.conf`).

use hsl_core::{HslError, Result, DEFAULT_STACK_BUDGET};
use std::fs;
use std::path::Path;

/// Name of the configuration file looked up by [`EngineConfig::load_default`]
pub const DEFAULT_CONFIG_FILE: &str = "hsl.conf";

/// Interpreter configuration
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Deepest allowed chain of nested script calls (from "max_call_depth")
    pub max_call_depth: usize,
    /// Native stack, in KiB, one evaluation may use before failing with a
    /// stack overflow (from "max_stack_kib")
    pub max_stack_kib: usize,
    /// Run the static resolver before interpreting (from "resolve")
    pub resolve: bool,
    /// Install the standard native functions (from "builtins")
    pub builtins: bool,
    /// Echo diagnostics to stderr from the command line tool (from "print_diagnostics")
    pub print_diagnostics: bool,
    /// Emit a trace event for every executed statement (from "trace_statements")
    pub trace_statements: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_call_depth: 128,
            max_stack_kib: DEFAULT_STACK_BUDGET / 1024,
            resolve: true,
            builtins: true,
            print_diagnostics: true,
            trace_statements: false,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Load `hsl.conf` from the working directory, or the defaults when it is missing
    pub fn load_default() -> Result<Self> {
        if !Path::new(DEFAULT_CONFIG_FILE).exists() {
            tracing::debug!("No {} found, using default configuration", DEFAULT_CONFIG_FILE);
            return Ok(Self::default());
        }

        Self::load_from_file(DEFAULT_CONFIG_FILE)
    }

    /// Parse configuration text
    ///
    /// Lines are `key = value`; `#` starts a comment line. Unknown keys are
    /// ignored and unparsable values keep their default.
    pub fn parse(content: &str) -> Result<Self> {
        let mut config = Self::default();

        for (line_num, line) in content.lines().enumerate() {
            let line = line.trim();

            // Skip comments and empty lines
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            match line.find('=') {
                Some(eq_pos) => {
                    let key = line[..eq_pos].trim();
                    let value = line[eq_pos + 1..].trim();
                    config.parse_option(key, value);
                }
                None => {
                    return Err(HslError::Config(format!(
                        "line {}: expected 'key = value', found '{}'",
                        line_num + 1,
                        line
                    )));
                }
            }
        }

        if config.max_call_depth == 0 {
            return Err(HslError::Config("max_call_depth must be at least 1".into()));
        }
        if config.max_stack_kib == 0 {
            return Err(HslError::Config("max_stack_kib must be at least 1".into()));
        }

        Ok(config)
    }

    fn parse_option(&mut self, key: &str, value: &str) {
        match key {
            "max_call_depth" => {
                self.max_call_depth = value.parse().unwrap_or(128);
            }
            "max_stack_kib" => {
                self.max_stack_kib = value.parse().unwrap_or(DEFAULT_STACK_BUDGET / 1024);
            }
            "resolve" => {
                self.resolve = parse_flag(value).unwrap_or(true);
            }
            "builtins" => {
                self.builtins = parse_flag(value).unwrap_or(true);
            }
            "print_diagnostics" => {
                self.print_diagnostics = parse_flag(value).unwrap_or(true);
            }
            "trace_statements" => {
                self.trace_statements = parse_flag(value).unwrap_or(false);
            }
            _ => {
                tracing::debug!("Unknown config option: {} = {}", key, value);
            }
        }
    }

    /// Log the effective configuration
    pub fn display(&self) {
        tracing::info!("HSL engine configuration:");
        tracing::info!("  Max call depth: {}", self.max_call_depth);
        tracing::info!("  Stack budget: {} KiB", self.max_stack_kib);
        tracing::info!("  Resolver: {}", if self.resolve { "enabled" } else { "disabled" });
        tracing::info!("  Builtins: {}", if self.builtins { "installed" } else { "none" });
        tracing::info!("  Print diagnostics: {}", self.print_diagnostics);
        tracing::info!("  Trace statements: {}", self.trace_statements);
    }
}

/// Booleans accept `true/false`, `yes/no`, `on/off` and `1/0`
fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}
