//! Configuration management for the MCP server.
//!
//! This module provides a centralized configuration structure that can be
//! populated from environment variables or defaults.

use super::transport::TransportConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

/// Main configuration structure for the MCP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server identification and metadata.
    pub server: ServerConfig,

    /// Tool storage and execution configuration.
    pub tools: ToolsConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,

    /// Transport configuration.
    pub transport: TransportConfig,
}

/// Server identification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The name of the server as reported to clients.
    pub name: String,

    /// The version of the server.
    pub version: String,
}

/// Configuration for the tools domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Directory holding one subdirectory per tool.
    pub tools_dir: PathBuf,

    /// Directory receiving per-tool and global failure logs.
    pub logs_dir: PathBuf,

    /// Command line used to run artifacts that don't declare their own.
    /// The artifact body is appended as the last argument.
    pub default_command: Vec<String>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "trace").
    pub level: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            tools_dir: PathBuf::from("tools"),
            logs_dir: PathBuf::from("logs"),
            default_command: vec!["sh".to_string(), "-c".to_string()],
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                name: "dynamic-tool-server".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            tools: ToolsConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
            },
            transport: TransportConfig::default(),
        }
    }
}

impl Config {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables.
    ///
    /// Variables are prefixed with `MCP_`, except `PORT` which is honoured
    /// for compatibility with common hosting setups.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        if let Ok(name) = std::env::var("MCP_SERVER_NAME") {
            config.server.name = name;
        }

        if let Ok(level) = std::env::var("MCP_LOG_LEVEL") {
            config.logging.level = level;
        }

        if let Ok(dir) = std::env::var("MCP_TOOLS_DIR") {
            config.tools.tools_dir = PathBuf::from(dir);
        }

        if let Ok(dir) = std::env::var("MCP_LOGS_DIR") {
            config.tools.logs_dir = PathBuf::from(dir);
        }

        if let Ok(command) = std::env::var("MCP_TOOL_COMMAND") {
            let command: Vec<String> = command.split_whitespace().map(str::to_string).collect();
            if command.is_empty() {
                info!("MCP_TOOL_COMMAND is empty, keeping the default command");
            } else {
                config.tools.default_command = command;
            }
        }

        // Load transport configuration from environment
        config.transport = TransportConfig::from_env();

        config
    }
}

// Mutex to ensure env var tests run serially, across modules
#[cfg(test)]
pub(crate) static ENV_TEST_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.tools.tools_dir, PathBuf::from("tools"));
        assert_eq!(config.tools.logs_dir, PathBuf::from("logs"));
        assert_eq!(config.tools.default_command, vec!["sh", "-c"]);
        assert_eq!(config.transport.port(), Some(3001));
    }

    #[test]
    fn test_tool_dirs_from_env() {
        let _lock = ENV_TEST_LOCK.lock().unwrap();
        unsafe {
            std::env::set_var("MCP_TOOLS_DIR", "/tmp/my-tools");
            std::env::set_var("MCP_TOOL_COMMAND", "python3 -c");
        }
        let config = Config::from_env();
        assert_eq!(config.tools.tools_dir, PathBuf::from("/tmp/my-tools"));
        assert_eq!(config.tools.default_command, vec!["python3", "-c"]);
        unsafe {
            std::env::remove_var("MCP_TOOLS_DIR");
            std::env::remove_var("MCP_TOOL_COMMAND");
        }
    }

    #[test]
    fn test_blank_command_keeps_default() {
        let _lock = ENV_TEST_LOCK.lock().unwrap();
        unsafe {
            std::env::set_var("MCP_TOOL_COMMAND", "   ");
        }
        let config = Config::from_env();
        assert_eq!(config.tools.default_command, vec!["sh", "-c"]);
        unsafe {
            std::env::remove_var("MCP_TOOL_COMMAND");
        }
    }
}
