//! Transport configuration types.

use serde::{Deserialize, Serialize};

/// Port used when neither `MCP_HTTP_PORT` nor `PORT` is set.
pub const DEFAULT_PORT: u16 = 3001;

/// Transport configuration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TransportConfig {
    /// Standard input/output transport (protocol path only).
    #[cfg(feature = "stdio")]
    Stdio,

    /// HTTP transport: SSE sessions, stateless JSON-RPC and the management API.
    Http(HttpConfig),
}

/// HTTP transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Port number to listen on.
    pub port: u16,

    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Path of the stateless JSON-RPC endpoint.
    #[serde(default = "default_rpc_path")]
    pub rpc_path: String,

    /// Path opening a streaming (SSE) session.
    #[serde(default = "default_sse_path")]
    pub sse_path: String,

    /// Path receiving messages for a streaming session.
    #[serde(default = "default_message_path")]
    pub message_path: String,

    /// Prefix of the tool management API.
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// Enable CORS for browser clients.
    #[serde(default = "default_cors")]
    pub enable_cors: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_rpc_path() -> String {
    "/mcp".to_string()
}

fn default_sse_path() -> String {
    "/mcp/sse".to_string()
}

fn default_message_path() -> String {
    "/messages".to_string()
}

fn default_api_prefix() -> String {
    "/api/tool".to_string()
}

fn default_cors() -> bool {
    true
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::Http(HttpConfig::default())
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            host: default_host(),
            rpc_path: default_rpc_path(),
            sse_path: default_sse_path(),
            message_path: default_message_path(),
            api_prefix: default_api_prefix(),
            enable_cors: default_cors(),
        }
    }
}

impl TransportConfig {
    /// Create a STDIO transport config.
    #[cfg(feature = "stdio")]
    pub fn stdio() -> Self {
        Self::Stdio
    }

    /// Create an HTTP transport config.
    pub fn http(port: u16, host: impl Into<String>) -> Self {
        Self::Http(HttpConfig {
            port,
            host: host.into(),
            ..Default::default()
        })
    }

    /// Load transport config from environment variables.
    pub fn from_env() -> Self {
        let transport = std::env::var("MCP_TRANSPORT")
            .unwrap_or_default()
            .to_lowercase();

        match transport.as_str() {
            #[cfg(feature = "stdio")]
            "stdio" => Self::Stdio,
            _ => {
                let port = std::env::var("MCP_HTTP_PORT")
                    .or_else(|_| std::env::var("PORT"))
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(DEFAULT_PORT);
                let host = std::env::var("MCP_HTTP_HOST").unwrap_or_else(|_| default_host());
                let enable_cors = std::env::var("MCP_HTTP_CORS")
                    .map(|v| v.to_lowercase() != "false" && v != "0")
                    .unwrap_or(true);
                Self::Http(HttpConfig {
                    port,
                    host,
                    enable_cors,
                    ..Default::default()
                })
            }
        }
    }

    /// Get a description of this transport for logging.
    pub fn description(&self) -> String {
        match self {
            #[cfg(feature = "stdio")]
            Self::Stdio => "STDIO (standard MCP mode)".to_string(),
            Self::Http(cfg) => format!("HTTP on {}:{}", cfg.host, cfg.port),
        }
    }

    /// Listening port, for network transports.
    pub fn port(&self) -> Option<u16> {
        match self {
            #[cfg(feature = "stdio")]
            Self::Stdio => None,
            Self::Http(cfg) => Some(cfg.port),
        }
    }

    /// Check if this transport is the standard STDIO mode.
    pub fn is_stdio(&self) -> bool {
        #[cfg(feature = "stdio")]
        {
            matches!(self, Self::Stdio)
        }
        #[cfg(not(feature = "stdio"))]
        {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ENV_TEST_LOCK;

    fn clear_env() {
        unsafe {
            for key in ["MCP_TRANSPORT", "MCP_HTTP_PORT", "PORT", "MCP_HTTP_HOST", "MCP_HTTP_CORS"] {
                std::env::remove_var(key);
            }
        }
    }

    #[test]
    fn test_default_port() {
        let _lock = ENV_TEST_LOCK.lock().unwrap();
        clear_env();
        assert_eq!(TransportConfig::from_env().port(), Some(DEFAULT_PORT));
    }

    #[test]
    fn test_port_from_env() {
        let _lock = ENV_TEST_LOCK.lock().unwrap();
        clear_env();
        unsafe {
            std::env::set_var("PORT", "4100");
        }
        assert_eq!(TransportConfig::from_env().port(), Some(4100));

        unsafe {
            std::env::set_var("MCP_HTTP_PORT", "4200");
        }
        assert_eq!(TransportConfig::from_env().port(), Some(4200));
        clear_env();
    }

    #[test]
    fn test_unparsable_port_falls_back() {
        let _lock = ENV_TEST_LOCK.lock().unwrap();
        clear_env();
        unsafe {
            std::env::set_var("PORT", "not-a-port");
        }
        assert_eq!(TransportConfig::from_env().port(), Some(DEFAULT_PORT));
        clear_env();
    }

    #[cfg(feature = "stdio")]
    #[test]
    fn test_stdio_from_env() {
        let _lock = ENV_TEST_LOCK.lock().unwrap();
        clear_env();
        unsafe {
            std::env::set_var("MCP_TRANSPORT", "STDIO");
        }
        assert!(TransportConfig::from_env().is_stdio());
        clear_env();
    }

    #[test]
    fn test_http_paths() {
        let TransportConfig::Http(cfg) = TransportConfig::http(8080, "0.0.0.0") else {
            panic!("expected http config");
        };
        assert_eq!(cfg.sse_path, "/mcp/sse");
        assert_eq!(cfg.message_path, "/messages");
        assert_eq!(cfg.api_prefix, "/api/tool");
    }
}
