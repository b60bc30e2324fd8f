//! Environment-derived configuration. Values are type-coerced with defaults;
//! nothing here validates beyond coercion.

const DEFAULT_API_HTTP_PORT: u16 = 8081;
const DEFAULT_CONNECTION_URI: &str = "mongodb://localhost?retryWrites=true&w=majority";
const DEFAULT_DATABASE_NAME: &str = "powercheck";
const DEFAULT_WEB_HOSTNAME: &str = "localhost";
const DEFAULT_WEB_HTTP_PROTOCOL: &str = "http";
const DEFAULT_WEB_HTTP_PORT: u16 = 80;

#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub store: StoreConfig,
    pub origin: PublicOriginConfig,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub http_port: u16,
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub connection_uri: String,
    pub database: String,
}

/// Public hostname/protocol/port used as the CORS origin fallback when a
/// request carries no `Origin` header.
#[derive(Debug, Clone)]
pub struct PublicOriginConfig {
    pub protocol: String,
    pub hostname: String,
    pub port: u16,
}

impl Config {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            api: ApiConfig {
                http_port: read_env_u16("API_HTTP_PORT").unwrap_or(DEFAULT_API_HTTP_PORT),
            },
            store: StoreConfig {
                connection_uri: read_non_empty_env("MONGODB_CONNECTION_STRING")
                    .unwrap_or_else(|| DEFAULT_CONNECTION_URI.to_string()),
                database: read_non_empty_env("MONGODB_DATABASE_NAME")
                    .unwrap_or_else(|| DEFAULT_DATABASE_NAME.to_string()),
            },
            origin: PublicOriginConfig::from_env(),
        }
    }
}

impl PublicOriginConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            protocol: read_non_empty_env("WEB_HTTP_PROTOCOL")
                .unwrap_or_else(|| DEFAULT_WEB_HTTP_PROTOCOL.to_string()),
            hostname: read_non_empty_env("WEB_HOSTNAME")
                .unwrap_or_else(|| DEFAULT_WEB_HOSTNAME.to_string()),
            port: read_env_u16("WEB_HTTP_PORT").unwrap_or(DEFAULT_WEB_HTTP_PORT),
        }
    }

    /// `protocol://hostname[:port]`, omitting the port for 80 and 443.
    #[must_use]
    pub fn origin(&self) -> String {
        if matches!(self.port, 80 | 443) {
            format!("{}://{}", self.protocol, self.hostname)
        } else {
            format!("{}://{}:{}", self.protocol, self.hostname, self.port)
        }
    }
}

impl Default for PublicOriginConfig {
    fn default() -> Self {
        Self {
            protocol: DEFAULT_WEB_HTTP_PROTOCOL.to_string(),
            hostname: DEFAULT_WEB_HOSTNAME.to_string(),
            port: DEFAULT_WEB_HTTP_PORT,
        }
    }
}

#[must_use]
fn read_non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[must_use]
fn read_env_u16(name: &str) -> Option<u16> {
    std::env::var(name)
        .ok()
        .and_then(|raw| raw.trim().parse::<u16>().ok())
}
