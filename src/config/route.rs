//! Route definitions and the per-route policy bundle.
//!
//! Every policy block is optional in the config file; an absent block
//! deserializes to its disabled variant.

use jsonwebtoken::Algorithm;
use serde::{Deserialize, Serialize};
use tracing::Level;

/// A single named route: path pattern, upstream target(s) and policies.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteDefinition {
    /// Unique route identifier, used in cache/rate-limit keys and logs.
    pub name: String,

    /// Path pattern with literal segments and `{var}` placeholders.
    pub path: String,

    /// Upstream URL or list of URLs (duplicates act as weights).
    pub target: Target,

    /// HTTP methods accepted by this route.
    pub methods: Vec<String>,

    #[serde(default)]
    pub auth: AuthPolicy,

    #[serde(default)]
    pub rate_limit: RateLimitPolicy,

    #[serde(default)]
    pub cache: CachePolicy,

    #[serde(default)]
    pub timeout: TimeoutPolicy,

    #[serde(default)]
    pub response_filter: ResponseFilterPolicy,

    /// User middleware identifiers, applied in order after system middlewares.
    #[serde(default)]
    pub middleware: Vec<String>,

    #[serde(default)]
    pub logging: LoggingPolicy,
}

impl RouteDefinition {
    /// Minimal route with every policy disabled.
    pub fn new(name: impl Into<String>, path: impl Into<String>, target: Target) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            target,
            methods: vec!["GET".to_string()],
            auth: AuthPolicy::default(),
            rate_limit: RateLimitPolicy::default(),
            cache: CachePolicy::default(),
            timeout: TimeoutPolicy::default(),
            response_filter: ResponseFilterPolicy::default(),
            middleware: Vec::new(),
            logging: LoggingPolicy::default(),
        }
    }
}

/// Upstream target declaration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Target {
    /// One URL, never balanced.
    Single(String),
    /// Ordered list of URLs; repeating an entry raises its selection weight.
    Pool(Vec<String>),
}

impl Target {
    /// All configured URLs in declaration order.
    pub fn urls(&self) -> &[String] {
        match self {
            Target::Single(url) => std::slice::from_ref(url),
            Target::Pool(urls) => urls,
        }
    }
}

impl From<&str> for Target {
    fn from(url: &str) -> Self {
        Target::Single(url.to_string())
    }
}

/// Authentication requirement for a route.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthPolicy {
    /// Public route, no credentials required.
    #[default]
    None,
    ApiKey(ApiKeyPolicy),
    Basic(BasicPolicy),
    Jwt(JwtPolicy),
}

impl AuthPolicy {
    /// Config-facing type tag.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthPolicy::None => "none",
            AuthPolicy::ApiKey(_) => "api_key",
            AuthPolicy::Basic(_) => "basic",
            AuthPolicy::Jwt(_) => "jwt",
        }
    }
}

pub const DEFAULT_API_KEY_HEADER: &str = "X-API-Key";
pub const DEFAULT_JWT_HEADER: &str = "Authorization";
pub const DEFAULT_JWT_PREFIX: &str = "Bearer ";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiKeyPolicy {
    #[serde(default = "default_api_key_header")]
    pub header: String,

    /// Required leading text, stripped before comparison.
    #[serde(default)]
    pub prefix: Option<String>,

    #[serde(default)]
    pub keys: Vec<String>,
}

fn default_api_key_header() -> String {
    DEFAULT_API_KEY_HEADER.to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BasicPolicy {
    #[serde(default)]
    pub users: Vec<BasicUser>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BasicUser {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JwtPolicy {
    #[serde(default = "default_jwt_header")]
    pub header: String,

    /// Expected token prefix. An empty string disables prefix handling.
    #[serde(default = "default_jwt_prefix")]
    pub prefix: String,

    pub secret: String,

    #[serde(default = "default_jwt_algorithm")]
    pub algorithm: Algorithm,
}

fn default_jwt_header() -> String {
    DEFAULT_JWT_HEADER.to_string()
}

fn default_jwt_prefix() -> String {
    DEFAULT_JWT_PREFIX.to_string()
}

fn default_jwt_algorithm() -> Algorithm {
    Algorithm::HS256
}

/// Fixed-window rate limit. Disabled when `limit <= 0`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitPolicy {
    /// Maximum requests per window.
    pub limit: i64,

    /// Window length in seconds.
    pub period: u64,

    /// Count per client address instead of one budget for the whole route.
    pub per_client: bool,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            limit: 0,
            period: 0,
            per_client: true,
        }
    }
}

impl RateLimitPolicy {
    pub fn is_enabled(&self) -> bool {
        self.limit > 0
    }
}

/// Response caching. Disabled when `ttl == 0`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CachePolicy {
    /// Entry lifetime in seconds.
    pub ttl: u64,
}

impl CachePolicy {
    pub fn is_enabled(&self) -> bool {
        self.ttl > 0
    }
}

/// Upstream deadline and retry behaviour.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutPolicy {
    /// Per-attempt deadline in milliseconds.
    pub duration_ms: u64,

    /// Extra attempts after the first transport failure.
    pub retries: u32,

    /// Pause between attempts in milliseconds.
    pub retry_delay_ms: u64,
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self {
            duration_ms: 30_000,
            retries: 0,
            retry_delay_ms: 1_000,
        }
    }
}

impl TimeoutPolicy {
    pub fn duration(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.duration_ms)
    }

    pub fn retry_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.retry_delay_ms)
    }
}

/// JSON field projection applied to upstream bodies.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ResponseFilterPolicy {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl ResponseFilterPolicy {
    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }
}

/// Per-route access logging.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingPolicy {
    pub enabled: bool,

    /// Most verbose level emitted for this route.
    pub level: String,
}

impl Default for LoggingPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            level: "info".to_string(),
        }
    }
}

impl LoggingPolicy {
    /// Parse `level`, accepting syslog severity names as aliases.
    pub fn max_level(&self) -> Option<Level> {
        match self.level.to_ascii_lowercase().as_str() {
            "trace" => Some(Level::TRACE),
            "debug" => Some(Level::DEBUG),
            "info" | "notice" => Some(Level::INFO),
            "warn" | "warning" => Some(Level::WARN),
            "error" | "critical" | "alert" | "emergency" => Some(Level::ERROR),
            _ => None,
        }
    }
}
