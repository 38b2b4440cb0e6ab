use analytics_columnar::DEFAULT_PREVIEW_ROWS;
use axum::http::HeaderValue;
use clap::Parser;
use std::path::PathBuf;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

/// Origins accepted when `ANALYTICS_ALLOWED_ORIGINS` is unset.
pub const DEFAULT_ALLOWED_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "https://*.vercel.app",
    "https://*.railway.app",
    "https://*.render.com",
    "https://eaapro.vercel.app",
    "https://www.easyaianalytics.com",
];

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Database path that keeps everything in memory for the lifetime of the process.
pub const IN_MEMORY_DATABASE: &str = ":memory:";

#[derive(Parser, Debug, Clone)]
#[command(
    name = "analytics-server",
    about = "HTTP backend for dataset profiling, cleaning and spreadsheet-style lookups"
)]
pub struct ServerConfig {
    #[arg(long, env = "ANALYTICS_HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "ANALYTICS_PORT", default_value_t = 8000)]
    pub port: u16,

    /// SQLite database file; `:memory:` keeps data for the process lifetime only.
    #[arg(long, env = "ANALYTICS_DATABASE", default_value = "analytics.db")]
    pub database: PathBuf,

    /// Comma-separated CORS origins. `https://*.example.com` matches any subdomain.
    #[arg(
        long = "allowed-origins",
        env = "ANALYTICS_ALLOWED_ORIGINS",
        value_delimiter = ',',
        default_values = DEFAULT_ALLOWED_ORIGINS
    )]
    pub allowed_origins: Vec<String>,

    #[arg(long, env = "ANALYTICS_PREVIEW_ROWS", default_value_t = DEFAULT_PREVIEW_ROWS)]
    pub preview_rows: usize,

    #[arg(long, env = "ANALYTICS_MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: usize,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn uses_in_memory_database(&self) -> bool {
        self.database.as_os_str() == IN_MEMORY_DATABASE
    }

    pub fn cors_layer(&self) -> CorsLayer {
        let patterns: Vec<OriginPattern> = self
            .allowed_origins
            .iter()
            .map(|o| o.trim())
            .filter(|o| !o.is_empty())
            .map(OriginPattern::parse)
            .collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::predicate(move |origin: &HeaderValue, _| {
                origin
                    .to_str()
                    .map(|origin| patterns.iter().any(|p| p.matches(origin)))
                    .unwrap_or(false)
            }))
            .allow_methods(AllowMethods::mirror_request())
            .allow_headers(AllowHeaders::mirror_request())
            .allow_credentials(true)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            database: PathBuf::from(IN_MEMORY_DATABASE),
            allowed_origins: DEFAULT_ALLOWED_ORIGINS
                .iter()
                .map(|o| o.to_string())
                .collect(),
            preview_rows: DEFAULT_PREVIEW_ROWS,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

/// One entry of the CORS allow list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginPattern {
    Any,
    Exact(String),
    /// `scheme://*.suffix`: any non-empty host label sequence before `suffix`.
    Subdomain { scheme: String, suffix: String },
}

impl OriginPattern {
    pub fn parse(pattern: &str) -> Self {
        if pattern == "*" {
            return OriginPattern::Any;
        }
        if let Some((scheme, rest)) = pattern.split_once("://") {
            if let Some(suffix) = rest.strip_prefix('*') {
                return OriginPattern::Subdomain {
                    scheme: format!("{scheme}://"),
                    suffix: suffix.to_ascii_lowercase(),
                };
            }
        }
        OriginPattern::Exact(pattern.trim_end_matches('/').to_ascii_lowercase())
    }

    pub fn matches(&self, origin: &str) -> bool {
        let origin = origin.to_ascii_lowercase();
        match self {
            OriginPattern::Any => true,
            OriginPattern::Exact(expected) => origin == *expected,
            OriginPattern::Subdomain { scheme, suffix } => origin
                .strip_prefix(scheme.as_str())
                .and_then(|host| host.strip_suffix(suffix.as_str()))
                .is_some_and(|label| !label.is_empty() && !label.contains('/')),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_origins_match_subdomains_only() {
        let pattern = OriginPattern::parse("https://*.vercel.app");
        assert!(pattern.matches("https://my-app.vercel.app"));
        assert!(pattern.matches("https://a.b.vercel.app"));
        assert!(!pattern.matches("https://vercel.app"));
        assert!(!pattern.matches("http://my-app.vercel.app"));
        assert!(!pattern.matches("https://evil.com/x.vercel.app"));
    }

    #[test]
    fn exact_origins_ignore_case_and_trailing_slash() {
        let pattern = OriginPattern::parse("http://localhost:3000/");
        assert!(pattern.matches("http://LOCALHOST:3000"));
        assert!(!pattern.matches("http://localhost:3001"));
        assert!(OriginPattern::parse("*").matches("https://anything.test"));
    }

    #[test]
    fn env_style_origin_list_is_split() {
        let config = ServerConfig::parse_from([
            "analytics-server",
            "--allowed-origins",
            "http://a.test,https://*.b.test",
            "--database",
            ":memory:",
        ]);
        assert_eq!(config.allowed_origins, vec!["http://a.test", "https://*.b.test"]);
        assert!(config.uses_in_memory_database());
        assert_eq!(config.port, 8000);
        assert_eq!(config.preview_rows, DEFAULT_PREVIEW_ROWS);
    }
}
