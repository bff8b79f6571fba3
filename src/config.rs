//! Command-line and environment configuration.

use std::net::SocketAddr;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use url::Url;

use crate::webhook::DEFAULT_WEBHOOK_URL;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ClipboardMode {
    /// System clipboard when one can be opened, otherwise browser only
    Auto,
    /// Always write to the system clipboard
    System,
    /// Leave the write to the page
    Browser,
}

#[derive(Debug, Parser)]
#[command(name = "site-analyzer")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Collects a site URL and screenshots and forwards them to an analysis webhook")]
pub struct Config {
    /// Address the form is served on
    #[arg(long, env = "SITE_ANALYZER_BIND", default_value = "127.0.0.1:8000")]
    pub bind: SocketAddr,

    /// Webhook receiving the submissions
    #[arg(long, env = "SITE_ANALYZER_WEBHOOK_URL", default_value = DEFAULT_WEBHOOK_URL, value_parser = parse_webhook_url)]
    pub webhook_url: Url,

    /// Accept invalid TLS certificates from the webhook
    #[arg(long, env = "SITE_ANALYZER_INSECURE_SSL")]
    pub insecure_ssl: bool,

    /// Whole-request timeout for the webhook call; unbounded when unset
    #[arg(long, env = "SITE_ANALYZER_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    /// Upload body limit in megabytes
    #[arg(long, env = "SITE_ANALYZER_MAX_UPLOAD_MB", default_value_t = 40)]
    pub max_upload_mb: usize,

    /// Minutes a form may sit idle before its session is dropped
    #[arg(long, env = "SITE_ANALYZER_SESSION_TTL_MINS", default_value_t = 1440)]
    pub session_ttl_mins: u64,

    #[arg(long, env = "SITE_ANALYZER_CLIPBOARD", value_enum, default_value_t = ClipboardMode::Auto)]
    pub clipboard: ClipboardMode,
}

impl Config {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_mins.saturating_mul(60))
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

fn parse_webhook_url(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw).map_err(|e| format!("invalid webhook URL: {}", e))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(format!("unsupported webhook scheme: {}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_the_production_webhook() {
        let config = Config::try_parse_from(["site-analyzer"]).unwrap();
        assert_eq!(config.webhook_url.as_str(), DEFAULT_WEBHOOK_URL);
        assert_eq!(config.bind, "127.0.0.1:8000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.timeout(), None);
        assert_eq!(config.max_upload_bytes(), 40 * 1024 * 1024);
        assert_eq!(config.clipboard, ClipboardMode::Auto);
        assert_eq!(config.session_ttl(), Duration::from_secs(24 * 60 * 60));
        assert!(!config.insecure_ssl);
    }

    #[test]
    fn flags_override_defaults() {
        let config = Config::try_parse_from([
            "site-analyzer",
            "--webhook-url",
            "http://localhost:5678/webhook/abc",
            "--timeout-secs",
            "30",
            "--clipboard",
            "browser",
        ])
        .unwrap();
        assert_eq!(config.webhook_url.host_str(), Some("localhost"));
        assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.clipboard, ClipboardMode::Browser);
    }

    #[test]
    fn non_http_webhook_is_rejected() {
        assert!(Config::try_parse_from(["site-analyzer", "--webhook-url", "ftp://x/y"]).is_err());
        assert!(parse_webhook_url("not a url").is_err());
    }
}
