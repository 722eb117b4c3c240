//! Server settings from flags and `TOLK_*` environment variables

use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Where accounts and translation records live
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    /// In-process identity provider and store; data is lost on restart
    Memory,
    /// Firebase Authentication and Cloud Firestore
    Firebase,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "tolk-web", version, about = "Web server for the tolk translator")]
pub struct Config {
    /// Address to listen on
    #[arg(long, env = "TOLK_BIND", default_value = "127.0.0.1:3000")]
    pub bind: SocketAddr,

    #[arg(long, env = "TOLK_BACKEND", value_enum, default_value_t = BackendKind::Memory)]
    pub backend: BackendKind,

    /// Directory of `<locale>.json` files overriding the built-in messages
    #[arg(long, env = "TOLK_LOCALES_DIR")]
    pub locales_dir: Option<PathBuf>,

    /// Directory served under /static
    #[arg(long, env = "TOLK_STATIC_DIR", default_value = "tolk-web/src/static")]
    pub static_dir: PathBuf,

    /// Translate with the mock translator instead of Gemini
    #[arg(long, env = "TOLK_MOCK_TRANSLATOR")]
    pub mock_translator: bool,

    /// Seconds without a request before a client session is dropped
    #[arg(
        long,
        env = "TOLK_CLIENT_IDLE_SECS",
        default_value_t = 1800,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub client_idle_secs: u64,
}

impl Config {
    pub fn client_idle(&self) -> Duration {
        Duration::from_secs(self.client_idle_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::try_parse_from(["tolk-web"]).unwrap();
        assert_eq!(config.bind, "127.0.0.1:3000".parse().unwrap());
        assert_eq!(config.backend, BackendKind::Memory);
        assert!(config.locales_dir.is_none());
        assert!(!config.mock_translator);
        assert_eq!(config.client_idle(), Duration::from_secs(30 * 60));
    }

    #[test]
    fn test_flags() {
        let config = Config::try_parse_from([
            "tolk-web",
            "--bind",
            "0.0.0.0:8080",
            "--backend",
            "firebase",
            "--mock-translator",
        ])
        .unwrap();
        assert_eq!(config.bind.port(), 8080);
        assert_eq!(config.backend, BackendKind::Firebase);
        assert!(config.mock_translator);
    }

    #[test]
    fn test_zero_idle_timeout_rejected() {
        assert!(Config::try_parse_from(["tolk-web", "--client-idle-secs", "0"]).is_err());
        let config = Config::try_parse_from(["tolk-web", "--client-idle-secs", "90"]).unwrap();
        assert_eq!(config.client_idle(), Duration::from_secs(90));
    }

    #[test]
    fn test_unknown_backend_rejected() {
        assert!(Config::try_parse_from(["tolk-web", "--backend", "sqlite"]).is_err());
    }
}
