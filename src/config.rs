//! Process configuration, read once from `RESERVAD_*` environment variables.

use std::fs::File;
use std::io::{self, BufReader, ErrorKind};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use pgwire::tokio::TlsAcceptor;
use pgwire::tokio::tokio_rustls::rustls::ServerConfig;

/// Sites sit within UTC-14:00..UTC+14:00.
const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    pub bind: String,
    pub data_dir: PathBuf,
    pub password: String,
    /// Login that acts as the built-in service administrator.
    pub service_user: String,
    pub max_connections: usize,
    pub compact_threshold: u64,
    pub sweep_interval: Duration,
    pub utc_offset_minutes: i32,
    pub tls_cert: Option<String>,
    pub tls_key: Option<String>,
    pub metrics_port: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Invalid { var: &'static str, value: String },
    TlsHalfConfigured,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Invalid { var, value } => write!(f, "invalid value for {var}: {value:?}"),
            ConfigError::TlsHalfConfigured => {
                write!(f, "both RESERVAD_TLS_CERT and RESERVAD_TLS_KEY must be set, or neither")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

fn parsed<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(var) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value: raw }),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable source; unset variables take their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let sweep_secs: u64 = parsed(&lookup, "RESERVAD_SWEEP_INTERVAL_SECS", 60)?;
        if sweep_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "RESERVAD_SWEEP_INTERVAL_SECS",
                value: "0".into(),
            });
        }
        let utc_offset_minutes: i32 = parsed(&lookup, "RESERVAD_UTC_OFFSET_MINUTES", 0)?;
        if utc_offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
            return Err(ConfigError::Invalid {
                var: "RESERVAD_UTC_OFFSET_MINUTES",
                value: utc_offset_minutes.to_string(),
            });
        }
        let max_connections: usize = parsed(&lookup, "RESERVAD_MAX_CONNECTIONS", 256)?;
        if max_connections == 0 {
            return Err(ConfigError::Invalid {
                var: "RESERVAD_MAX_CONNECTIONS",
                value: "0".into(),
            });
        }

        let tls_cert = lookup("RESERVAD_TLS_CERT");
        let tls_key = lookup("RESERVAD_TLS_KEY");
        if tls_cert.is_some() != tls_key.is_some() {
            return Err(ConfigError::TlsHalfConfigured);
        }

        let metrics_port = match lookup("RESERVAD_METRICS_PORT") {
            None => None,
            Some(raw) => Some(raw.trim().parse().map_err(|_| ConfigError::Invalid {
                var: "RESERVAD_METRICS_PORT",
                value: raw,
            })?),
        };

        Ok(Self {
            port: parsed(&lookup, "RESERVAD_PORT", 5433)?,
            bind: lookup("RESERVAD_BIND").unwrap_or_else(|| "0.0.0.0".into()),
            data_dir: lookup("RESERVAD_DATA_DIR").unwrap_or_else(|| "./data".into()).into(),
            password: lookup("RESERVAD_PASSWORD").unwrap_or_else(|| "reservad".into()),
            service_user: lookup("RESERVAD_SERVICE_USER").unwrap_or_else(|| "reservad".into()),
            max_connections,
            compact_threshold: parsed(&lookup, "RESERVAD_COMPACT_THRESHOLD", 1000)?,
            sweep_interval: Duration::from_secs(sweep_secs),
            utc_offset_minutes,
            tls_cert,
            tls_key,
            metrics_port,
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }

    /// `None` when TLS is not configured.
    pub fn tls_acceptor(&self) -> io::Result<Option<TlsAcceptor>> {
        let (Some(cert_path), Some(key_path)) = (&self.tls_cert, &self.tls_key) else {
            return Ok(None);
        };

        let certs: Vec<_> = rustls_pemfile::certs(&mut BufReader::new(File::open(cert_path)?))
            .collect::<Result<_, _>>()?;
        let key = rustls_pemfile::private_key(&mut BufReader::new(File::open(key_path)?))?
            .ok_or_else(|| io::Error::new(ErrorKind::InvalidInput, "no private key found in key file"))?;

        let mut config = ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(certs, key)
            .map_err(|e| io::Error::new(ErrorKind::InvalidInput, e))?;
        config.alpn_protocols = vec![b"postgresql".to_vec()];

        Ok(Some(TlsAcceptor::from(Arc::new(config))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|k| vars.get(k).cloned())
    }

    #[test]
    fn defaults() {
        let c = from_pairs(&[]).unwrap();
        assert_eq!(c.port, 5433);
        assert_eq!(c.listen_addr(), "0.0.0.0:5433");
        assert_eq!(c.service_user, "reservad");
        assert_eq!(c.max_connections, 256);
        assert_eq!(c.compact_threshold, 1000);
        assert_eq!(c.sweep_interval, Duration::from_secs(60));
        assert_eq!(c.utc_offset_minutes, 0);
        assert!(c.metrics_port.is_none());
        assert!(c.tls_acceptor().unwrap().is_none());
    }

    #[test]
    fn overrides() {
        let c = from_pairs(&[
            ("RESERVAD_PORT", "6000"),
            ("RESERVAD_SERVICE_USER", "ops"),
            ("RESERVAD_UTC_OFFSET_MINUTES", "-180"),
            ("RESERVAD_SWEEP_INTERVAL_SECS", " 5 "),
            ("RESERVAD_METRICS_PORT", "9100"),
        ])
        .unwrap();
        assert_eq!(c.port, 6000);
        assert_eq!(c.service_user, "ops");
        assert_eq!(c.utc_offset_minutes, -180);
        assert_eq!(c.sweep_interval, Duration::from_secs(5));
        assert_eq!(c.metrics_port, Some(9100));
    }

    #[test]
    fn rejects_bad_values() {
        let err = from_pairs(&[("RESERVAD_PORT", "http")]).unwrap_err();
        assert!(err.to_string().contains("RESERVAD_PORT"));
        assert!(from_pairs(&[("RESERVAD_UTC_OFFSET_MINUTES", "900")]).is_err());
        assert!(from_pairs(&[("RESERVAD_SWEEP_INTERVAL_SECS", "0")]).is_err());
        assert!(from_pairs(&[("RESERVAD_MAX_CONNECTIONS", "0")]).is_err());
    }

    #[test]
    fn tls_needs_both_halves() {
        assert_eq!(
            from_pairs(&[("RESERVAD_TLS_CERT", "cert.pem")]).unwrap_err(),
            ConfigError::TlsHalfConfigured
        );
        let c = from_pairs(&[
            ("RESERVAD_TLS_CERT", "/nonexistent/cert.pem"),
            ("RESERVAD_TLS_KEY", "/nonexistent/key.pem"),
        ])
        .unwrap();
        assert!(c.tls_acceptor().is_err());
    }
}
