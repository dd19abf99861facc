use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

/// Service settings read from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct ServeConfig {
    pub model_path: PathBuf,
    pub bind_addr: IpAddr,
    pub port: u16,
    /// Log every prediction's feature vector at info level.
    pub log_predictions: bool,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("qos_model.json"),
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 5000,
            log_predictions: false,
        }
    }
}

impl ServeConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Unparseable values fall back to defaults with a warning.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(path) = lookup("MODEL_PATH") {
            cfg.model_path = PathBuf::from(path);
        }
        if let Some(raw) = lookup("BIND_ADDR") {
            match raw.parse() {
                Ok(addr) => cfg.bind_addr = addr,
                Err(_) => tracing::warn!(value = %raw, "invalid BIND_ADDR; using default"),
            }
        }
        if let Some(raw) = lookup("PORT") {
            match raw.parse() {
                Ok(port) => cfg.port = port,
                Err(_) => tracing::warn!(value = %raw, "invalid PORT; using default"),
            }
        }
        cfg.log_predictions = lookup("LOG_PRED").as_deref() == Some("1");
        cfg
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = ServeConfig::from_lookup(lookup(&[]));
        assert_eq!(cfg, ServeConfig::default());
        assert_eq!(cfg.socket_addr().to_string(), "0.0.0.0:5000");
    }

    #[test]
    fn reads_overrides() {
        let cfg = ServeConfig::from_lookup(lookup(&[
            ("MODEL_PATH", "/srv/model.json"),
            ("BIND_ADDR", "127.0.0.1"),
            ("PORT", "8080"),
            ("LOG_PRED", "1"),
        ]));
        assert_eq!(cfg.model_path, PathBuf::from("/srv/model.json"));
        assert_eq!(cfg.socket_addr().to_string(), "127.0.0.1:8080");
        assert!(cfg.log_predictions);
    }

    #[test]
    fn bad_port_keeps_default() {
        let cfg = ServeConfig::from_lookup(lookup(&[("PORT", "http")]));
        assert_eq!(cfg.port, 5000);
    }
}
