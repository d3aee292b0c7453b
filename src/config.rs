// ⚙️ Desk configuration from the environment
//
//   CHECKIN_DB    store path (`.json` = flat file, anything else = SQLite)
//   CHECKIN_ADDR  full bind address, e.g. 127.0.0.1:8080
//   PORT          port bound on 0.0.0.0 when CHECKIN_ADDR is unset

use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_DB_PATH: &str = "checkin.db";
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub db_path: PathBuf,
    pub bind_addr: SocketAddr,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
        }
    }
}

impl Config {
    /// Load `.env.local` if present, then read the process environment
    pub fn from_env() -> Self {
        let _ = dotenvy::from_filename(".env.local");
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unparseable values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Config::default();

        let db_path = lookup("CHECKIN_DB")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.db_path);

        let bind_addr = lookup("CHECKIN_ADDR")
            .and_then(|v| v.parse().ok())
            .or_else(|| {
                lookup("PORT")
                    .and_then(|v| v.parse::<u16>().ok())
                    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
            })
            .unwrap_or(defaults.bind_addr);

        Config { db_path, bind_addr }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);

        assert_eq!(config.db_path, PathBuf::from("checkin.db"));
        assert_eq!(config.bind_addr.port(), 3000);
    }

    #[test]
    fn test_port_only() {
        let config = config_from(&[("PORT", "8080")]);

        assert_eq!(config.bind_addr, "0.0.0.0:8080".parse().unwrap());
    }

    #[test]
    fn test_addr_wins_over_port() {
        let config = config_from(&[("PORT", "8080"), ("CHECKIN_ADDR", "127.0.0.1:9000")]);

        assert_eq!(config.bind_addr, "127.0.0.1:9000".parse().unwrap());
    }

    #[test]
    fn test_bad_values_fall_back() {
        let config = config_from(&[("PORT", "eighty"), ("CHECKIN_DB", "  ")]);

        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_db_path() {
        let config = config_from(&[("CHECKIN_DB", "/tmp/db.json")]);

        assert_eq!(config.db_path, PathBuf::from("/tmp/db.json"));
    }
}
