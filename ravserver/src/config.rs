//! Configuration du serveur HTTP.
//!
//! Le fichier YAML est optionnel ; chaque champ peut être surchargé par les
//! variables d'environnement `RAV_SERVER_NAME`, `RAV_SERVER_HOST` et
//! `RAV_SERVER_PORT`.

use std::path::Path;

use serde::Deserialize;

fn default_name() -> String {
    "ravserver".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Nom du serveur (utilisé dans les logs et l'en-tête Server)
    #[serde(default = "default_name")]
    pub name: String,

    /// Adresse d'écoute
    #[serde(default = "default_host")]
    pub host: String,

    /// Port HTTP (0 = port éphémère choisi par l'OS)
    #[serde(default)]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            host: default_host(),
            port: 0,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl ServerConfig {
    /// Charge la configuration depuis un fichier YAML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let mut config: ServerConfig = serde_yaml::from_str(&raw)?;
        config.apply_env();
        Ok(config)
    }

    /// Construit la configuration depuis les valeurs par défaut et
    /// l'environnement.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    fn apply_env(&mut self) {
        if let Ok(name) = std::env::var("RAV_SERVER_NAME") {
            self.name = name;
        }
        if let Ok(host) = std::env::var("RAV_SERVER_HOST") {
            self.host = host;
        }
        if let Ok(port) = std::env::var("RAV_SERVER_PORT") {
            if let Ok(port) = port.parse() {
                self.port = port;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.name, "ravserver");
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 0);
    }

    #[test]
    fn test_parse_yaml() {
        let config: ServerConfig =
            serde_yaml::from_str("name: MyServer\nhost: 127.0.0.1\nport: 4711\n").unwrap();
        assert_eq!(config.name, "MyServer");
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 4711);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: ServerConfig = serde_yaml::from_str("port: 8080\n").unwrap();
        assert_eq!(config.name, "ravserver");
        assert_eq!(config.port, 8080);
    }
}
