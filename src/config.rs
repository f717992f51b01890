use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Remote history servers by name
    #[serde(default)]
    pub servers: BTreeMap<String, ServerConfig>,

    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL of the Spark REST API, e.g. `http://localhost:18080`
    pub url: String,

    /// Credentials, passed through to the fetch layer
    #[serde(default)]
    pub auth: AuthConfig,

    /// Server used when none is named
    #[serde(default)]
    pub default: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    pub username: Option<String>,
    pub password: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Pretty-print normalized JSON
    #[serde(default)]
    pub pretty: bool,

    /// Treat recovered anomalies as failures
    #[serde(default)]
    pub fail_on_warnings: bool,
}

impl Settings {
    pub fn load(config_path: &str) -> Result<Self> {
        if std::path::Path::new(config_path).exists() {
            let contents = fs::read_to_string(config_path)?;
            let settings: Settings = toml::from_str(&contents)?;
            Ok(settings)
        } else {
            tracing::warn!("Config file not found: {}. Using defaults.", config_path);
            Ok(Settings::default())
        }
    }

    /// The server flagged `default`, or the only configured server.
    pub fn default_server(&self) -> Option<(&str, &ServerConfig)> {
        self.servers
            .iter()
            .find(|(_, server)| server.default)
            .or_else(|| {
                if self.servers.len() == 1 {
                    self.servers.iter().next()
                } else {
                    None
                }
            })
            .map(|(name, server)| (name.as_str(), server))
    }

    /// The named server, or the default one when no name is given.
    pub fn resolve_server(&self, name: Option<&str>) -> Result<(&str, &ServerConfig)> {
        match name {
            Some(name) => self
                .servers
                .get_key_value(name)
                .map(|(name, server)| (name.as_str(), server))
                .ok_or_else(|| anyhow!("Server '{}' is not configured", name)),
            None => match self.default_server() {
                Some(found) => Ok(found),
                None if self.servers.is_empty() => bail!("No servers are configured"),
                None => bail!(
                    "No default server among {} configured servers; pass --server",
                    self.servers.len()
                ),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_SERVERS: &str = r#"
        [servers.local]
        url = "http://localhost:18080"
        default = true

        [servers.prod]
        url = "https://spark-history.prod:18480"
        auth = { username = "svc" }

        [output]
        pretty = true
    "#;

    #[test]
    fn test_default_server_is_flagged_one() {
        let settings: Settings = toml::from_str(TWO_SERVERS).unwrap();
        assert!(settings.output.pretty);
        assert!(!settings.output.fail_on_warnings);

        let (name, server) = settings.default_server().unwrap();
        assert_eq!(name, "local");
        assert_eq!(server.url, "http://localhost:18080");

        let (name, server) = settings.resolve_server(Some("prod")).unwrap();
        assert_eq!(name, "prod");
        assert_eq!(server.auth.username.as_deref(), Some("svc"));
        assert!(settings.resolve_server(Some("staging")).is_err());
    }

    #[test]
    fn test_single_server_is_default() {
        let settings: Settings =
            toml::from_str("[servers.only]\nurl = \"http://h:18080\"\n").unwrap();
        assert_eq!(settings.resolve_server(None).unwrap().0, "only");
    }

    #[test]
    fn test_no_default_among_many() {
        let settings: Settings = toml::from_str(
            "[servers.a]\nurl = \"http://a\"\n[servers.b]\nurl = \"http://b\"\n",
        )
        .unwrap();
        let err = settings.resolve_server(None).unwrap_err();
        assert!(err.to_string().contains("No default server"));
        assert!(Settings::default().resolve_server(None).is_err());
    }
}
