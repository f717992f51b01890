use anyhow::Result;
use std::io::Write;
use tempfile::{tempdir, NamedTempFile};
use tracing_test::traced_test;

use spark_history_mcp::config::Settings;

#[test]
fn test_load_servers_from_file() -> Result<()> {
    let mut file = NamedTempFile::new()?;
    writeln!(
        file,
        r#"
[servers.staging]
url = "http://staging:18080"

[servers.production]
url = "https://history.prod:18480"
default = true
auth = {{ token = "abc" }}

[output]
fail_on_warnings = true
"#
    )?;

    let settings = Settings::load(file.path().to_str().unwrap())?;
    assert_eq!(settings.servers.len(), 2);
    assert!(settings.output.fail_on_warnings);
    assert!(!settings.output.pretty);

    let (name, server) = settings.resolve_server(None)?;
    assert_eq!(name, "production");
    assert_eq!(server.auth.token.as_deref(), Some("abc"));

    let (name, server) = settings.resolve_server(Some("staging"))?;
    assert_eq!(name, "staging");
    assert!(!server.default);
    Ok(())
}

#[test]
#[traced_test]
fn test_missing_file_falls_back_to_defaults() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("absent.toml");
    let settings = Settings::load(path.to_str().unwrap())?;
    assert!(settings.servers.is_empty());
    assert!(settings.default_server().is_none());
    assert!(logs_contain("Config file not found"));
    Ok(())
}

#[test]
fn test_invalid_toml_is_an_error() -> Result<()> {
    let mut file = NamedTempFile::new()?;
    writeln!(file, "[servers.broken]\nurl = 18080")?;
    assert!(Settings::load(file.path().to_str().unwrap()).is_err());
    Ok(())
}
