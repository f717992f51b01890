/// Runs the `spark-history-mcp` binary against captured payload files
use anyhow::Result;
use serde_json::Value;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

fn cli() -> Command {
    Command::new(env!("CARGO_BIN_EXE_spark-history-mcp"))
}

#[test]
fn test_normalize_prints_wire_json() -> Result<()> {
    let dir = tempdir()?;
    let config = dir.path().join("settings.toml");
    fs::write(&config, "[servers.local]\nurl = \"http://localhost:18080\"\n")?;
    let payload = dir.path().join("jobs.json");
    fs::write(
        &payload,
        r#"[{"jobId": 7, "name": "job7", "status": "running", "stageIds": [1, 2]}]"#,
    )?;

    let output = cli()
        .args(["normalize", "--entity", "job", "--list", "--config"])
        .arg(&config)
        .arg(&payload)
        .output()?;
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let jobs: Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(jobs[0]["jobId"], 7);
    assert_eq!(jobs[0]["status"], "RUNNING");
    assert_eq!(jobs[0]["stageIds"], serde_json::json!([1, 2]));
    Ok(())
}

#[test]
fn test_failure_names_server_endpoint_and_cause() -> Result<()> {
    let dir = tempdir()?;
    let config = dir.path().join("settings.toml");
    fs::write(
        &config,
        "[servers.prod]\nurl = \"http://prod:18080\"\ndefault = true\n",
    )?;
    let payload = dir.path().join("stage.json");
    fs::write(&payload, r#"{"status": "ACTIVE", "stageId": 1, "name": "s", "details": ""}"#)?;

    let output = cli()
        .args(["normalize", "--entity", "StageData", "--endpoint", "/applications/app-1/stages/1"])
        .arg("--config")
        .arg(&config)
        .arg(&payload)
        .output()?;
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Server 'prod'"), "{}", stderr);
    assert!(stderr.contains("/applications/app-1/stages/1"), "{}", stderr);
    assert!(stderr.contains("stage.attempt_id: missing required field of StageData"), "{}", stderr);
    Ok(())
}

#[test]
fn test_fail_on_warnings_rejects_unknown_strict_field() -> Result<()> {
    let dir = tempdir()?;
    let payload = dir.path().join("version.json");
    fs::write(&payload, r#"{"spark": "3.5.1", "scala": "2.12"}"#)?;

    let lenient = dir.path().join("lenient.toml");
    fs::write(&lenient, "[servers.local]\nurl = \"http://localhost:18080\"\n")?;
    let output = cli()
        .args(["normalize", "--entity", "version", "--config"])
        .arg(&lenient)
        .arg(&payload)
        .output()?;
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let version: Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(version, serde_json::json!({"spark": "3.5.1"}));

    let strict = dir.path().join("strict.toml");
    fs::write(
        &strict,
        concat!(
            "[servers.local]\nurl = \"http://localhost:18080\"\n",
            "\n[output]\nfail_on_warnings = true\n",
        ),
    )?;
    let output = cli()
        .args(["normalize", "--entity", "version", "--config"])
        .arg(&strict)
        .arg(&payload)
        .output()?;
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("normalized with 1 warning(s)"), "{}", stderr);
    assert!(
        stderr.contains(r#"version["scala"]: field not declared by VersionInfo"#),
        "{}",
        stderr
    );
    Ok(())
}

#[test]
fn test_entities_lists_registry() -> Result<()> {
    let output = cli().arg("entities").output()?;
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.lines().any(|l| l.starts_with("ThreadStackTrace")));
    assert!(stdout.lines().any(|l| l.starts_with("SparkPlanGraphEdge") && l.contains("true")));
    Ok(())
}

#[test]
fn test_unknown_entity_is_rejected() -> Result<()> {
    let dir = tempdir()?;
    let payload = dir.path().join("x.json");
    fs::write(&payload, "{}")?;
    let output = cli()
        .args(["normalize", "--entity", "Widget"])
        .arg(&payload)
        .output()?;
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown entity \"Widget\""));
    Ok(())
}
