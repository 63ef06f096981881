//! Command-line entry points

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::SecondsFormat;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use crate::api::{AuthStatus, SpotifyClient};
use crate::auth::{now_secs, TokenStore};
use crate::config::ConfigStore;
use crate::driver::Driver;
use crate::entities::{media_player, remote};
use crate::hub::setup::FieldKind;
use crate::hub::{LoggingHub, SetupAction, SetupErrorKind, SetupMessage, StatusCode};
use crate::setup::{SetupFlow, AUTH_CODE_FIELD};

type StdinLines = Lines<BufReader<Stdin>>;

/// Options for interactive setup.
#[derive(Debug, Default)]
pub struct SetupOptions {
    pub reconfigure: bool,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub premium: bool,
    pub polling_interval: Option<u64>,
}

/// `--config-dir`, else `UC_CONFIG_HOME` (both via clap), else the
/// platform config directory.
pub fn config_dir(explicit: Option<PathBuf>) -> Result<PathBuf> {
    match explicit {
        Some(dir) => Ok(dir),
        None => ConfigStore::default_dir(),
    }
}

fn open_client(dir: &Path) -> Result<Arc<SpotifyClient>> {
    let store = Arc::new(ConfigStore::open(dir));
    tracing::debug!("Using configuration at {}", store.path().display());
    Ok(Arc::new(SpotifyClient::new(store)?))
}

/// Walk through setup on the terminal.
pub async fn setup(dir: &Path, opts: SetupOptions) -> Result<()> {
    let client = open_client(dir)?;
    let mut flow = SetupFlow::new(client.clone());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    if client.store().is_configured() && !opts.reconfigure {
        println!("Already configured. Use --reconfigure to authorize again.");
        return Ok(());
    }

    let client_id = match opts.client_id {
        Some(id) => id,
        None => prompt(&mut lines, "Spotify client ID: ").await?,
    };
    let client_secret = match opts.client_secret {
        Some(secret) => secret,
        None => prompt(&mut lines, "Spotify client secret: ").await?,
    };

    let mut setup_data = serde_json::Map::new();
    setup_data.insert("client_id".into(), Value::from(client_id));
    setup_data.insert("client_secret".into(), Value::from(client_secret));
    setup_data.insert("is_premium".into(), Value::from(opts.premium));
    if let Some(secs) = opts.polling_interval {
        setup_data.insert("polling_interval".into(), Value::from(secs));
    }

    let mut action = flow
        .handle(SetupMessage::DriverSetupRequest {
            setup_data,
            reconfigure: opts.reconfigure,
        })
        .await;

    loop {
        match action {
            SetupAction::Complete => {
                println!("Setup complete.");
                return Ok(());
            }
            SetupAction::RequestUserInput { title, settings } => {
                println!();
                println!("{}", title);
                for field in &settings {
                    if let FieldKind::Label { value } | FieldKind::Text { value, read_only: true, .. } =
                        &field.field
                    {
                        println!();
                        println!("{}:", field.label);
                        println!("{}", value);
                    }
                }
                println!();
            }
            SetupAction::Error(SetupErrorKind::AuthorizationError) => {
                eprintln!("Authorization failed, check the code and try again.");
            }
            SetupAction::Error(kind) => bail!("Setup failed: {:?}", kind),
        }

        let code = prompt(&mut lines, "Paste code or full URL (empty to abort): ").await?;
        if code.is_empty() {
            flow.handle(SetupMessage::AbortDriverSetup {
                error: SetupErrorKind::None,
            })
            .await;
            bail!("Setup aborted");
        }

        let input_values = [(AUTH_CODE_FIELD.to_string(), code)].into_iter().collect();
        action = flow
            .handle(SetupMessage::UserDataResponse { input_values })
            .await;
    }
}

/// Clear stored tokens, keeping app credentials and preferences unless
/// `all` is set.
pub async fn logout(dir: &Path, all: bool) -> Result<()> {
    let store = ConfigStore::open(dir);
    if all {
        store.reset()?;
        println!("Logged out, credentials and preferences removed.");
    } else {
        store.clear_tokens()?;
        println!("Logged out.");
    }
    Ok(())
}

/// Display configuration and token status.
pub async fn status(dir: &Path) -> Result<()> {
    let client = open_client(dir)?;
    let store = client.store();

    println!("Config file: {}", store.path().display());
    match store.credentials() {
        Some(creds) => println!("Client ID:   {}", creds.client_id),
        None => println!("Client ID:   none"),
    }
    println!(
        "Account:     {}",
        if store.is_premium() { "Premium" } else { "Free (display only)" }
    );
    println!("Polling:     every {}s", store.polling_interval());

    match (client.auth_status(), store.tokens()) {
        (AuthStatus::Authenticated, Some(tokens)) => {
            println!("Token:       valid");
            println!("  expires_at: {}", format_timestamp(tokens.expires_at));
            println!("  remaining:  {}s", tokens.expires_at.saturating_sub(now_secs()));
        }
        (AuthStatus::Expired, Some(tokens)) => {
            println!("Token:       expired (refreshes on next use)");
            println!("  expired_at: {}", format_timestamp(tokens.expires_at));
        }
        _ => println!("Token:       none"),
    }

    tracing::debug!("Stored configuration: {}", store.redacted());
    Ok(())
}

/// Start the driver, run one entity command and report the status code.
pub async fn command(dir: &Path, entity_id: &str, cmd_id: &str, params: Option<&str>) -> Result<()> {
    let params = params
        .map(serde_json::from_str::<Value>)
        .transpose()
        .context("--params is not valid JSON")?;

    let driver = Driver::new(open_client(dir)?, Arc::new(LoggingHub));
    driver.start().await;
    let status = driver.handle_command(entity_id, cmd_id, params.as_ref()).await;
    driver.shutdown().await;

    println!("{} {:?}", status.as_u16(), status);
    if status != StatusCode::Ok {
        bail!("Command {} on {} returned {:?}", cmd_id, entity_id, status);
    }
    Ok(())
}

/// Drive the integration against a logging hub, reading
/// `<entity> <cmd_id> [json]` commands from stdin until EOF or Ctrl-C.
pub async fn run(dir: &Path) -> Result<()> {
    let driver = Driver::new(open_client(dir)?, Arc::new(LoggingHub));
    driver.start().await;
    driver.on_connect();
    driver
        .subscribe(&[media_player::ENTITY_ID.to_string(), remote::ENTITY_ID.to_string()])
        .await;

    tracing::info!("Integration is running. Press Ctrl+C to stop.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::warn!("Received Ctrl-C, shutting down...");
                break;
            }
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    break;
                };
                match parse_command_line(&line) {
                    Ok(None) => {}
                    Ok(Some((entity_id, cmd_id, params))) => {
                        let status = driver
                            .handle_command(&entity_id, &cmd_id, params.as_ref())
                            .await;
                        println!("{} {:?}", status.as_u16(), status);
                    }
                    Err(e) => eprintln!("{:#}", e),
                }
            }
        }
    }

    driver.shutdown().await;
    tracing::info!("Driver stopped");
    Ok(())
}

type CommandLine = (String, String, Option<Value>);

/// `<entity> <cmd_id> [json]`; blank lines and `#` comments yield `None`.
fn parse_command_line(line: &str) -> Result<Option<CommandLine>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut parts = line.splitn(3, char::is_whitespace);
    let entity_id = parts.next().unwrap_or_default();
    let Some(cmd_id) = parts.next().filter(|s| !s.is_empty()) else {
        bail!("Expected: <entity> <cmd_id> [json]");
    };
    let params = parts
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(serde_json::from_str::<Value>)
        .transpose()
        .context("Command parameters are not valid JSON")?;

    Ok(Some((entity_id.to_string(), cmd_id.to_string(), params)))
}

async fn prompt(lines: &mut StdinLines, label: &str) -> Result<String> {
    use std::io::Write;

    print!("{}", label);
    std::io::stdout().flush().context("Failed to flush stdout")?;
    let line = lines
        .next_line()
        .await
        .context("Failed to read stdin")?
        .context("Unexpected end of input")?;
    Ok(line.trim().to_string())
}

fn format_timestamp(secs: u64) -> String {
    i64::try_from(secs)
        .ok()
        .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| secs.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_command_line() {
        assert_eq!(
            parse_command_line("spotify_remote_main send_cmd {\"command\": \"NEXT\"}").unwrap(),
            Some((
                "spotify_remote_main".to_string(),
                "send_cmd".to_string(),
                Some(json!({"command": "NEXT"}))
            ))
        );
        assert_eq!(
            parse_command_line("  spotify_media_player_main next ").unwrap(),
            Some((
                "spotify_media_player_main".to_string(),
                "next".to_string(),
                None
            ))
        );
        assert_eq!(parse_command_line("").unwrap(), None);
        assert_eq!(parse_command_line("# comment").unwrap(), None);
        assert!(parse_command_line("spotify_remote_main").is_err());
        assert!(parse_command_line("spotify_remote_main send_cmd {oops").is_err());
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0), "1970-01-01T00:00:00Z");
        assert_eq!(format_timestamp(1_700_000_000), "2023-11-14T22:13:20Z");
    }

    #[tokio::test]
    async fn test_logout_keeps_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::open(dir.path());
        store.set_credentials("id", "secret").unwrap();
        store.set_tokens("a", "r", 3600).unwrap();

        tokio_test::assert_ok!(logout(dir.path(), false).await);

        let reloaded = ConfigStore::open(dir.path());
        assert!(reloaded.tokens().is_none());
        assert!(reloaded.credentials().is_some());

        tokio_test::assert_ok!(logout(dir.path(), true).await);
        assert!(ConfigStore::open(dir.path()).credentials().is_none());
    }

    #[test]
    fn test_config_dir_prefers_explicit() {
        let dir = config_dir(Some(PathBuf::from("/tmp/spotify"))).unwrap();
        assert_eq!(dir, PathBuf::from("/tmp/spotify"));
    }
}
