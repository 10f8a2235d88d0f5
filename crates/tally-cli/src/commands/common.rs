use std::env;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tally_core::api::{HttpRemoteService, RemoteConfig};
use tally_core::db::Database;
use tally_core::sync::{ConnectivityMonitor, SyncEngine};

use crate::error::CliError;

/// Remote settings read from the environment
pub struct RemoteEnv {
    pub config: RemoteConfig,
    pub auditor_id: i64,
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os("TALLY_DB_PATH").map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tally")
        .join("tally.db")
}

pub fn open_database(path: &Path) -> Result<Arc<Database>, CliError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(Arc::new(Database::open(path)?))
}

/// Remote configuration from `TALLY_API_URL` / `TALLY_API_TOKEN` /
/// `TALLY_AUDITOR_ID`. `None` when the URL or token is absent.
pub fn remote_env() -> Result<Option<RemoteEnv>, CliError> {
    let Ok(url) = env::var("TALLY_API_URL") else {
        return Ok(None);
    };
    let Ok(token) = env::var("TALLY_API_TOKEN") else {
        return Ok(None);
    };
    if url.trim().is_empty() || token.trim().is_empty() {
        return Ok(None);
    }

    let auditor_id = auditor_id_from_env()?;
    let config = RemoteConfig::new(url, token)?;
    Ok(Some(RemoteEnv { config, auditor_id }))
}

pub fn require_remote_env() -> Result<RemoteEnv, CliError> {
    remote_env()?.ok_or(CliError::SyncNotConfigured)
}

pub fn auditor_id_from_env() -> Result<i64, CliError> {
    env::var("TALLY_AUDITOR_ID")
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .ok_or_else(|| CliError::Config("TALLY_AUDITOR_ID must be set to a numeric id".into()))
}

pub fn build_engine(
    db: Arc<Database>,
    remote: RemoteEnv,
) -> Result<SyncEngine<HttpRemoteService>, CliError> {
    let service = HttpRemoteService::new(remote.config)?;
    Ok(SyncEngine::new(
        db,
        service,
        remote.auditor_id,
        Arc::new(ConnectivityMonitor::new()),
    ))
}

/// Ask for confirmation on stdin. Non-interactive sessions must pass the
/// explicit flag instead.
pub fn confirm(prompt: &str) -> Result<bool, CliError> {
    let stdin = io::stdin();
    if !stdin.is_terminal() {
        return Ok(false);
    }

    print!("{prompt} [y/N] ");
    io::stdout().flush()?;

    let mut answer = String::new();
    stdin.lock().read_line(&mut answer)?;
    Ok(is_affirmative(&answer))
}

pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}

/// Short display form of a local id
pub fn short_id(id: &impl ToString) -> String {
    id.to_string().chars().take(13).collect()
}

pub const fn dirty_marker(needs_sync: bool) -> &'static str {
    if needs_sync {
        "*"
    } else {
        " "
    }
}
