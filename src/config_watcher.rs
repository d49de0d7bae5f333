//! File watcher for dashboard config hot-reload.
//!
//! Watches `~/.config/attest-board/dashboard.toml` (or the path given on the
//! command line) and hands every successfully parsed revision to a callback.
//! The callback runs on the notify thread; `main` forwards it to the event
//! loop through an `EventLoopProxy` so all chart rebuilds stay on one thread.

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::DashboardConfig;

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

/// Return the config directory: `$XDG_CONFIG_HOME/attest-board/` or
/// `$HOME/.config/attest-board/`.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        let mut p = PathBuf::from(xdg);
        p.push("attest-board");
        return p;
    }
    let mut p = home_dir();
    p.push(".config");
    p.push("attest-board");
    p
}

/// Full path to the default `dashboard.toml`.
pub fn default_config_path() -> PathBuf {
    config_dir().join("dashboard.toml")
}

fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

/// Write `content` to `path` unless the file already exists.
/// Returns `true` when a file was written.
pub fn ensure_default_config(path: &Path, content: &str) -> std::io::Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(true)
}

/// Header prepended to the generated default config.
const DEFAULT_HEADER: &str = "\
# attest-board dashboard config. Any missing value uses the compiled default.
# Changes are picked up while the dashboard is running; just save the file.

";

/// Default config file content: a comment header plus every default value.
pub fn default_config_content() -> String {
    format!("{DEFAULT_HEADER}{}", DashboardConfig::default().to_toml())
}

// ---------------------------------------------------------------------------
// Low-level watcher
// ---------------------------------------------------------------------------

/// Spawn a watcher on the *parent directory* of `path`.
///
/// Editors that save through a temp file + rename never touch the original
/// inode, so the directory is watched and events are filtered by file name.
pub fn spawn_watcher<F>(path: &Path, on_change: F) -> notify::Result<RecommendedWatcher>
where
    F: Fn() + Send + 'static,
{
    let target_filename = path.file_name().map(|f| f.to_os_string()).ok_or_else(|| {
        notify::Error::generic("config path has no file name")
    })?;
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
        match res {
            Ok(event) => {
                if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                    return;
                }
                let affects_target = event
                    .paths
                    .iter()
                    .any(|p| p.file_name().is_some_and(|f| f == target_filename));
                if affects_target {
                    on_change();
                }
            }
            Err(e) => warn!(target: "config", "watch error: {e}"),
        }
    })?;

    watcher.watch(&parent, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}

// ---------------------------------------------------------------------------
// ConfigWatcher
// ---------------------------------------------------------------------------

/// Owns the notify watcher for the dashboard config. Dropping it stops the
/// watch.
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
    path: PathBuf,
}

impl ConfigWatcher {
    /// Start watching `path`. `on_reload` receives each revision that parses;
    /// revisions that fail to parse are logged and skipped so the dashboard
    /// keeps its last good config.
    pub fn start<F>(path: PathBuf, on_reload: F) -> notify::Result<Self>
    where
        F: Fn(DashboardConfig) + Send + 'static,
    {
        let watched = path.clone();
        let watcher = spawn_watcher(&path, move || match DashboardConfig::load(&watched) {
            Ok(cfg) => {
                info!(target: "config", path = %watched.display(), "Config reloaded");
                on_reload(cfg);
            }
            Err(e) => warn!(target: "config", "Ignoring config change: {e:#}"),
        })?;
        Ok(Self {
            _watcher: watcher,
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_path_ends_with_app_dir() {
        let path = default_config_path();
        let path_str = path.to_string_lossy();
        assert!(
            path_str.ends_with("attest-board/dashboard.toml"),
            "unexpected config path: {path_str}"
        );
    }

    #[test]
    fn default_content_parses_to_defaults() {
        let cfg = DashboardConfig::from_toml(&default_config_content())
            .expect("default content must parse");
        assert_eq!(cfg, DashboardConfig::default());
    }

    #[test]
    fn ensure_default_creates_then_preserves() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("dashboard.toml");

        assert!(ensure_default_config(&path, "[sidebar]\nopen = false\n").unwrap());
        assert!(std::fs::read_to_string(&path).unwrap().contains("open = false"));

        std::fs::write(&path, "# user customized\n").unwrap();
        assert!(!ensure_default_config(&path, "# default\n").unwrap());
        assert!(std::fs::read_to_string(&path).unwrap().contains("user customized"));
    }

    #[test]
    fn watcher_starts_on_existing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dashboard.toml");
        let watcher = ConfigWatcher::start(path.clone(), |_| {}).expect("watcher should start");
        assert_eq!(watcher.path(), path.as_path());
    }
}
