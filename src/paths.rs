//! Where ebenv keeps its configuration.
//!
//! The config directory is the first of:
//!
//! 1. `EBENV_CONFIG_DIR` (`~` and `$VARS` are expanded)
//! 2. `$XDG_CONFIG_HOME/ebenv`
//! 3. `%APPDATA%\ebenv` on Windows, `~/.config/ebenv` elsewhere

use anyhow::{Context, Result};
use std::fmt;
use std::path::PathBuf;

/// Environment variable overriding the config directory
pub const ENV_CONFIG_DIR: &str = "EBENV_CONFIG_DIR";

/// Name of the config file inside the config directory
pub const CONFIG_FILE: &str = "config.toml";

const APP_DIR: &str = "ebenv";

/// Which rule picked the config directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirSource {
    Override,
    Xdg,
    Platform,
}

impl fmt::Display for DirSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Override => write!(f, "{ENV_CONFIG_DIR}"),
            Self::Xdg => write!(f, "XDG_CONFIG_HOME"),
            Self::Platform => write!(f, "platform default"),
        }
    }
}

/// A resolved config file location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLocation {
    pub file: PathBuf,
    pub source: DirSource,
}

/// Resolve the config file and the rule that chose its directory
pub fn locate() -> Result<ConfigLocation> {
    let (dir, source) = if let Some(dir) = non_empty_var(ENV_CONFIG_DIR) {
        (expand(&dir), DirSource::Override)
    } else if let Some(xdg) = non_empty_var("XDG_CONFIG_HOME") {
        (PathBuf::from(xdg).join(APP_DIR), DirSource::Xdg)
    } else {
        (platform_dir()?, DirSource::Platform)
    };

    log::debug!("Config dir {} ({source})", dir.display());
    Ok(ConfigLocation {
        file: dir.join(CONFIG_FILE),
        source,
    })
}

/// Path of the config file
pub fn config_file() -> Result<PathBuf> {
    locate().map(|location| location.file)
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(windows)]
fn platform_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR))
        .context("Could not determine the AppData directory")
}

#[cfg(not(windows))]
fn platform_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join(APP_DIR))
}

/// Expand `~` and environment variables, leaving unknown variables as written.
pub fn expand(path: &str) -> PathBuf {
    match shellexpand::full(path) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, MutexGuard, PoisonError};

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    /// Sets env vars for one test and restores them on drop
    struct EnvGuard {
        saved: Vec<(&'static str, Option<String>)>,
        _lock: MutexGuard<'static, ()>,
    }

    impl EnvGuard {
        fn new(vars: &[(&'static str, Option<&str>)]) -> Self {
            let lock = ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
            let saved = vars.iter().map(|(k, _)| (*k, env::var(k).ok())).collect();
            for (key, value) in vars {
                set(key, value.map(str::to_string));
            }
            Self { saved, _lock: lock }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (key, value) in self.saved.drain(..) {
                set(key, value);
            }
        }
    }

    fn set(key: &str, value: Option<String>) {
        // SAFETY: env access in tests is serialized by ENV_LOCK
        unsafe {
            match value {
                Some(v) => env::set_var(key, v),
                None => env::remove_var(key),
            }
        }
    }

    #[test]
    fn test_override_wins() {
        let _env = EnvGuard::new(&[
            (ENV_CONFIG_DIR, Some("/srv/ebenv")),
            ("XDG_CONFIG_HOME", Some("/tmp/xdg")),
        ]);

        let location = locate().unwrap();
        assert_eq!(location.file, PathBuf::from("/srv/ebenv/config.toml"));
        assert_eq!(location.source, DirSource::Override);
    }

    #[test]
    fn test_override_expands_tilde() {
        let home = dirs::home_dir().unwrap();
        let _env = EnvGuard::new(&[(ENV_CONFIG_DIR, Some("~/dotfiles/ebenv"))]);

        assert_eq!(
            config_file().unwrap(),
            home.join("dotfiles").join("ebenv").join(CONFIG_FILE)
        );
    }

    #[test]
    fn test_blank_override_is_ignored() {
        let _env = EnvGuard::new(&[
            (ENV_CONFIG_DIR, Some("  ")),
            ("XDG_CONFIG_HOME", Some("/tmp/xdg")),
        ]);

        let location = locate().unwrap();
        assert_eq!(location.file, PathBuf::from("/tmp/xdg/ebenv/config.toml"));
        assert_eq!(location.source, DirSource::Xdg);
    }

    #[cfg(unix)]
    #[test]
    fn test_platform_default() {
        let _env = EnvGuard::new(&[(ENV_CONFIG_DIR, None), ("XDG_CONFIG_HOME", None)]);
        let home = dirs::home_dir().unwrap();

        let location = locate().unwrap();
        assert_eq!(location.file, home.join(".config/ebenv/config.toml"));
        assert_eq!(location.source.to_string(), "platform default");
    }

    #[test]
    fn test_expand() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(expand("~/a/b"), home.join("a").join("b"));
        assert_eq!(expand("/abs"), PathBuf::from("/abs"));
        assert_eq!(
            expand("/x/$EBENV_SURELY_UNSET_VAR/y"),
            PathBuf::from("/x/$EBENV_SURELY_UNSET_VAR/y")
        );
    }
}
