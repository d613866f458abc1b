//! Persisted light/dark preference.
//!
//! Initialized once from the persisted file, falling back to the OS-level
//! preference; `set` is the single mutation entry point and always persists.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::ThemeError;
use crate::logging::{self, obj, v_str, Domain};
use crate::poller::lock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Persisted {
    theme: Theme,
}

#[derive(Debug)]
pub struct ThemeStore {
    path: PathBuf,
    current: Mutex<Theme>,
}

impl ThemeStore {
    pub fn from_config(cfg: &Config) -> Self {
        Self::init(&cfg.theme_file, cfg.prefers_dark)
    }

    pub fn init(path: impl AsRef<Path>, prefers_dark: bool) -> Self {
        let path = path.as_ref().to_path_buf();
        let os_default = if prefers_dark { Theme::Dark } else { Theme::Light };
        let theme = read_persisted(&path).unwrap_or(os_default);
        logging::debug(
            Domain::Theme,
            "init",
            obj(&[("theme", v_str(theme.as_str())), ("path", v_str(&path.display().to_string()))]),
        );
        Self {
            path,
            current: Mutex::new(theme),
        }
    }

    pub fn current(&self) -> Theme {
        *lock(&self.current)
    }

    pub fn set(&self, theme: Theme) -> Result<(), ThemeError> {
        let mut current = lock(&self.current);
        let body = serde_json::to_string(&Persisted { theme })?;
        fs::write(&self.path, body)?;
        *current = theme;
        logging::info(Domain::Theme, "set", obj(&[("theme", v_str(theme.as_str()))]));
        Ok(())
    }

    pub fn toggle(&self) -> Result<Theme, ThemeError> {
        let next = self.current().toggled();
        self.set(next)?;
        Ok(next)
    }
}

fn read_persisted(path: &Path) -> Option<Theme> {
    let raw = fs::read_to_string(path).ok()?;
    match serde_json::from_str::<Persisted>(&raw) {
        Ok(p) => Some(p.theme),
        Err(err) => {
            logging::warn(
                Domain::Theme,
                "persisted_unreadable",
                obj(&[("path", v_str(&path.display().to_string())), ("msg", v_str(&err.to_string()))]),
            );
            None
        }
    }
}
