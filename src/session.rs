//! Process-wide session preferences: the admin flag and the color theme.
//!
//! Read once at startup from a small JSON file (a missing file means
//! defaults) and written through on every change. A change is only kept in
//! memory once it has been persisted.
//!
//! ```json
//! { "admin": false, "theme": "light" }
//! ```
//!
//! The pipeline never sees the session itself, only the [`Access`] it grants.
//!
//! Signing in is a placeholder: the passcode is compared against the
//! configured one. There is no account system behind it.

use crate::pipeline::Access;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed session file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Wrong passcode")]
    WrongPasscode,
    #[error("Signing in is disabled: no passcode configured")]
    SignInDisabled,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
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
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Theme::Light => f.write_str("light"),
            Theme::Dark => f.write_str("dark"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionPrefs {
    pub admin: bool,
    pub theme: Theme,
}

#[derive(Debug, Clone)]
pub struct Session {
    path: PathBuf,
    prefs: SessionPrefs,
}

impl Session {
    /// Load the prefs stored at `path`, or defaults if there is no file yet.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, SessionError> {
        let path = path.into();
        let prefs = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => SessionPrefs::default(),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!(path = %path.display(), admin = prefs.admin, theme = %prefs.theme, "session loaded");
        Ok(Self { path, prefs })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn prefs(&self) -> SessionPrefs {
        self.prefs
    }

    pub fn is_admin(&self) -> bool {
        self.prefs.admin
    }

    pub fn theme(&self) -> Theme {
        self.prefs.theme
    }

    /// What the pipeline may do on behalf of this session.
    pub fn access(&self) -> Access {
        if self.prefs.admin {
            Access::Editor
        } else {
            Access::Viewer
        }
    }

    pub fn sign_in(&mut self, passcode: &str, expected: &str) -> Result<(), SessionError> {
        if expected.is_empty() {
            return Err(SessionError::SignInDisabled);
        }
        if passcode != expected {
            tracing::warn!("sign-in rejected");
            return Err(SessionError::WrongPasscode);
        }
        self.set_admin(true)
    }

    pub fn sign_out(&mut self) -> Result<(), SessionError> {
        self.set_admin(false)
    }

    pub fn set_admin(&mut self, admin: bool) -> Result<(), SessionError> {
        self.commit(SessionPrefs {
            admin,
            ..self.prefs
        })
    }

    pub fn toggle_theme(&mut self) -> Result<Theme, SessionError> {
        let theme = self.prefs.theme.toggled();
        self.commit(SessionPrefs {
            theme,
            ..self.prefs
        })?;
        Ok(theme)
    }

    fn commit(&mut self, next: SessionPrefs) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(&next)?)?;
        self.prefs = next;
        tracing::info!(admin = next.admin, theme = %next.theme, "session updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let tmp = TempDir::new().unwrap();
        let session = Session::load(tmp.path().join("session.json")).unwrap();
        assert_eq!(session.prefs(), SessionPrefs::default());
        assert_eq!(session.theme(), Theme::Light);
        assert_eq!(session.access(), Access::Viewer);
    }

    #[test]
    fn changes_are_written_through() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("state/session.json");

        let mut session = Session::load(&path).unwrap();
        assert_eq!(session.toggle_theme().unwrap(), Theme::Dark);
        session.set_admin(true).unwrap();

        let reloaded = Session::load(&path).unwrap();
        assert_eq!(
            reloaded.prefs(),
            SessionPrefs {
                admin: true,
                theme: Theme::Dark
            }
        );
    }

    #[test]
    fn stored_json_is_lowercase() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("session.json");
        let mut session = Session::load(&path).unwrap();
        session.toggle_theme().unwrap();

        let stored: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(stored["theme"], "dark");
        assert_eq!(stored["admin"], false);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("session.json");
        std::fs::write(&path, r#"{"theme": "dark"}"#).unwrap();

        let session = Session::load(&path).unwrap();
        assert!(!session.is_admin());
        assert_eq!(session.theme(), Theme::Dark);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("session.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(matches!(Session::load(&path), Err(SessionError::Json(_))));
    }

    // =========================================================================
    // Sign in
    // =========================================================================

    #[test]
    fn sign_in_with_matching_passcode_grants_edit() {
        let tmp = TempDir::new().unwrap();
        let mut session = Session::load(tmp.path().join("session.json")).unwrap();

        session.sign_in("tablon", "tablon").unwrap();

        assert_eq!(session.access(), Access::Editor);
        session.sign_out().unwrap();
        assert_eq!(session.access(), Access::Viewer);
    }

    #[test]
    fn wrong_passcode_changes_nothing() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("session.json");
        let mut session = Session::load(&path).unwrap();

        let result = session.sign_in("guess", "tablon");

        assert!(matches!(result, Err(SessionError::WrongPasscode)));
        assert!(!session.is_admin());
        assert!(!path.exists());
    }

    #[test]
    fn empty_configured_passcode_disables_sign_in() {
        let tmp = TempDir::new().unwrap();
        let mut session = Session::load(tmp.path().join("session.json")).unwrap();
        assert!(matches!(
            session.sign_in("", ""),
            Err(SessionError::SignInDisabled)
        ));
    }
}
