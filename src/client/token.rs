use std::fs;
use std::io;
use std::path::PathBuf;

use parking_lot::RwLock;
use tracing::warn;

/// Where the session token lives between calls.
///
/// "Local" storage is a file and survives restarts ("remember me");
/// "session" storage is process memory. Lookups prefer the local token.
pub struct TokenStore {
    local_path: Option<PathBuf>,
    local: RwLock<Option<String>>,
    session: RwLock<Option<String>>,
}

impl TokenStore {
    /// Token store persisting remembered tokens to `path`. An existing token there is loaded.
    pub fn with_file(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let local = match fs::read_to_string(&path) {
            Ok(raw) => Some(raw.trim().to_string()).filter(|t| !t.is_empty()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not read stored token");
                None
            }
        };
        Self {
            local_path: Some(path),
            local: RwLock::new(local),
            session: RwLock::new(None),
        }
    }

    /// Token store without a backing file; remembered tokens last as long as the process.
    pub fn in_memory() -> Self {
        Self {
            local_path: None,
            local: RwLock::new(None),
            session: RwLock::new(None),
        }
    }

    pub fn set_token(&self, token: &str, remember: bool) -> io::Result<()> {
        if remember {
            if let Some(path) = &self.local_path {
                if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                    fs::create_dir_all(dir)?;
                }
                fs::write(path, token)?;
            }
            *self.local.write() = Some(token.to_string());
            *self.session.write() = None;
        } else {
            self.clear_local()?;
            *self.session.write() = Some(token.to_string());
        }
        Ok(())
    }

    pub fn token(&self) -> Option<String> {
        self.local.read().clone().or_else(|| self.session.read().clone())
    }

    pub fn is_remembered(&self) -> bool {
        self.local.read().is_some()
    }

    pub fn clear(&self) -> io::Result<()> {
        *self.session.write() = None;
        self.clear_local()
    }

    pub fn auth_header(&self) -> Option<String> {
        self.token().map(|t| format!("Bearer {}", t))
    }

    fn clear_local(&self) -> io::Result<()> {
        *self.local.write() = None;
        if let Some(path) = &self.local_path {
            match fs::remove_file(path) {
                Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e),
                _ => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remembered_tokens_survive_a_new_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth_token");

        let store = TokenStore::with_file(&path);
        store.set_token("abc", true).unwrap();
        assert!(store.is_remembered());
        assert_eq!(store.auth_header().as_deref(), Some("Bearer abc"));

        let reopened = TokenStore::with_file(&path);
        assert_eq!(reopened.token().as_deref(), Some("abc"));
    }

    #[test]
    fn session_tokens_stay_in_memory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth_token");

        let store = TokenStore::with_file(&path);
        store.set_token("abc", true).unwrap();
        store.set_token("xyz", false).unwrap();
        assert!(!path.exists());
        assert!(!store.is_remembered());
        assert_eq!(store.token().as_deref(), Some("xyz"));

        store.clear().unwrap();
        assert_eq!(store.token(), None);
        assert_eq!(store.auth_header(), None);
    }
}
