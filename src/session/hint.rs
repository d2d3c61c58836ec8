//! Persisted "was logged in" hint.
//!
//! Advisory only: the route guard uses it to skip a network round trip for a
//! client that has never logged in. The session store stays authoritative.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

/// Storage key of the hint.
pub const LOGIN_HINT_KEY: &str = "isLoggedIn";

pub trait LoginHint: Send + Sync {
    fn is_set(&self) -> bool;
    fn set(&self);
    fn clear(&self);
}

/// Hint that lives as long as the process.
#[derive(Debug, Default)]
pub struct MemoryLoginHint {
    flag: AtomicBool,
}

impl MemoryLoginHint {
    #[must_use]
    pub fn new(initial: bool) -> Self {
        Self { flag: AtomicBool::new(initial) }
    }
}

impl LoginHint for MemoryLoginHint {
    fn is_set(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    fn set(&self) {
        self.flag.store(true, Ordering::Release);
    }

    fn clear(&self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Hint persisted as a small `isLoggedIn=true` file, surviving restarts.
///
/// I/O failures are logged and otherwise ignored: losing the hint only costs
/// one extra identity round trip on the next guarded navigation.
#[derive(Debug, Clone)]
pub struct FileLoginHint {
    path: PathBuf,
}

impl FileLoginHint {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl LoginHint for FileLoginHint {
    fn is_set(&self) -> bool {
        std::fs::read_to_string(&self.path)
            .map(|content| content.trim() == format!("{LOGIN_HINT_KEY}=true"))
            .unwrap_or(false)
    }

    fn set(&self) {
        if let Some(parent) = self.path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::warn!(error = %e, path = %self.path.display(), "failed to create login hint directory");
                return;
            }
        }
        if let Err(e) = std::fs::write(&self.path, format!("{LOGIN_HINT_KEY}=true\n")) {
            tracing::warn!(error = %e, path = %self.path.display(), "failed to persist login hint");
        }
    }

    fn clear(&self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(error = %e, path = %self.path.display(), "failed to clear login hint"),
        }
    }
}

#[cfg(test)]
#[path = "hint_test.rs"]
mod tests;
