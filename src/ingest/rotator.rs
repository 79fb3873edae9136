// src/ingest/rotator.rs
//! Round-robin over API credentials. Only quota failures move the cursor.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{bail, Result};

pub struct KeyRotator {
    keys: Vec<String>,
    cursor: AtomicUsize,
}

impl fmt::Debug for KeyRotator {
    // Keys are secrets; only show how many there are.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyRotator")
            .field("keys", &self.keys.len())
            .field("cursor", &self.index())
            .finish()
    }
}

impl KeyRotator {
    /// Fails on an empty set; blank entries are dropped first.
    pub fn new<I, S>(keys: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keys: Vec<String> = keys
            .into_iter()
            .map(Into::into)
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        if keys.is_empty() {
            bail!("at least one API key is required");
        }
        Ok(Self {
            keys,
            cursor: AtomicUsize::new(0),
        })
    }

    /// Parses a comma-separated list, e.g. the `YOUTUBE_API_KEYS` value.
    pub fn from_csv(raw: &str) -> Result<Self> {
        Self::new(raw.split(','))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn index(&self) -> usize {
        self.cursor.load(Ordering::Acquire)
    }

    /// Active key together with its index, read in one load.
    pub fn current(&self) -> (usize, &str) {
        let idx = self.index();
        (idx, self.keys[idx].as_str())
    }

    /// Unconditionally moves to the next key. Returns the new index.
    pub fn advance(&self) -> usize {
        let n = self.keys.len();
        let prev = self
            .cursor
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |i| Some((i + 1) % n))
            .unwrap_or_else(|i| i);
        (prev + 1) % n
    }

    /// Rotates away from `observed` only if it is still the active key.
    /// Two fetch paths failing on the same key therefore rotate once, not twice.
    pub fn advance_from(&self, observed: usize) -> usize {
        let n = self.keys.len();
        let next = (observed + 1) % n;
        match self
            .cursor
            .compare_exchange(observed, next, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => next,
            Err(actual) => actual,
        }
    }
}
