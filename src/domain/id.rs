//! Identifiers for novel elements and project items
//!
//! Two ID systems live side by side:
//! - Element IDs: `"1"`, `"2"`, ... scoped per element map of a [`Novel`](super::novel::Novel).
//!   A new ID is the lowest positive integer not yet used as a key.
//! - Item handles: 13 characters from `[a-f0-9]`, used as project tree keys and
//!   content file names (e.g. `9a4c0e51f2b7d`).
//!
//! Handles are derived from seed text by a one-round PBKDF2-HMAC-SHA1 over the
//! UTF-8 bytes. The salt is `n` zero bytes, `n` counting up from 0 until the
//! candidate is unused, so the same seed sequence always yields the same handles.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use pbkdf2::pbkdf2_hmac;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use thiserror::Error;

/// Characters a handle is built from, indexed by nibble value
const HANDLE_CHARS: &[u8; 16] = b"abcdef0123456789";

/// Length of every handle
pub const HANDLE_SIZE: usize = 13;

/// Salt values tried before giving up on a seed
const MAX_SALT: usize = 1000;

#[derive(Debug, Error, PartialEq)]
pub enum IdError {
    #[error("Invalid handle: expected 13 characters from [a-f0-9], got '{0}'")]
    InvalidHandle(String),

    #[error("Unable to create a proper handle for '{0}'")]
    Exhausted(String),
}

/// Returns the lowest positive integer not used as a key in `elements`
pub fn next_id<V>(elements: &HashMap<String, V>) -> String {
    let mut i: u32 = 1;
    while elements.contains_key(&i.to_string()) {
        i += 1;
    }
    i.to_string()
}

/// A novelWriter item handle
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Handle(String);

impl Handle {
    /// Returns the handle as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn is_compliant(s: &str) -> bool {
        s.len() == HANDLE_SIZE && s.bytes().all(|b| HANDLE_CHARS.contains(&b))
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Handle {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if !Self::is_compliant(s) {
            return Err(IdError::InvalidHandle(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for Handle {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Handle> for String {
    fn from(handle: Handle) -> Self {
        handle.0
    }
}

/// Derives a handle candidate from text and salt
///
/// The 20-byte key is read as a big-endian integer and emitted in base 16,
/// least significant digit first, until 13 digits are produced or the
/// integer is exhausted. Short candidates are returned as-is and rejected
/// by the registry.
fn derive_candidate(text: &str, salt: usize) -> String {
    let mut key = [0u8; 20];
    pbkdf2_hmac::<Sha1>(text.as_bytes(), &vec![0u8; salt], 1, &mut key);

    let mut nibbles: Vec<u8> = key
        .iter()
        .rev()
        .flat_map(|byte| [byte & 0x0f, byte >> 4])
        .collect();

    // Leading zero digits of the integer never get emitted
    while nibbles.last() == Some(&0) {
        nibbles.pop();
    }

    nibbles
        .into_iter()
        .take(HANDLE_SIZE)
        .map(|n| HANDLE_CHARS[n as usize] as char)
        .collect()
}

/// Registry of handles issued during one project write or read
///
/// Handles are never removed once issued.
#[derive(Debug, Default)]
pub struct HandleRegistry {
    handles: HashSet<String>,
}

impl HandleRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the handle has been issued or registered
    pub fn contains(&self, handle: &str) -> bool {
        self.handles.contains(handle)
    }

    /// Returns the number of handles held
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Returns true if no handle has been issued yet
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Registers an existing handle
    ///
    /// Returns false if it is a duplicate or not compliant.
    pub fn add(&mut self, handle: &str) -> bool {
        if !Handle::is_compliant(handle) || self.contains(handle) {
            return false;
        }
        self.handles.insert(handle.to_string())
    }

    /// Creates a new handle derived from `seed` and registers it
    pub fn create(&mut self, seed: &str) -> Result<Handle, IdError> {
        for salt in 0..=MAX_SALT {
            let candidate = derive_candidate(seed, salt);
            if self.add(&candidate) {
                return Ok(Handle(candidate));
            }
        }
        Err(IdError::Exhausted(seed.to_string()))
    }
}
