//! Credential Store — per-topic shared secrets, loaded once at startup
//!
//! Credentials rarely change; a single load at process startup removes
//! all locking from the request-handling hot path (spec §4.1).

use crate::error::{BridgeError, Result};
use crate::types::TopicCredential;
use std::collections::HashMap;
use std::path::Path;

/// In-memory mapping from bus topic to its `{ltiKey, ltiSecret}` credential.
///
/// Read-only after [`CredentialStore::load`]; safe to share across request
/// tasks via `Arc` with no interior mutability.
#[derive(Debug, Default)]
pub struct CredentialStore {
    table: HashMap<String, TopicCredential>,
}

impl CredentialStore {
    /// Read the configuration file, strip `//` and `/* */` comments, and
    /// parse `{ topic: { ltiKey, ltiSecret }, ... }`.
    ///
    /// Fails on I/O error or malformed JSON — the caller (`main`) turns
    /// this into a non-zero exit (spec §6/§7 item 7).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            BridgeError::Config(format!("failed to read {}: {e}", path.display()))
        })?;

        let table: HashMap<String, TopicCredential> = json5::from_str(&raw).map_err(|e| {
            BridgeError::Config(format!("failed to parse {}: {e}", path.display()))
        })?;

        tracing::info!(count = table.len(), path = %path.display(), "Loaded credential store");
        Ok(Self { table })
    }

    /// O(1), never mutating.
    pub fn lookup(&self, topic: &str) -> Option<&TopicCredential> {
        self.table.get(topic)
    }

    /// Number of configured topics.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Build a store directly from a map — used by tests and by callers
    /// assembling credentials programmatically rather than from a file.
    pub fn from_map(table: HashMap<String, TopicCredential>) -> Self {
        Self { table }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_plain_json() {
        let file = write_temp(
            r#"{
                "studentAction": { "ltiKey": "k", "ltiSecret": "s" }
            }"#,
        );
        let store = CredentialStore::load(file.path()).unwrap();
        let cred = store.lookup("studentAction").unwrap();
        assert_eq!(cred.lti_key, "k");
        assert_eq!(cred.lti_secret, "s");
    }

    #[test]
    fn loads_json_with_comments() {
        let file = write_temp(
            r#"{
                // line comment
                "studentAction": {
                    /* block comment */
                    "ltiKey": "k",
                    "ltiSecret": "s"
                }
            }"#,
        );
        let store = CredentialStore::load(file.path()).unwrap();
        assert!(store.lookup("studentAction").is_some());
    }

    #[test]
    fn unknown_topic_is_not_found() {
        let store = CredentialStore::from_map(HashMap::new());
        assert!(store.lookup("nope").is_none());
    }

    #[test]
    fn missing_file_is_config_error() {
        let err = CredentialStore::load("/nonexistent/ltibridge.cnf").unwrap_err();
        assert!(matches!(err, BridgeError::Config(_)));
    }

    #[test]
    fn malformed_json_is_config_error() {
        let file = write_temp("{ not json");
        let err = CredentialStore::load(file.path()).unwrap_err();
        assert!(matches!(err, BridgeError::Config(_)));
    }
}
