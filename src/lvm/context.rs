use std::time::{SystemTime, UNIX_EPOCH};

/// Per-invocation facts that end up in the VG text.
///
/// Captured once when a build starts and handed to the text renderer, so every
/// stanza of one image carries the same timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildContext {
    /// Seconds since the unix epoch.
    pub creation_time: u64,
    pub creation_host: String,
}

impl BuildContext {
    pub fn new(creation_time: u64, creation_host: impl Into<String>) -> Self {
        Self {
            creation_time,
            creation_host: creation_host.into(),
        }
    }

    pub fn capture() -> Self {
        let creation_time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();

        let creation_host = match nix::unistd::gethostname() {
            Ok(name) => name.to_string_lossy().into_owned(),
            Err(e) => {
                tracing::warn!("Failed to get hostname, using \"localhost\": {e}");
                "localhost".to_owned()
            }
        };

        Self::new(creation_time, creation_host)
    }
}
