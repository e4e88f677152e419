//! Artifact retention: a temp-dir store with asynchronous eviction.
//!
//! The core pipeline only produces bytes; this collaborator owns their
//! lifecycle. Every stored artifact gets an opaque collision-free name and
//! a retain-until deadline; a background sweeper evicts expired files.
//! Eviction is best effort — a file already gone is not an error, and
//! nothing in the request path blocks on it.

use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tempfile::TempDir;
use tracing::debug;
use uuid::Uuid;

#[derive(Clone)]
pub struct ArtifactStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    root: TempDir,
    retention: Duration,
    expiry: Mutex<HashMap<String, Instant>>,
}

impl ArtifactStore {
    pub fn new(retention: Duration) -> std::io::Result<Self> {
        Ok(Self {
            inner: Arc::new(StoreInner {
                root: TempDir::new()?,
                retention,
                expiry: Mutex::new(HashMap::new()),
            }),
        })
    }

    /// Persist bytes under a fresh name derived from `label`.
    ///
    /// Returns the reference callers hand out in download URLs.
    pub fn put(&self, label: &str, bytes: &[u8]) -> std::io::Result<String> {
        let fname = format!("{}_{}", Uuid::new_v4().simple(), sanitize(label));
        std::fs::write(self.inner.root.path().join(&fname), bytes)?;
        let expires = Instant::now() + self.inner.retention;
        self.inner
            .expiry
            .lock()
            .expect("artifact store lock")
            .insert(fname.clone(), expires);
        Ok(fname)
    }

    /// Resolve a reference to its bytes, if the artifact is still retained.
    pub fn get(&self, fname: &str) -> Option<Vec<u8>> {
        // References are single flat names; anything path-like is bogus
        if fname.contains(['/', '\\']) || fname.contains("..") {
            return None;
        }
        if !self
            .inner
            .expiry
            .lock()
            .expect("artifact store lock")
            .contains_key(fname)
        {
            return None;
        }
        std::fs::read(self.inner.root.path().join(fname)).ok()
    }

    #[cfg(test)]
    fn path_of(&self, fname: &str) -> std::path::PathBuf {
        self.inner.root.path().join(fname)
    }

    /// Remove artifacts whose retain-until deadline has passed.
    pub fn evict_expired(&self) -> usize {
        let now = Instant::now();
        let expired: Vec<String> = {
            let mut map = self.inner.expiry.lock().expect("artifact store lock");
            let expired: Vec<String> = map
                .iter()
                .filter(|&(_, &deadline)| deadline <= now)
                .map(|(name, _)| name.clone())
                .collect();
            for name in &expired {
                map.remove(name);
            }
            expired
        };

        for fname in &expired {
            // Best effort: the file may already be gone
            let _ = std::fs::remove_file(self.inner.root.path().join(fname));
            debug!(artifact = %fname, "evicted expired artifact");
        }
        expired.len()
    }

    /// Spawn the background sweeper task.
    pub fn spawn_sweeper(&self) {
        let store = self.clone();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(Duration::from_secs(30));
            loop {
                tick.tick().await;
                store.evict_expired();
            }
        });
    }
}

fn sanitize(label: &str) -> String {
    label
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Bundle named byte blobs into one deflate-compressed zip archive.
///
/// An empty entry list produces a valid empty archive.
pub fn zip_archive(entries: &[(String, Vec<u8>)]) -> zip::result::ZipResult<Vec<u8>> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);
    for (name, bytes) in entries {
        writer.start_file(name.as_str(), options)?;
        writer.write_all(bytes)?;
    }
    Ok(writer.finish()?.into_inner())
}
