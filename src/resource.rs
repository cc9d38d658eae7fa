//! Configuration resources and change detection.
//!
//! A service is configured with an ordered list of [`ConfigResource`]s. The
//! watcher never interprets them; it only compares [`Fingerprint`]s through a
//! [`ChangeDetector`] to decide whether a rebuild is due. Detection is
//! conservative: anything that cannot be fingerprinted counts as changed.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::error::{Error, Result};

/// A source of configuration.
pub trait ConfigResource: Send + Sync + fmt::Debug {
    /// Human-readable description used in logs.
    fn description(&self) -> String;

    /// Current fingerprint of the resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the resource state cannot be determined; callers
    /// treat that as a change.
    fn fingerprint(&self) -> Result<Fingerprint>;

    /// Read the whole resource as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns an error if the resource cannot be read.
    fn read_to_string(&self) -> Result<String>;
}

/// Snapshot of a resource's observable state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fingerprint {
    /// The resource does not currently exist.
    Missing,
    /// The resource exists with the given state.
    Present {
        modified: Option<SystemTime>,
        len: u64,
        digest: blake3::Hash,
    },
}

/// Resource backed by a file on disk.
///
/// The fingerprint covers modification time, length and a content digest, so
/// rewrites that land within the filesystem's timestamp granularity are still
/// detected.
#[derive(Debug, Clone)]
pub struct FileResource {
    path: PathBuf,
}

impl FileResource {
    /// Create a resource for the given path. The file need not exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn context(&self) -> String {
        format!("reading {}", self.path.display())
    }
}

impl ConfigResource for FileResource {
    fn description(&self) -> String {
        format!("file [{}]", self.path.display())
    }

    fn fingerprint(&self) -> Result<Fingerprint> {
        let metadata = match fs::metadata(&self.path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Fingerprint::Missing),
            Err(e) => return Err(Error::io(self.context(), e)),
        };
        let contents = fs::read(&self.path).map_err(|e| Error::io(self.context(), e))?;

        Ok(Fingerprint::Present {
            modified: metadata.modified().ok(),
            len: metadata.len(),
            digest: blake3::hash(&contents),
        })
    }

    fn read_to_string(&self) -> Result<String> {
        fs::read_to_string(&self.path).map_err(|e| Error::io(self.context(), e))
    }
}

/// In-memory resource whose contents never change.
#[derive(Debug, Clone)]
pub struct StaticResource {
    name: String,
    contents: String,
}

impl StaticResource {
    /// Create a named in-memory resource.
    pub fn new(name: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contents: contents.into(),
        }
    }
}

impl ConfigResource for StaticResource {
    fn description(&self) -> String {
        format!("static [{}]", self.name)
    }

    fn fingerprint(&self) -> Result<Fingerprint> {
        Ok(Fingerprint::Present {
            modified: None,
            len: self.contents.len() as u64,
            digest: blake3::hash(self.contents.as_bytes()),
        })
    }

    fn read_to_string(&self) -> Result<String> {
        Ok(self.contents.clone())
    }
}

/// Fingerprints observed across a resource list, in order.
///
/// `None` marks a resource whose fingerprint could not be computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot(Vec<Option<Fingerprint>>);

impl Snapshot {
    /// Fingerprint every resource.
    pub fn capture(resources: &[Arc<dyn ConfigResource>]) -> Self {
        Self(
            resources
                .iter()
                .map(|resource| match resource.fingerprint() {
                    Ok(fingerprint) => Some(fingerprint),
                    Err(e) => {
                        debug!(
                            resource = %resource.description(),
                            error = %e,
                            "Unable to fingerprint resource, treating as changed"
                        );
                        None
                    },
                })
                .collect(),
        )
    }

    /// True if any resource could not be fingerprinted.
    pub fn is_incomplete(&self) -> bool {
        self.0.iter().any(Option::is_none)
    }
}

/// Remembers what the last successful build saw.
#[derive(Debug, Default)]
pub struct ChangeDetector {
    committed: Mutex<Option<Snapshot>>,
}

impl ChangeDetector {
    /// Create a detector with no recorded build; the first check reports a change.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare the resources against the last committed snapshot.
    ///
    /// Returns the fresh snapshot when a rebuild is due. Commit it with
    /// [`ChangeDetector::commit`] only once the build succeeds, so a change
    /// that lands mid-build is picked up on the next check.
    pub fn changed(&self, resources: &[Arc<dyn ConfigResource>]) -> Option<Snapshot> {
        let current = Snapshot::capture(resources);
        let committed = self.committed.lock();

        let changed = match committed.as_ref() {
            None => true,
            Some(_) if current.is_incomplete() => true,
            Some(previous) => *previous != current,
        };

        if changed {
            Some(current)
        } else {
            trace!("Resources unchanged since last successful build");
            None
        }
    }

    /// Record the snapshot a successful build was made from.
    pub fn commit(&self, snapshot: Snapshot) {
        *self.committed.lock() = Some(snapshot);
    }

    /// Whether any build has been committed.
    pub fn has_committed(&self) -> bool {
        self.committed.lock().is_some()
    }
}
