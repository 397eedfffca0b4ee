//! Persistent dimension cache for incremental builds.
//!
//! Measuring a source image means opening it and reading its header. That is
//! cheap for one file and adds up over a site, so measured dimensions are
//! remembered across builds in a small append-only log.
//!
//! # Lifecycle
//!
//! 1. [`DimensionCache::open`] reads the previous build's log into memory,
//!    deletes it and starts a fresh log.
//! 2. [`DimensionCache::measure`] answers from memory when it can and probes
//!    the image otherwise. Either way the answer is appended to the new log,
//!    so only paths still referenced by this build survive into the next.
//! 3. [`DimensionCache::close`] flushes the log. It consumes the cache, so
//!    nothing can be recorded afterwards.
//!
//! ## Storage
//!
//! One JSON object per line:
//!
//! ```text
//! {"path":"site/img/hero.jpg","width":1920,"height":1280}
//! ```
//!
//! Lines are folded into a map in file order, so when a path appears more
//! than once the **last** record wins. A log that fails to parse anywhere is
//! discarded as a whole and the build starts from an empty cache.
//!
//! ## Writer
//!
//! All writes go through one dedicated thread fed by a channel, which keeps
//! records in call order regardless of which thread records them. The first
//! write error stops the writer and is reported by `close`.
//!
//! Entries are keyed by path only. Replacing a source image under the same
//! name keeps the old dimensions until the cache is bypassed with
//! `--no-cache`.

use crate::imaging::{BackendError, Dimensions, ImageBackend, probe_dimensions};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use thiserror::Error;

/// Default cache file name, relative to the source directory.
pub const CACHE_FILENAME: &str = ".respimg-cache.jsonl";

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to measure image: {0}")]
    Backend(#[from] BackendError),
    #[error("Cache writer thread panicked")]
    WriterPanicked,
}

/// One persisted line of the cache log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// How measurements were answered during a build.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub measured: u32,
    pub unsupported: u32,
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hits > 0 {
            write!(
                f,
                "{} cached, {} measured ({} total)",
                self.hits,
                self.measured,
                self.hits + self.measured
            )?;
        } else {
            write!(f, "{} measured", self.measured)?;
        }
        if self.unsupported > 0 {
            write!(f, ", {} not images", self.unsupported)?;
        }
        Ok(())
    }
}

struct CacheWriter {
    sender: mpsc::Sender<CacheRecord>,
    handle: JoinHandle<Result<(), CacheError>>,
}

impl CacheWriter {
    fn spawn(file: File) -> Result<Self, CacheError> {
        let (sender, receiver) = mpsc::channel::<CacheRecord>();
        let handle = thread::Builder::new()
            .name("respimg-cache".into())
            .spawn(move || -> Result<(), CacheError> {
                let mut out = BufWriter::new(file);
                for record in receiver {
                    serde_json::to_writer(&mut out, &record)?;
                    out.write_all(b"\n")?;
                }
                out.flush()?;
                Ok(())
            })?;
        Ok(Self { sender, handle })
    }
}

/// Path → dimensions store, loaded once and appended to during a build.
pub struct DimensionCache {
    loaded: HashMap<PathBuf, Dimensions>,
    /// Answers given this build, including "not an image".
    known: HashMap<PathBuf, Option<Dimensions>>,
    writer: CacheWriter,
    stats: CacheStats,
}

impl DimensionCache {
    /// Read a cache log. A missing file is an empty cache; a corrupt one is
    /// discarded with a warning.
    pub fn load(path: &Path) -> Result<HashMap<PathBuf, Dimensions>, CacheError> {
        let bytes = match fs::read(path) {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(e.into()),
        };
        let Ok(content) = String::from_utf8(bytes) else {
            log::warn!("ignoring dimension cache {}: not UTF-8", path.display());
            return Ok(HashMap::new());
        };
        let records: Result<Vec<CacheRecord>, _> = content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(serde_json::from_str)
            .collect();
        match records {
            Ok(records) => Ok(records
                .into_iter()
                .map(|r| (r.path, Dimensions::new(r.width, r.height)))
                .collect()),
            Err(e) => {
                log::warn!("ignoring corrupt dimension cache {}: {}", path.display(), e);
                Ok(HashMap::new())
            }
        }
    }

    /// Start a build: load the previous log (unless `use_cache` is false),
    /// delete it and open a fresh one.
    pub fn open(path: &Path, use_cache: bool) -> Result<Self, CacheError> {
        let loaded = if use_cache {
            Self::load(path)?
        } else {
            HashMap::new()
        };
        log::debug!("loaded {} cached dimensions from {}", loaded.len(), path.display());

        match fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let writer = CacheWriter::spawn(File::create(path)?)?;

        Ok(Self {
            loaded,
            known: HashMap::new(),
            writer,
            stats: CacheStats::default(),
        })
    }

    /// Dimensions loaded from the previous build, if any.
    pub fn lookup(&self, path: &Path) -> Option<Dimensions> {
        self.loaded.get(path).copied()
    }

    /// Dimensions of `path`, from the previous build or by probing.
    ///
    /// `Ok(None)` means the file is not an image. Each path is answered at
    /// most once per build; repeats come from memory without touching the
    /// log again.
    pub fn measure(
        &mut self,
        backend: &dyn ImageBackend,
        path: &Path,
    ) -> Result<Option<Dimensions>, CacheError> {
        if let Some(known) = self.known.get(path) {
            return Ok(*known);
        }

        let dims = match self.lookup(path) {
            Some(dims) => {
                self.stats.hits += 1;
                Some(dims)
            }
            None => match probe_dimensions(backend, path)? {
                Some(dims) => {
                    self.stats.measured += 1;
                    Some(dims)
                }
                None => {
                    self.stats.unsupported += 1;
                    log::warn!("{} is not a supported image", path.display());
                    None
                }
            },
        };

        if let Some(dims) = dims {
            self.record(path, dims);
        }
        self.known.insert(path.to_path_buf(), dims);
        Ok(dims)
    }

    /// Append one record to the log.
    pub fn record(&self, path: &Path, dims: Dimensions) {
        let record = CacheRecord {
            path: path.to_path_buf(),
            width: dims.width,
            height: dims.height,
        };
        // A closed channel means the writer already failed; close() reports it.
        if self.writer.sender.send(record).is_err() {
            log::debug!("cache writer gone, dropping record for {}", path.display());
        }
    }

    /// Flush the log and stop the writer.
    pub fn close(self) -> Result<CacheStats, CacheError> {
        let CacheWriter { sender, handle } = self.writer;
        drop(sender);
        handle.join().map_err(|_| CacheError::WriterPanicked)??;
        Ok(self.stats)
    }
}
