//! Record of comments that already received a reply.
//!
//! The backing store is a plain text file with one comment id per line. It is
//! only ever appended to; blank lines and duplicate ids are tolerated on load.

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{BotError, Result};

/// Store used when no ledger path is configured; reset on every start
pub const DEFAULT_LEDGER_PATH: &str = "./posts_replied_to.txt";

/// Append-only set of replied-to comment ids
#[derive(Debug, Default)]
pub struct DedupLedger {
    ids: HashSet<String>,
    path: Option<PathBuf>,
}

impl DedupLedger {
    /// Open the ledger for this run.
    ///
    /// With a path, previously recorded ids are loaded (a missing file is
    /// created empty). Without one, the default store is truncated so the run
    /// starts with nothing recorded.
    pub fn open(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Self::reset(Path::new(DEFAULT_LEDGER_PATH)),
        }
    }

    /// Persistent mode: read every non-blank line as an id
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            fs::File::create(path).map_err(BotError::LedgerError)?;
        }
        let content = fs::read_to_string(path).map_err(BotError::LedgerError)?;

        let ids: HashSet<String> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        info!(path = %path.display(), count = ids.len(), "Loaded replied comment ids");

        Ok(Self {
            ids,
            path: Some(path.to_path_buf()),
        })
    }

    /// Ephemeral mode: start from an empty store at `path`
    pub fn reset(path: &Path) -> Result<Self> {
        fs::File::create(path).map_err(BotError::LedgerError)?;
        info!(path = %path.display(), "Initialized empty replied comment ledger");

        Ok(Self {
            ids: HashSet::new(),
            path: Some(path.to_path_buf()),
        })
    }

    /// A ledger with no backing store
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Record `id`, appending it to the backing store if there is one
    pub fn add(&mut self, id: &str) -> Result<()> {
        self.ids.insert(id.to_string());

        if let Some(path) = &self.path {
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(BotError::LedgerError)?;
            writeln!(file, "{}", id).map_err(BotError::LedgerError)?;
            debug!(path = %path.display(), comment_id = id, "Recorded replied comment id");
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}
