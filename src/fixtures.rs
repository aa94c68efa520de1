//! Canned-page snapshot store.
//!
//! This is a test seam, not a persistence layer: live sessions snapshot the
//! balance and transaction pages they fetch, and the offline development
//! mode serves reads back from those snapshots so the extractors can be
//! exercised without network access.

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

const BALANCE_PAGE: &str = "balance.html";
const TRANSACTIONS_PAGE: &str = "transactions.html";

/// Fixed local location for balance/transaction HTML snapshots.
pub struct FixtureStore {
    dir: PathBuf,
}

impl FixtureStore {
    /// Store under the user cache directory
    /// (`~/.cache/cashpassport/test_pages/` on Linux).
    pub fn new() -> Result<Self> {
        let dir = dirs::cache_dir()
            .context("could not find cache directory")?
            .join("cashpassport")
            .join("test_pages");
        Ok(Self::with_path(dir))
    }

    /// Store at a custom location (used by tests).
    pub fn with_path(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn read(&self, name: &str) -> io::Result<String> {
        std::fs::read_to_string(self.dir.join(name))
    }

    fn write(&self, name: &str, page: &str) -> io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.dir.join(name), page)
    }

    pub fn load_balance_page(&self) -> io::Result<String> {
        self.read(BALANCE_PAGE)
    }

    pub fn store_balance_page(&self, page: &str) -> io::Result<()> {
        self.write(BALANCE_PAGE, page)
    }

    pub fn load_transactions_page(&self) -> io::Result<String> {
        self.read(TRANSACTIONS_PAGE)
    }

    pub fn store_transactions_page(&self, page: &str) -> io::Result<()> {
        self.write(TRANSACTIONS_PAGE, page)
    }
}
