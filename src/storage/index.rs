//! Sorted Index
//!
//! Primary key → slot number, persisted as `key;slot` lines sorted by key.

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Result, StoreError};

use super::record_file::temp_path;
use super::INDEX_SEPARATOR;

/// Key types that can be stored in an index file
///
/// The `Ord` impl defines the on-disk sort order.
pub trait IndexKey: Ord + Clone + fmt::Display + fmt::Debug {
    /// Parse a key from its index-file text
    fn parse_key(text: &str) -> Option<Self>;
}

impl IndexKey for i64 {
    fn parse_key(text: &str) -> Option<Self> {
        text.parse().ok()
    }
}

impl IndexKey for String {
    fn parse_key(text: &str) -> Option<Self> {
        Some(text.to_string())
    }
}

/// In-memory copy of an index file, kept sorted ascending by key
///
/// Lookups are binary searches over `entries`. Mutations only touch memory;
/// call `save()` to persist.
#[derive(Debug, Clone)]
pub struct SortedIndex<K: IndexKey> {
    path: PathBuf,
    entries: Vec<(K, u64)>,
    sync: bool,
}

impl<K: IndexKey> SortedIndex<K> {
    /// Load an index file, creating it empty if absent
    ///
    /// Fails with `Corrupt` on unparsable lines, unsorted or duplicate keys.
    pub fn load(path: &Path, sync: bool) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;

        let mut entries: Vec<(K, u64)> = Vec::new();
        for (line_no, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let line_no = line_no as u64;

            let (key_text, slot_text) = line.rsplit_once(INDEX_SEPARATOR).ok_or_else(|| {
                StoreError::corrupt(path, line_no, format!("missing separator in {:?}", line))
            })?;
            let key = K::parse_key(key_text).ok_or_else(|| {
                StoreError::corrupt(path, line_no, format!("invalid key {:?}", key_text))
            })?;
            let slot: u64 = slot_text.trim().parse().map_err(|_| {
                StoreError::corrupt(path, line_no, format!("invalid slot {:?}", slot_text))
            })?;

            if let Some((prev, _)) = entries.last() {
                if *prev >= key {
                    return Err(StoreError::corrupt(
                        path,
                        line_no,
                        format!("key {} is not greater than previous key {}", key, prev),
                    ));
                }
            }
            entries.push((key, slot));
        }

        Ok(Self {
            path: path.to_path_buf(),
            entries,
            sync,
        })
    }

    /// Build an index from `(key, slot)` pairs in file order
    ///
    /// When a key repeats, the later slot wins.
    pub fn rebuild<I>(path: &Path, sync: bool, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, u64)>,
    {
        let map: BTreeMap<K, u64> = pairs.into_iter().collect();
        Self {
            path: path.to_path_buf(),
            entries: map.into_iter().collect(),
            sync,
        }
    }

    /// Persist all entries, fully replacing the file
    pub fn save(&self) -> Result<()> {
        let tmp_path = temp_path(&self.path);
        {
            let file = File::create(&tmp_path)?;
            let mut writer = BufWriter::new(file);
            for (key, slot) in &self.entries {
                writeln!(writer, "{}{}{}", key, INDEX_SEPARATOR, slot)?;
            }
            writer.flush()?;
            if self.sync {
                writer.get_ref().sync_all()?;
            }
        }
        fs::rename(&tmp_path, &self.path)?;

        debug!(path = %self.path.display(), entries = self.entries.len(), "saved index");
        Ok(())
    }

    /// Slot for `key` — O(log n)
    pub fn get<Q>(&self, key: &Q) -> Option<u64>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.position(key).ok().map(|pos| self.entries[pos].1)
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.position(key).is_ok()
    }

    /// Insert or replace the entry for `key`, keeping the order
    ///
    /// Returns the slot previously stored for `key`, if any.
    pub fn upsert(&mut self, key: K, slot: u64) -> Option<u64> {
        match self.position(&key) {
            Ok(pos) => Some(std::mem::replace(&mut self.entries[pos].1, slot)),
            Err(pos) => {
                self.entries.insert(pos, (key, slot));
                None
            }
        }
    }

    /// Drop the entry for `key` if present
    pub fn remove<Q>(&mut self, key: &Q) -> Option<u64>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let pos = self.position(key).ok()?;
        Some(self.entries.remove(pos).1)
    }

    /// Move the slot of `old_key` under `new_key`
    ///
    /// Returns the slot, or `None` if `old_key` is absent (index unchanged).
    pub fn rekey<Q>(&mut self, old_key: &Q, new_key: K) -> Option<u64>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let slot = self.remove(old_key)?;
        self.upsert(new_key, slot);
        Some(slot)
    }

    pub fn entries(&self) -> &[(K, u64)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn position<Q>(&self, key: &Q) -> std::result::Result<usize, usize>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.entries.binary_search_by(|(k, _)| k.borrow().cmp(key))
    }
}

impl<K: IndexKey> PartialEq for SortedIndex<K> {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}
