//! Table Module
//!
//! Binds a `RecordFile` + `SortedIndex` pair to a typed row codec.
//!
//! ## Responsibilities
//! - Insert rows (append + index upsert + index save)
//! - Point lookups through the index
//! - Lazy, restartable full scans in file order
//! - In-place field updates with slot patching
//! - Physical removal with slot renumbering and index rebuild

mod codec;

use std::borrow::Borrow;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::storage::{RecordFile, SlotIter, SortedIndex};

pub use codec::{Record, FIELD_SEPARATOR};

/// Typed view over one record file and its index
///
/// ## Concurrency:
/// - `index`: Protected by RwLock (lookups share, mutations are exclusive)
/// - Mutations hold the index write lock for the whole file update, so the
///   slot numbers they record always match the record file
pub struct Table<R: Record> {
    records: RecordFile,
    index: RwLock<SortedIndex<R::Key>>,
    _row: PhantomData<fn() -> R>,
}

impl<R: Record> Table<R> {
    /// Open the table's two files under `dir`, creating them if absent
    pub fn open(dir: &Path, width: usize, sync: bool) -> Result<Self> {
        let records = RecordFile::open(&dir.join(R::RECORD_FILE), width, sync)?;
        let index: SortedIndex<R::Key> = SortedIndex::load(&dir.join(R::INDEX_FILE), sync)?;

        debug!(table = R::TABLE, entries = index.len(), "opened table");

        Ok(Self {
            records,
            index: RwLock::new(index),
            _row: PhantomData,
        })
    }

    /// Append `row` and point its key at the new slot
    ///
    /// An existing entry for the same key is replaced; its old slot stays in
    /// the record file.
    pub fn insert(&self, row: R) -> Result<R> {
        let text = row.encode()?;

        let mut index = self.index.write();
        let slot = self.records.append(&text)?;
        if let Some(previous) = index.upsert(row.key(), slot) {
            debug!(table = R::TABLE, key = %row.key(), previous, "key re-inserted");
        }
        index.save()?;

        debug!(table = R::TABLE, key = %row.key(), slot, "inserted row");
        Ok(row)
    }

    /// Look up a row by primary key; `Ok(None)` when the key is absent
    pub fn get<Q>(&self, key: &Q) -> Result<Option<R>>
    where
        R::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let index = self.index.read();
        match index.get(key) {
            Some(slot) => self.read_row(slot).map(Some),
            None => Ok(None),
        }
    }

    /// Lazily decode every slot from the start of the file
    pub fn scan(&self) -> Result<RecordIter<R>> {
        Ok(RecordIter {
            slots: self.records.slots()?,
            path: self.records.path().to_path_buf(),
            _row: PhantomData,
        })
    }

    /// Scan, keeping rows that match `predicate`; errors are passed through
    pub fn scan_filter<F>(&self, predicate: F) -> Result<impl Iterator<Item = Result<R>>>
    where
        F: Fn(&R) -> bool,
    {
        Ok(self
            .scan()?
            .filter(move |row| row.as_ref().map_or(true, |r| predicate(r))))
    }

    /// Decode the row stored under `key`, apply `mutator`, write it back
    ///
    /// If the mutator changes the primary key the index entry moves with it
    /// (same slot). Fails with `NotFound` if `key` is absent and with
    /// `InvalidField` if the new key is already taken.
    pub fn update<Q, F>(&self, key: &Q, mutator: F) -> Result<R>
    where
        R::Key: Borrow<Q>,
        Q: Ord + ToString + ?Sized,
        F: FnOnce(&mut R),
    {
        let mut index = self.index.write();
        let slot = index
            .get(key)
            .ok_or_else(|| StoreError::not_found(R::TABLE, key.to_string()))?;

        let mut row = self.read_row(slot)?;
        mutator(&mut row);
        let text = row.encode()?;
        // must fit before the index moves
        self.records.pad(&text)?;

        let new_key = row.key();
        if <R::Key as Borrow<Q>>::borrow(&new_key) != key {
            if index.contains::<R::Key>(&new_key) {
                return Err(StoreError::InvalidField {
                    field: "key",
                    reason: format!("{} key {} already exists", R::TABLE, new_key),
                });
            }
            index.rekey(key, new_key);
            index.save()?;
        }

        self.records.replace_slot(slot, &text)?;

        debug!(table = R::TABLE, key = %row.key(), slot, "updated row");
        Ok(row)
    }

    /// Physically drop every slot holding `key` and rebuild the index
    ///
    /// Later slots shift down, so the index is recomputed from the
    /// remaining rows. Returns the row the index pointed at.
    pub fn remove<Q>(&self, key: &Q) -> Result<R>
    where
        R::Key: Borrow<Q>,
        Q: Ord + ToString + ?Sized,
    {
        let mut index = self.index.write();

        let mut removed = None;
        let mut kept_text = Vec::new();
        let mut kept_keys = Vec::new();
        for row in self.scan()? {
            let row = row?;
            if <R::Key as Borrow<Q>>::borrow(&row.key()) == key {
                removed = Some(row);
            } else {
                kept_text.push(row.encode()?);
                kept_keys.push(row.key());
            }
        }

        let removed = removed.ok_or_else(|| StoreError::not_found(R::TABLE, key.to_string()))?;

        self.records.rewrite_all(&kept_text)?;
        let index_path = index.path().to_path_buf();
        *index = SortedIndex::rebuild(&index_path, self.sync(), kept_keys.into_iter().zip(0u64..));
        index.save()?;

        debug!(table = R::TABLE, key = %removed.key(), remaining = index.len(), "removed row");
        Ok(removed)
    }

    /// Recompute the index from the record file and save it if it drifted
    ///
    /// Returns true when the stored index was wrong.
    pub fn rebuild_index(&self) -> Result<bool> {
        let mut index = self.index.write();
        let fresh = self.fresh_index(&index)?;
        if fresh == *index {
            return Ok(false);
        }

        *index = fresh;
        index.save()?;
        Ok(true)
    }

    /// True when the in-memory index disagrees with the record file
    pub fn index_drift(&self) -> Result<bool> {
        let index = self.index.read();
        Ok(self.fresh_index(&index)? != *index)
    }

    /// Snapshot of the index entries in key order
    pub fn index_entries(&self) -> Vec<(R::Key, u64)> {
        self.index.read().entries().to_vec()
    }

    /// Number of indexed keys
    pub fn len(&self) -> usize {
        self.index.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.read().is_empty()
    }

    pub fn record_file(&self) -> &RecordFile {
        &self.records
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn read_row(&self, slot: u64) -> Result<R> {
        let text = self.records.read_slot(slot)?;
        R::decode(&text).map_err(|reason| StoreError::corrupt(self.records.path(), slot, reason))
    }

    fn fresh_index(&self, current: &SortedIndex<R::Key>) -> Result<SortedIndex<R::Key>> {
        let mut pairs = Vec::new();
        for (slot, row) in self.scan()?.enumerate() {
            pairs.push((row?.key(), slot as u64));
        }
        Ok(SortedIndex::rebuild(current.path(), self.sync(), pairs))
    }

    fn sync(&self) -> bool {
        self.records.sync()
    }
}

/// Lazy iterator of decoded rows in file order
pub struct RecordIter<R: Record> {
    slots: SlotIter,
    path: PathBuf,
    _row: PhantomData<fn() -> R>,
}

impl<R: Record> Iterator for RecordIter<R> {
    type Item = Result<R>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.slots.next()?;
        Some(item.and_then(|(slot, text)| {
            R::decode(&text).map_err(|reason| StoreError::corrupt(&self.path, slot, reason))
        }))
    }
}
