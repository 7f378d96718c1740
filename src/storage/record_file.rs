//! Fixed-Record File
//!
//! Append-only sequence of fixed-width text slots.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Result, StoreError};

use super::{FILLER, TERMINATOR};

/// A record file where every slot is `width` bytes plus a newline
///
/// Slots are 0-indexed and contiguous, so slot `n` always starts at byte
/// `n * (width + 1)`.
#[derive(Debug)]
pub struct RecordFile {
    path: PathBuf,
    width: usize,
    sync: bool,
}

impl RecordFile {
    /// Open a record file, creating it empty if absent
    pub fn open(path: &Path, width: usize, sync: bool) -> Result<Self> {
        OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            width,
            sync,
        })
    }

    /// Append a row, returning its slot number
    pub fn append(&self, row: &str) -> Result<u64> {
        let slot_text = self.pad(row)?;
        let slot = self.slot_count()?;

        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        file.write_all(slot_text.as_bytes())?;
        if self.sync {
            file.sync_data()?;
        }

        debug!(path = %self.path.display(), slot, "appended record");
        Ok(slot)
    }

    /// Number of slots currently in the file
    pub fn slot_count(&self) -> Result<u64> {
        let len = fs::metadata(&self.path)?.len();
        let stride = self.stride();
        if len % stride != 0 {
            return Err(StoreError::corrupt(
                &self.path,
                len / stride,
                format!("file length {} is not a multiple of slot size {}", len, stride),
            ));
        }
        Ok(len / stride)
    }

    /// Read a single slot by seeking straight to it
    pub fn read_slot(&self, slot: u64) -> Result<String> {
        let offset = slot.checked_mul(self.stride()).ok_or_else(|| {
            StoreError::corrupt(&self.path, slot, "slot offset overflows file size")
        })?;
        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(offset))?;

        let mut buf = vec![0u8; self.width + 1];
        if let Err(e) = file.read_exact(&mut buf) {
            return Err(match e.kind() {
                ErrorKind::UnexpectedEof => {
                    StoreError::corrupt(&self.path, slot, "slot is beyond end of file")
                }
                _ => StoreError::Io(e),
            });
        }

        decode_slot(&self.path, slot, self.width, buf)
    }

    /// Overwrite one slot in place; neighbours are untouched
    pub fn replace_slot(&self, slot: u64, row: &str) -> Result<()> {
        let slot_text = self.pad(row)?;
        let count = self.slot_count()?;
        if slot >= count {
            return Err(StoreError::corrupt(
                &self.path,
                slot,
                format!("cannot replace slot {} of {}", slot, count),
            ));
        }

        let mut file = OpenOptions::new().write(true).open(&self.path)?;
        file.seek(SeekFrom::Start(slot * self.stride()))?;
        file.write_all(slot_text.as_bytes())?;
        if self.sync {
            file.sync_data()?;
        }

        debug!(path = %self.path.display(), slot, "patched record");
        Ok(())
    }

    /// Lazily iterate `(slot, row)` pairs from the start of the file
    pub fn slots(&self) -> Result<SlotIter> {
        let file = File::open(&self.path)?;
        Ok(SlotIter {
            path: self.path.clone(),
            reader: BufReader::new(file),
            width: self.width,
            next_slot: 0,
        })
    }

    /// Read every slot into memory, padding stripped
    pub fn read_all(&self) -> Result<Vec<String>> {
        self.slots()?
            .map(|slot| slot.map(|(_, row)| row))
            .collect()
    }

    /// Replace the whole file with `rows`, renumbering slots from zero
    ///
    /// Written to a sibling temp file and renamed over the original.
    pub fn rewrite_all<I, S>(&self, rows: I) -> Result<u64>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tmp_path = temp_path(&self.path);
        let mut written = 0u64;
        {
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp_path)?;
            let mut writer = BufWriter::new(file);
            for row in rows {
                writer.write_all(self.pad(row.as_ref())?.as_bytes())?;
                written += 1;
            }
            writer.flush()?;
            if self.sync {
                writer.get_ref().sync_all()?;
            }
        }
        fs::rename(&tmp_path, &self.path)?;

        debug!(path = %self.path.display(), slots = written, "rewrote record file");
        Ok(written)
    }

    /// Right-pad `row` with filler up to the slot width and terminate it
    pub fn pad(&self, row: &str) -> Result<String> {
        if row.contains(TERMINATOR) {
            return Err(StoreError::InvalidField {
                field: "record",
                reason: "record text contains a line break".to_string(),
            });
        }
        if row.len() > self.width {
            return Err(StoreError::RecordTooLong {
                len: row.len(),
                width: self.width,
            });
        }

        let mut out = String::with_capacity(self.width + 1);
        out.push_str(row);
        out.extend(std::iter::repeat(FILLER).take(self.width - row.len()));
        out.push(TERMINATOR);
        Ok(out)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether writes are fsynced
    pub fn sync(&self) -> bool {
        self.sync
    }

    fn stride(&self) -> u64 {
        self.width as u64 + 1
    }
}

/// Lazy iterator over the slots of a record file
///
/// Holds its own file handle, released when the iterator is dropped.
pub struct SlotIter {
    path: PathBuf,
    reader: BufReader<File>,
    width: usize,
    next_slot: u64,
}

impl Iterator for SlotIter {
    type Item = Result<(u64, String)>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut buf = Vec::with_capacity(self.width + 1);
        match self.reader.read_until(TERMINATOR as u8, &mut buf) {
            Ok(0) => return None,
            Ok(_) => {}
            Err(e) => return Some(Err(StoreError::Io(e))),
        }

        let slot = self.next_slot;
        self.next_slot += 1;
        Some(decode_slot(&self.path, slot, self.width, buf).map(|row| (slot, row)))
    }
}

fn decode_slot(path: &Path, slot: u64, width: usize, mut buf: Vec<u8>) -> Result<String> {
    if buf.len() != width + 1 || buf.last() != Some(&(TERMINATOR as u8)) {
        return Err(StoreError::corrupt(
            path,
            slot,
            format!("expected {} byte slot, found {} bytes", width + 1, buf.len()),
        ));
    }
    buf.pop();

    let text = String::from_utf8(buf)
        .map_err(|e| StoreError::corrupt(path, slot, format!("invalid UTF-8: {}", e)))?;
    Ok(text.trim_end_matches(FILLER).to_string())
}

/// `cars.txt` → `cars.txt.tmp`
pub(crate) fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
