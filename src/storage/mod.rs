//! Storage Module
//!
//! Flat-file storage primitives shared by every table.
//!
//! ## Responsibilities
//! - Fixed-width record slots, addressable by line number
//! - Sorted key → slot index files, rewritten on every mutation
//! - Temp-file + rename for whole-file rewrites
//!
//! ## Record File Format
//! ```text
//! ┌──────────────────────────────────────────────┬────┐
//! │ field;field;field<spaces up to width>        │ \n │  slot 0
//! ├──────────────────────────────────────────────┼────┤
//! │ field;field;field<spaces up to width>        │ \n │  slot 1
//! └──────────────────────────────────────────────┴────┘
//! ```
//!
//! ## Index File Format
//! ```text
//! key;slot      (one per line, ascending by key)
//! ```

mod index;
mod record_file;

pub use index::{IndexKey, SortedIndex};
pub use record_file::{RecordFile, SlotIter};

// =============================================================================
// Shared Constants
// =============================================================================

/// Padding byte appended after the row text
pub(crate) const FILLER: char = ' ';

/// Slot terminator
pub(crate) const TERMINATOR: char = '\n';

/// Separator between key and slot number in index files
pub(crate) const INDEX_SEPARATOR: char = ';';
