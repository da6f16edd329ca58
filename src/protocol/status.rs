//! Status broadcast decoding
//!
//! The device broadcasts its full property set once per second. The payload
//! is a run of 4-byte groups, each a big-endian property id followed by a
//! big-endian 16-bit value. Units and scaling are per-property firmware
//! conventions (temperatures are centikelvin); this layer hands the raw
//! values through untouched.

use crate::catalog::PropertyCatalog;
use crate::error::{Error, Result};
use std::collections::HashMap;

/// One (property id, value) pair in wire order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusEntry {
    /// Property id (e.g. 1051 = sample temperature)
    pub id: u16,
    /// Raw 16-bit value
    pub value: u16,
}

/// Decode a raw broadcast payload into its entries
///
/// Fails when the payload is not a whole number of 4-byte groups. Wire
/// order is preserved, and a duplicated id yields two entries; folding
/// into a snapshot is where the later one wins.
pub fn decode(payload: &[u8]) -> Result<Vec<StatusEntry>> {
    if payload.len() % 4 != 0 {
        return Err(Error::FrameLength { len: payload.len() });
    }

    Ok(payload
        .chunks_exact(4)
        .map(|group| StatusEntry {
            id: u16::from_be_bytes([group[0], group[1]]),
            value: u16::from_be_bytes([group[2], group[3]]),
        })
        .collect())
}

/// The complete decoded property set from one broadcast
///
/// Values are addressable by numeric id and, for ids the catalog documents,
/// by display name. A snapshot is immutable once built; every refresh
/// replaces it wholesale rather than merging into it.
#[derive(Debug, Clone, Default)]
pub struct StatusSnapshot {
    by_id: HashMap<u16, u16>,
    by_name: HashMap<&'static str, u16>,
}

impl StatusSnapshot {
    /// Fold decoded entries into a snapshot
    ///
    /// An id repeated within one payload overwrites its earlier value.
    pub fn build(entries: &[StatusEntry], catalog: &PropertyCatalog) -> Self {
        let mut snapshot = StatusSnapshot {
            by_id: HashMap::with_capacity(entries.len()),
            by_name: HashMap::with_capacity(entries.len()),
        };
        for entry in entries {
            snapshot.by_id.insert(entry.id, entry.value);
            if let Some(name) = catalog.name(entry.id) {
                snapshot.by_name.insert(name, entry.value);
            }
        }
        snapshot
    }

    /// Value by numeric property id
    pub fn get(&self, id: u16) -> Option<u16> {
        self.by_id.get(&id).copied()
    }

    /// Value by catalog display name
    pub fn get_named(&self, name: &str) -> Option<u16> {
        self.by_name.get(name).copied()
    }

    /// Number of distinct property ids held
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// True before the first refresh
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
