//! The fixed catalog of movement files and the user's selection from it.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::DataError;

/// Köchel numbers of the 18 sonatas in catalog order.
const KOECHEL: [u16; 18] = [
    279, 280, 281, 282, 283, 284, 309, 311, 310, 330, 331, 332, 333, 457, 533, 545, 570, 576,
];

const MOVEMENTS_PER_SONATA: u8 = 3;

/// One movement file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Sonata number (1-based)
    pub sonata: u8,
    /// Movement number (1-based)
    pub movement: u8,
    /// Filename stem shared by all kinds of TSVs, e.g. "K279-1"
    pub filename: String,
}

/// Ordered mapping (sonata, movement) → filename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub entries: Vec<CatalogEntry>,
}

impl Catalog {
    /// The Mozart piano sonata corpus: 18 sonatas × 3 movements.
    pub fn mozart_piano_sonatas() -> Self {
        let entries = KOECHEL
            .iter()
            .zip(1u8..)
            .flat_map(|(k, sonata)| {
                (1..=MOVEMENTS_PER_SONATA).map(move |movement| CatalogEntry {
                    sonata,
                    movement,
                    filename: format!("K{k}-{movement}"),
                })
            })
            .collect();
        Self { entries }
    }

    /// Read a replacement catalog from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, DataError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(|e| {
            DataError::ConfigError(format!("could not read catalog '{}': {e}", path.display()))
        })
    }

    /// Entries matching the given sonata and movement numbers, in catalog
    /// order. `None` means no filter; numbers not in the catalog match nothing.
    pub fn select(&self, sonatas: Option<&[u8]>, movements: Option<&[u8]>) -> Vec<&CatalogEntry> {
        self.entries
            .iter()
            .filter(|e| sonatas.map_or(true, |s| s.contains(&e.sonata)))
            .filter(|e| movements.map_or(true, |m| m.contains(&e.movement)))
            .collect()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::mozart_piano_sonatas()
    }
}

/// Human-readable listing of a selection, one movement per line.
pub fn describe_selection(selection: &[&CatalogEntry]) -> String {
    let mut out = String::from("sonata\tmovement\tfilename\n");
    for e in selection {
        out.push_str(&format!("{}\t{}\t{}\n", e.sonata, e.movement, e.filename));
    }
    out
}
