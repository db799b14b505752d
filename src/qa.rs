//! Quality checks for harmony annotations in converted scores: labels that
//! go back in time, and different labels sharing one position.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::annotations::{harmony_labels, HarmonyLabel};
use crate::error::DataError;
use crate::model::Fraction;
use crate::mxl::read_score_xml;

/// Score position of a label: measure number, then offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Location {
    pub measure: i64,
    pub offset: Fraction,
}

impl Location {
    pub fn of(label: &HarmonyLabel) -> Self {
        Self {
            measure: label.measure,
            offset: label.offset,
        }
    }
}

impl fmt::Display for Location {
    /// `MMM-O.OO`, e.g. `012-1.50`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let offset = *self.offset.numer() as f64 / *self.offset.denom() as f64;
        write!(f, "{:03}-{offset:.2}", self.measure)
    }
}

/// A problem found in one file's labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
    /// The label comes before the previous label in the score.
    WeirdLocation { location: Location, label: String },
    /// A different label already occupies the position.
    Collision {
        location: Location,
        existing: String,
        label: String,
    },
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Finding::WeirdLocation { location, label } => {
                write!(f, "weird location {location} for {label}")
            }
            Finding::Collision {
                location,
                existing,
                label,
            } => write!(f, "collision at {location}: {existing} vs {label}"),
        }
    }
}

/// Check labels in document order.  Colliding labels do not replace the
/// label already recorded at their position.
pub fn check_labels(labels: &[HarmonyLabel]) -> Vec<Finding> {
    let mut findings = Vec::new();
    let mut recorded: BTreeMap<Location, &str> = BTreeMap::new();
    let mut previous = Location {
        measure: 0,
        offset: Fraction::from_integer(0),
    };

    for label in labels {
        let location = Location::of(label);
        if location < previous {
            findings.push(Finding::WeirdLocation {
                location,
                label: label.label.clone(),
            });
        }
        match recorded.get(&location) {
            Some(existing) if !existing.is_empty() && *existing != label.label => {
                findings.push(Finding::Collision {
                    location,
                    existing: existing.to_string(),
                    label: label.label.clone(),
                });
            }
            _ => {
                recorded.insert(location, &label.label);
            }
        }
        previous = location;
    }
    findings
}

/// Result of scanning one score.
#[derive(Debug, Clone)]
pub struct FileReport {
    pub path: PathBuf,
    /// Lowercase filename stem, e.g. "k279-1"
    pub stem: String,
    pub labels: usize,
    pub findings: Vec<Finding>,
}

impl FileReport {
    /// Dataset registry entry pairing the score with its RomanText file.
    pub fn registry_line(&self) -> String {
        let stem = &self.stem;
        format!(
            "\"mps-{stem}\": (\"rawdata/mozart_piano_sonatas/mxl/{stem}.mxl\", \
             \"rawdata/mozart_piano_sonatas/rntxt/{stem}.rntxt\"),"
        )
    }
}

/// Scan one .mxl (or uncompressed MusicXML) file.
pub fn scan_file<P: AsRef<Path>>(path: P) -> Result<FileReport, DataError> {
    let path = path.as_ref();
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_lowercase();
    let xml = read_score_xml(path)?;
    let labels = harmony_labels(&xml)?;
    log::debug!("{}: {} harmony labels", path.display(), labels.len());
    Ok(FileReport {
        path: path.to_path_buf(),
        stem,
        labels: labels.len(),
        findings: check_labels(&labels),
    })
}

/// The .mxl files directly under `root`, in natural order.
pub fn mxl_files<P: AsRef<Path>>(root: P) -> Result<Vec<PathBuf>, DataError> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(root.as_ref())?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("mxl"))
        .collect();
    files.sort_by(|a, b| {
        let a = a.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        let b = b.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        natural_cmp(a, b)
    });
    Ok(files)
}

/// Scan every .mxl file under `root`.
pub fn scan_dir<P: AsRef<Path>>(root: P) -> Result<Vec<FileReport>, DataError> {
    mxl_files(root)?.iter().map(scan_file).collect()
}

/// Compare strings treating digit runs as numbers ("k2" < "k10").
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut a = a.chars().peekable();
    let mut b = b.chars().peekable();
    loop {
        match (a.peek().copied(), b.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let na = take_number(&mut a);
                let nb = take_number(&mut b);
                match na.cmp(&nb) {
                    Ordering::Equal => {}
                    other => return other,
                }
            }
            (Some(x), Some(y)) => {
                match x.to_ascii_lowercase().cmp(&y.to_ascii_lowercase()) {
                    Ordering::Equal => {}
                    other => return other,
                }
                a.next();
                b.next();
            }
        }
    }
}

fn take_number(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> u128 {
    let mut n: u128 = 0;
    while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
        n = n.saturating_mul(10).saturating_add(u128::from(d));
        chars.next();
    }
    n
}
