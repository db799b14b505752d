//! Format the corpus data to the user's needs: select movements, load their
//! tables, optionally unfold and join them, and store the results as TSV.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::catalog::{describe_selection, Catalog};
use crate::error::DataError;
use crate::join::join;
use crate::model::{Kind, Table};
use crate::tsv::{read_tsvs, store_result};
use crate::unfold::{drop_first_endings, Unfolding};

/// Printed when no kind of data was requested.
pub const USAGE: &str = "Select the kind of data: -N for notes, -H for harmony labels, \
-M for measures, and -C for cadence labels. Pass -j to join several kinds into a single TSV.";

/// Printed when the selection is empty.
pub const NO_DATA: &str = "No data matching your selection.";

/// One run's settings, fixed before any data is read.
#[derive(Debug, Clone, Default)]
pub struct FormatOptions {
    /// Basename of the output files
    pub name: String,
    /// Existing directory receiving the output files
    pub out_dir: PathBuf,
    /// Directory holding `notes/`, `harmonies/`, `cadences/`, `measures/`
    pub data_dir: PathBuf,
    pub unfold: bool,
    pub sonatas: Option<Vec<u8>>,
    pub movements: Option<Vec<u8>>,
    /// Only show the selection
    pub test: bool,
    pub notes: bool,
    pub harmonies: bool,
    pub cadences: bool,
    pub measures: bool,
    pub join: bool,
    /// Spread labels over the joined rows (not implemented)
    pub propagate: bool,
}

impl FormatOptions {
    /// Requested annotation kinds, measures excluded.
    pub fn annotation_kinds(&self) -> Vec<Kind> {
        [
            (Kind::Notes, self.notes),
            (Kind::Harmonies, self.harmonies),
            (Kind::Cadences, self.cadences),
        ]
        .into_iter()
        .filter_map(|(kind, on)| on.then_some(kind))
        .collect()
    }

    fn any_kind(&self) -> bool {
        self.notes || self.harmonies || self.cadences || self.measures
    }
}

/// What a run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// `--test`: the listing of the selected movements
    Selection(String),
    /// No kind of data selected
    Usage,
    /// The filters exclude every movement
    NoData,
    /// Paths of the written TSVs
    Stored(Vec<PathBuf>),
}

/// Execute one formatting run.
pub fn run(options: &FormatOptions, catalog: &Catalog) -> Result<Outcome, DataError> {
    let selection = catalog.select(options.sonatas.as_deref(), options.movements.as_deref());

    if options.test {
        return Ok(Outcome::Selection(describe_selection(&selection)));
    }
    if !options.any_kind() {
        return Ok(Outcome::Usage);
    }
    if selection.is_empty() {
        return Ok(Outcome::NoData);
    }

    let kinds = options.annotation_kinds();
    if options.join && kinds.len() < 2 {
        return Err(DataError::JoinError(
            "Select at least two kinds of data for joining.".to_string(),
        ));
    }
    let load_measures = options.join || options.unfold || options.measures;

    let mut to_read = kinds.clone();
    if load_measures {
        to_read.push(Kind::Measures);
    }
    log::info!("Reading {} TSV files...", selection.len() * to_read.len());
    let mut tables: BTreeMap<Kind, Table> = BTreeMap::new();
    for kind in &to_read {
        let dir = options.data_dir.join(kind.dir_name());
        tables.insert(*kind, read_tsvs(&dir, &selection)?);
    }

    let unfolding = if options.unfold {
        log::info!("Calculating unfolding structures...");
        let measures = tables.get(&Kind::Measures).ok_or_else(|| {
            DataError::ConfigError("unfolding needs the measures table".to_string())
        })?;
        Some(Unfolding::from_measures(measures)?)
    } else {
        None
    };

    if options.propagate {
        log::warn!("--propagate is not implemented; labels are not spread out");
    }

    let mut stored = Vec::new();
    let out_dir = options.out_dir.as_path();

    if options.join {
        let joined = join(tables.clone())?;
        let joined = match &unfolding {
            Some(unfolding) => {
                log::info!("Unfolding joined table...");
                unfolding.unfold_table(joined)?
            }
            None => joined.drop_column("volta"),
        };
        stored.push(store_result(&joined, out_dir, &options.name, None)?);
    } else {
        for kind in &kinds {
            let Some(table) = tables.remove(kind) else {
                continue;
            };
            let table = match &unfolding {
                Some(unfolding) => {
                    log::info!("Unfolding {kind}...");
                    unfolding.unfold_table(table)?
                }
                None => drop_first_endings(table),
            };
            stored.push(store_result(&table, out_dir, &options.name, Some(*kind))?);
        }
    }

    if options.measures {
        if let Some(measures) = tables.get(&Kind::Measures) {
            stored.push(store_result(
                measures,
                out_dir,
                &options.name,
                Some(Kind::Measures),
            )?);
        }
    }

    Ok(Outcome::Stored(stored))
}

/// Resolve the output directory against the working directory.  A missing
/// directory is created if `confirm` agrees, otherwise it is an error.
pub fn resolve_output_dir<F>(dir: &Path, confirm: F) -> Result<PathBuf, DataError>
where
    F: FnOnce(&Path) -> bool,
{
    let dir = if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        std::env::current_dir()?.join(dir)
    };
    if !dir.is_dir() {
        if confirm(&dir) {
            std::fs::create_dir_all(&dir)?;
        } else {
            return Err(DataError::ConfigError(format!(
                "{} needs to be an existing directory",
                dir.display()
            )));
        }
    }
    Ok(dir)
}
