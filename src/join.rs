//! Align notes, harmony labels and cadence labels into one table.
//!
//! The tables live on different grids: notes and harmonies carry a reliable
//! `mc`, cadences are located by `(mn, onset)` only.  Notes and harmonies are
//! outer-joined on `(mc, mn, onset)`, cadences are adjoined on `(mn, onset)`,
//! and rows contributed by cadences alone get their `mc` from the measures
//! table.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::error::DataError;
use crate::model::{Fraction, Kind, Mc, Row, Table, Value};

/// Join at least two of notes, harmonies and cadences.
///
/// `measures` is only consulted to fill in missing `mc` values.  The result
/// starts with the `mn` and `onset` columns; every input row survives, and
/// rows sharing a key are combined pairwise.
pub fn join(mut tables: BTreeMap<Kind, Table>) -> Result<Table, DataError> {
    let annotations = [Kind::Notes, Kind::Harmonies, Kind::Cadences]
        .iter()
        .filter(|k| tables.contains_key(*k))
        .count();
    if annotations < 2 {
        return Err(DataError::JoinError(
            "Select at least two kinds of data for joining.".to_string(),
        ));
    }

    let notes = tables.remove(&Kind::Notes);
    let harmonies = tables.remove(&Kind::Harmonies);
    let cadences = tables.remove(&Kind::Cadences);
    let measures = tables.remove(&Kind::Measures);

    let left = match (notes, harmonies) {
        (Some(notes), Some(harmonies)) => {
            log::info!("Joining notes with harmony labels...");
            outer_join(&notes, &harmonies, &["mc", "mn", "onset"])?.move_column_to_front("mc")
        }
        (Some(table), None) | (None, Some(table)) => table,
        (None, None) => unreachable!("two annotation kinds were checked above"),
    };

    let joined = match cadences {
        Some(cadences) => {
            log::info!("Adjoining cadence labels...");
            outer_join(&left, &cadences, &["mn", "onset"])?
        }
        None => left,
    };
    let joined = joined.move_column_to_front("onset").move_column_to_front("mn");

    fill_missing_mc(joined, measures.as_ref())
}

/// Full outer join of two tables on the given key columns, per file.
///
/// Output columns: the keys, then the left table's other columns, then the
/// right table's columns not already present.  Where both tables have a
/// column, the left value wins and the right one fills left nulls, so
/// right-only values are kept instead of being dropped with the duplicate
/// column.  Rows
/// are sorted by key within each file; files keep their order of first
/// appearance.
pub fn outer_join(left: &Table, right: &Table, keys: &[&str]) -> Result<Table, DataError> {
    let left_keys = keys
        .iter()
        .map(|k| left.require_column(k))
        .collect::<Result<Vec<_>, _>>()?;
    let right_keys = keys
        .iter()
        .map(|k| right.require_column(k))
        .collect::<Result<Vec<_>, _>>()?;

    let left_rest: Vec<usize> = (0..left.columns.len())
        .filter(|i| !left_keys.contains(i))
        .collect();
    // right column → position among the left columns, if shared
    let right_rest: Vec<(usize, Option<usize>)> = (0..right.columns.len())
        .filter(|i| !right_keys.contains(i))
        .map(|i| {
            let shared = left_rest
                .iter()
                .position(|&l| left.columns[l] == right.columns[i]);
            (i, shared)
        })
        .collect();

    let mut columns: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
    columns.extend(left_rest.iter().map(|&i| left.columns[i].clone()));
    columns.extend(
        right_rest
            .iter()
            .filter(|(_, shared)| shared.is_none())
            .map(|&(i, _)| right.columns[i].clone()),
    );
    let mut result = Table::new(columns);

    let mut files: Vec<&str> = left.files();
    for f in right.files() {
        if !files.contains(&f) {
            files.push(f);
        }
    }

    for file in files {
        let left_groups = group_by_key(left, file, &left_keys);
        let right_groups = group_by_key(right, file, &right_keys);
        let all_keys: BTreeSet<&Vec<Value>> =
            left_groups.keys().chain(right_groups.keys()).collect();

        for key in all_keys {
            let lefts = left_groups.get(key).map(Vec::as_slice).unwrap_or(&[]);
            let rights = right_groups.get(key).map(Vec::as_slice).unwrap_or(&[]);
            let pairs: Vec<(Option<&Row>, Option<&Row>)> = match (lefts, rights) {
                ([], rs) => rs.iter().map(|r| (None, Some(*r))).collect(),
                (ls, []) => ls.iter().map(|l| (Some(*l), None)).collect(),
                (ls, rs) => ls
                    .iter()
                    .flat_map(|l| rs.iter().map(move |r| (Some(*l), Some(*r))))
                    .collect(),
            };

            for (l, r) in pairs {
                let mut values = key.clone();
                let start = values.len();
                values.extend(left_rest.iter().map(|&i| {
                    l.map_or(Value::Null, |row| row.values[i].clone())
                }));
                for &(i, shared) in &right_rest {
                    let v = r.map_or(Value::Null, |row| row.values[i].clone());
                    match shared {
                        Some(pos) => {
                            if values[start + pos].is_null() {
                                values[start + pos] = v;
                            }
                        }
                        None => values.push(v),
                    }
                }
                result.push_row(file, values);
            }
        }
    }

    Ok(result)
}

fn group_by_key<'a>(
    table: &'a Table,
    file: &str,
    key_cols: &[usize],
) -> BTreeMap<Vec<Value>, Vec<&'a Row>> {
    let mut groups: BTreeMap<Vec<Value>, Vec<&Row>> = BTreeMap::new();
    for row in table.rows.iter().filter(|r| r.file == file) {
        let key = key_cols.iter().map(|&i| row.values[i].clone()).collect();
        groups.entry(key).or_default().push(row);
    }
    groups
}

/// Where each measure number starts, per file: `(offset within mn, mc)`.
struct MeasureLookup {
    by_mn: HashMap<(String, i64), Vec<(Fraction, Mc)>>,
}

impl MeasureLookup {
    fn new(measures: &Table) -> Result<Self, DataError> {
        let mc_col = measures.require_column("mc")?;
        let mn_col = measures.require_column("mn")?;
        let offset_col = measures.column_index("offset");

        let mut by_mn: HashMap<(String, i64), Vec<(Fraction, Mc)>> = HashMap::new();
        for row in &measures.rows {
            let (Some(mc), Some(mn)) = (row.values[mc_col].as_mc(), row.values[mn_col].as_int())
            else {
                continue;
            };
            let offset = offset_col
                .and_then(|i| row.values[i].as_fraction())
                .unwrap_or_else(|| Fraction::from_integer(0));
            by_mn
                .entry((row.file.clone(), mn))
                .or_default()
                .push((offset, mc));
        }
        Ok(Self { by_mn })
    }

    /// The mc of measure number `mn` that contains `onset`: the latest
    /// measure part starting at or before the onset.  Among alternatives
    /// starting at the same offset (first and second endings) the one
    /// encoded last wins.
    fn resolve(&self, file: &str, mn: i64, onset: Fraction) -> Option<Mc> {
        let candidates = self.by_mn.get(&(file.to_string(), mn))?;
        let mut best: Option<(Fraction, Mc)> = None;
        for &(offset, mc) in candidates {
            if offset <= onset && best.map_or(true, |(b, _)| offset >= b) {
                best = Some((offset, mc));
            }
        }
        best.or_else(|| candidates.first().copied()).map(|(_, mc)| mc)
    }
}

fn fill_missing_mc(mut table: Table, measures: Option<&Table>) -> Result<Table, DataError> {
    let mc_col = match table.column_index("mc") {
        Some(i) => i,
        None => {
            // keep mc right after the (mn, onset) keys
            let at = 2usize.min(table.columns.len());
            table.columns.insert(at, "mc".to_string());
            for row in &mut table.rows {
                row.values.insert(at, Value::Null);
            }
            at
        }
    };
    let mn_col = table.require_column("mn")?;
    let onset_col = table.require_column("onset")?;

    if !table.rows.iter().any(|r| r.values[mc_col].is_null()) {
        return Ok(table);
    }
    let measures = measures.ok_or_else(|| {
        DataError::JoinError("the measures table is needed to resolve missing mc values".into())
    })?;
    let lookup = MeasureLookup::new(measures)?;

    for row in &mut table.rows {
        if !row.values[mc_col].is_null() {
            continue;
        }
        let mn = row.values[mn_col].as_int();
        let onset = row.values[onset_col].as_fraction();
        let resolved = match (mn, onset) {
            (Some(mn), Some(onset)) => lookup.resolve(&row.file, mn, onset),
            _ => None,
        };
        match resolved {
            Some(mc) => row.values[mc_col] = Value::Int(i64::from(mc)),
            None => log::warn!(
                "{}: no measure found for mn {:?}, onset {:?}",
                row.file,
                row.values[mn_col],
                row.values[onset_col]
            ),
        }
    }
    Ok(table)
}
