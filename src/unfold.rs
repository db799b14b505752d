//! Unfold a movement by following each measure's successor list into the
//! linear, play-order sequence of measures.  Every annotation table can then
//! be reordered along that sequence.
//!
//! Handles:
//! - Linear continuation (one successor)
//! - Repeat signs (a successor pointing back to an earlier mc)
//! - First / second endings (a bar with two successors)
//! - A final bar that repeats back to an earlier point
//!
//! More than two alternative endings are rejected when the graph is built.

use std::collections::HashMap;

use crate::error::DataError;
use crate::model::{Mc, Table, Value};

/// Where playback continues after a measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Successors {
    /// End of the movement.
    Terminal,
    /// Linear continuation, or a repeat back to an earlier bar.
    Linear(Mc),
    /// Branch point of a first/second ending.
    Volta { first: Mc, second: Mc },
}

impl Successors {
    /// Classify the `next` list of measure `mc`.
    pub fn from_next(mc: Mc, next: &[Mc]) -> Result<Self, DataError> {
        match *next {
            [] => Ok(Successors::Terminal),
            [to] => Ok(Successors::Linear(to)),
            [first, second] => Ok(Successors::Volta { first, second }),
            _ => Err(DataError::UnsupportedVolta {
                mc,
                successors: next.len(),
            }),
        }
    }
}

/// Which ending a branch point leads to next.  Once the last measure has
/// been repeated from, the same state marks the repeat as taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    First,
    Second,
}

impl Pass {
    const fn toggled(self) -> Self {
        match self {
            Pass::First => Pass::Second,
            Pass::Second => Pass::First,
        }
    }
}

/// The measures of one movement in encoding order.
#[derive(Debug, Clone)]
pub struct MeasureGraph {
    order: Vec<Mc>,
    successors: HashMap<Mc, Successors>,
}

impl MeasureGraph {
    /// Build the graph from `(mc, next)` pairs in encoding order.
    pub fn new(measures: &[(Mc, Vec<Mc>)]) -> Result<Self, DataError> {
        let mut order = Vec::with_capacity(measures.len());
        let mut successors = HashMap::with_capacity(measures.len());
        for (mc, next) in measures {
            if successors
                .insert(*mc, Successors::from_next(*mc, next)?)
                .is_some()
            {
                return Err(DataError::ParsingError(format!(
                    "mc {mc} appears twice in the measure table"
                )));
            }
            order.push(*mc);
        }
        Ok(Self { order, successors })
    }

    /// Build the graph of `file` from a measures table (`mc` and `next` columns).
    pub fn from_table(measures: &Table, file: &str) -> Result<Self, DataError> {
        let mc_col = measures.require_column("mc")?;
        let next_col = measures.require_column("next")?;
        let pairs = measures
            .rows_of(file)
            .map(|row| {
                let mc = row.values[mc_col].as_mc().ok_or_else(|| {
                    DataError::ParsingError(format!("{file}: invalid mc {:?}", row.values[mc_col]))
                })?;
                let next = row.values[next_col].as_list().unwrap_or(&[]).to_vec();
                Ok::<_, DataError>((mc, next))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(&pairs)
    }

    /// Walk the graph from the first to the last measure, taking the first
    /// ending on the first visit of a branch point and the second ending on
    /// the next one.  A last measure with a single successor is repeated
    /// from exactly once.
    pub fn unfold(&self) -> Result<Vec<Mc>, DataError> {
        let (Some(&first), Some(&last)) = (self.order.first(), self.order.last()) else {
            return Ok(Vec::new());
        };

        // Every mc is played at most twice in a well-formed movement.
        let limit = self.order.len() * 2;

        let mut sequence = vec![first];
        let mut current = first;
        let mut pass = Pass::First;

        loop {
            let successors = self.successors_of(current)?;
            let next = if current == last {
                match (successors, pass) {
                    (_, Pass::Second) | (Successors::Terminal, _) => break,
                    (Successors::Linear(to), Pass::First) => {
                        pass = Pass::Second;
                        to
                    }
                    (Successors::Volta { .. }, Pass::First) => {
                        return Err(DataError::UnsupportedFinalBranch { mc: current })
                    }
                }
            } else {
                match successors {
                    Successors::Terminal => {
                        return Err(DataError::UnexpectedTerminal { mc: current })
                    }
                    Successors::Linear(to) => to,
                    Successors::Volta { first, second } => {
                        let to = match pass {
                            Pass::First => first,
                            Pass::Second => second,
                        };
                        pass = pass.toggled();
                        to
                    }
                }
            };

            sequence.push(next);
            if sequence.len() > limit {
                log::warn!(
                    "unfolding hit safety limit ({limit} measures), raw measures: {}",
                    self.order.len()
                );
                return Err(DataError::NonTerminating { limit });
            }
            current = next;
        }

        Ok(sequence)
    }

    fn successors_of(&self, mc: Mc) -> Result<Successors, DataError> {
        self.successors
            .get(&mc)
            .copied()
            .ok_or(DataError::UnknownMeasure { mc })
    }
}

/// Play-order sequence of mc values for one movement's `(mc, next)` pairs.
pub fn unfold_sequence(measures: &[(Mc, Vec<Mc>)]) -> Result<Vec<Mc>, DataError> {
    MeasureGraph::new(measures)?.unfold()
}

/// Per-file unfolded sequences, by mc and by mn.
#[derive(Debug, Clone, Default)]
pub struct Unfolding {
    mc_sequences: HashMap<String, Vec<Mc>>,
    mn_sequences: HashMap<String, Vec<i64>>,
}

impl Unfolding {
    /// Unfold every file of a measures table (`mc`, `mn` and `next` columns).
    ///
    /// The mn sequence lists the mn of every played mc, with consecutive
    /// repetitions (split measures) collapsed.
    pub fn from_measures(measures: &Table) -> Result<Self, DataError> {
        let mc_col = measures.require_column("mc")?;
        let mn_col = measures.require_column("mn")?;

        let mut unfolding = Unfolding::default();
        for file in measures.files() {
            let sequence = MeasureGraph::from_table(measures, file)?.unfold()?;
            log::debug!("{file}: {} measures unfolded", sequence.len());

            let mn_of: HashMap<Mc, i64> = measures
                .rows_of(file)
                .filter_map(|r| Some((r.values[mc_col].as_mc()?, r.values[mn_col].as_int()?)))
                .collect();
            let mut mns: Vec<i64> = Vec::new();
            for mc in &sequence {
                let mn = *mn_of.get(mc).ok_or(DataError::UnknownMeasure { mc: *mc })?;
                if mns.last() != Some(&mn) {
                    mns.push(mn);
                }
            }

            unfolding.mc_sequences.insert(file.to_string(), sequence);
            unfolding.mn_sequences.insert(file.to_string(), mns);
        }
        Ok(unfolding)
    }

    pub fn mc_sequence(&self, file: &str) -> Option<&[Mc]> {
        self.mc_sequences.get(file).map(Vec::as_slice)
    }

    pub fn mn_sequence(&self, file: &str) -> Option<&[i64]> {
        self.mn_sequences.get(file).map(Vec::as_slice)
    }

    /// Reorder `table` into play order.
    ///
    /// Tables with an `mc` column follow the mc sequence, others the mn
    /// sequence.  Each row is emitted once per occurrence of its measure in
    /// the sequence; rows of measures that are never played are dropped.
    /// The key column moves to the front and `volta` is dropped.
    pub fn unfold_table(&self, table: Table) -> Result<Table, DataError> {
        let key = if table.has_column("mc") { "mc" } else { "mn" };
        let key_col = table.require_column(key)?;

        let mut result = Table::new(table.columns.clone());
        for file in table.files() {
            let sequence: Option<Vec<i64>> = if key == "mc" {
                self.mc_sequence(file)
                    .map(|s| s.iter().map(|&mc| i64::from(mc)).collect())
            } else {
                self.mn_sequence(file).map(<[i64]>::to_vec)
            };
            let sequence = sequence.ok_or_else(|| {
                DataError::ConfigError(format!("no measure information for file {file}"))
            })?;

            let mut rows_by_key: HashMap<i64, Vec<usize>> = HashMap::new();
            for (i, row) in table.rows.iter().enumerate() {
                if row.file != file {
                    continue;
                }
                if let Some(k) = row.values[key_col].as_int() {
                    rows_by_key.entry(k).or_default().push(i);
                }
            }

            for k in &sequence {
                if let Some(indices) = rows_by_key.get(k) {
                    for &i in indices {
                        result.rows.push(table.rows[i].clone());
                    }
                }
            }
        }

        Ok(result.move_column_to_front(key).drop_column("volta"))
    }
}

/// Keep what is played without unfolding: drop first-ending rows
/// (`volta == 1`) and the `volta` column.
pub fn drop_first_endings(table: Table) -> Table {
    let Some(volta_col) = table.column_index("volta") else {
        return table;
    };
    table
        .retain_rows(|_, row| row.values[volta_col] != Value::Int(1))
        .drop_column("volta")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tsv::parse_tsv;
    use pretty_assertions::assert_eq;

    fn linear(n: Mc) -> Vec<(Mc, Vec<Mc>)> {
        (1..=n)
            .map(|mc| (mc, if mc == n { vec![] } else { vec![mc + 1] }))
            .collect()
    }

    fn single_volta() -> Vec<(Mc, Vec<Mc>)> {
        vec![
            (1, vec![2]),
            (2, vec![3]),
            (3, vec![4, 5]),
            (4, vec![1]),
            (5, vec![]),
        ]
    }

    #[test]
    fn no_repeats() {
        assert_eq!(unfold_sequence(&linear(5)).unwrap(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn first_then_second_ending() {
        assert_eq!(
            unfold_sequence(&single_volta()).unwrap(),
            vec![1, 2, 3, 4, 1, 2, 3, 5]
        );
    }

    #[test]
    fn same_input_same_sequence() {
        let graph = MeasureGraph::new(&single_volta()).unwrap();
        assert_eq!(graph.unfold().unwrap(), graph.unfold().unwrap());
    }

    #[test]
    fn final_bar_repeats_once() {
        // |: 1 2 3 :| with the repeat sign on the last bar
        let measures = vec![(1, vec![2]), (2, vec![3]), (3, vec![1])];
        assert_eq!(unfold_sequence(&measures).unwrap(), vec![1, 2, 3, 1, 2, 3]);
    }

    #[test]
    fn sonata_form_with_two_repeated_halves() {
        // exposition 1-2 repeated with voltas at 3/4, development+recapitulation
        // 5-6 repeated from the last bar
        let measures = vec![
            (1, vec![2]),
            (2, vec![3, 4]),
            (3, vec![1]),
            (4, vec![5]),
            (5, vec![6]),
            (6, vec![5]),
        ];
        let seq = unfold_sequence(&measures).unwrap();
        assert_eq!(seq, vec![1, 2, 3, 1, 2, 4, 5, 6, 5, 6]);

        // every branch point at most twice, every other mc at most twice
        for mc in 1..=6 {
            assert!(seq.iter().filter(|&&m| m == mc).count() <= 2);
        }
        assert!(seq.len() <= 2 * measures.len());
    }

    #[test]
    fn three_endings_are_unsupported() {
        let measures = vec![(1, vec![2, 3, 4]), (2, vec![1]), (3, vec![1]), (4, vec![])];
        assert!(matches!(
            unfold_sequence(&measures),
            Err(DataError::UnsupportedVolta { mc: 1, successors: 3 })
        ));
    }

    #[test]
    fn malformed_graphs_fail() {
        let early_end = vec![(1, vec![]), (2, vec![])];
        assert!(matches!(
            unfold_sequence(&early_end),
            Err(DataError::UnexpectedTerminal { mc: 1 })
        ));

        let final_branch = vec![(1, vec![2]), (2, vec![1, 1])];
        assert!(matches!(
            unfold_sequence(&final_branch),
            Err(DataError::UnsupportedFinalBranch { mc: 2 })
        ));

        let dangling = vec![(1, vec![7]), (2, vec![])];
        assert!(matches!(
            unfold_sequence(&dangling),
            Err(DataError::UnknownMeasure { mc: 7 })
        ));

        let cycle = vec![(1, vec![2]), (2, vec![1]), (3, vec![])];
        assert!(matches!(
            unfold_sequence(&cycle),
            Err(DataError::NonTerminating { limit: 6 })
        ));

        assert_eq!(unfold_sequence(&[]).unwrap(), Vec::<Mc>::new());
    }

    const MEASURES: &str = "mc\tmn\tvolta\tnext\n\
                            1\t1\t\t2\n\
                            2\t2\t\t3\n\
                            3\t3\t\t4, 5\n\
                            4\t4\t1\t1\n\
                            5\t4\t2\t\n";

    #[test]
    fn sequences_from_measure_table() {
        let measures = parse_tsv(MEASURES, "K279-1").unwrap();
        let unfolding = Unfolding::from_measures(&measures).unwrap();
        assert_eq!(
            unfolding.mc_sequence("K279-1").unwrap(),
            &[1, 2, 3, 4, 1, 2, 3, 5]
        );
        // mc 4 and 5 share mn 4
        assert_eq!(
            unfolding.mn_sequence("K279-1").unwrap(),
            &[1, 2, 3, 4, 1, 2, 3, 4]
        );
    }

    #[test]
    fn tables_follow_the_sequence() {
        let measures = parse_tsv(MEASURES, "K279-1").unwrap();
        let unfolding = Unfolding::from_measures(&measures).unwrap();
        let notes = parse_tsv(
            "mn\tonset\tmc\tvolta\tmidi\n\
             1\t0\t1\t\t60\n\
             1\t1/2\t1\t\t62\n\
             4\t0\t4\t1\t64\n\
             4\t0\t5\t2\t65\n",
            "K279-1",
        )
        .unwrap();

        let unfolded = unfolding.unfold_table(notes).unwrap();
        assert_eq!(unfolded.columns, vec!["mc", "mn", "onset", "midi"]);
        let midi: Vec<i64> = unfolded
            .rows
            .iter()
            .map(|r| unfolded.get(r, "midi").and_then(Value::as_int).unwrap())
            .collect();
        assert_eq!(midi, vec![60, 62, 64, 60, 62, 65]);
    }

    #[test]
    fn tables_without_mc_follow_mn() {
        let measures = parse_tsv(MEASURES, "K279-1").unwrap();
        let unfolding = Unfolding::from_measures(&measures).unwrap();
        let cadences = parse_tsv("mn\tonset\tcadence\n4\t1/2\tPAC\n", "K279-1").unwrap();
        let unfolded = unfolding.unfold_table(cadences).unwrap();
        assert_eq!(unfolded.columns, vec!["mn", "onset", "cadence"]);
        assert_eq!(unfolded.len(), 2);
    }

    #[test]
    fn unknown_files_cannot_be_unfolded() {
        let unfolding = Unfolding::default();
        let notes = parse_tsv("mc\tmn\n1\t1\n", "K280-1").unwrap();
        assert!(matches!(
            unfolding.unfold_table(notes),
            Err(DataError::ConfigError(_))
        ));
    }

    #[test]
    fn first_endings_are_dropped_without_unfolding() {
        let notes = parse_tsv(
            "mc\tvolta\tmidi\n3\t\t60\n4\t1\t62\n5\t2\t64\n",
            "K279-1",
        )
        .unwrap();
        let kept = drop_first_endings(notes);
        assert_eq!(kept.columns, vec!["mc", "midi"]);
        assert_eq!(
            kept.rows.iter().map(|r| r.values[0].clone()).collect::<Vec<_>>(),
            vec![Value::Int(3), Value::Int(5)]
        );
    }
}
