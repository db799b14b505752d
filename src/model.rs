//! Data model for the per-movement annotation tables.
//!
//! Every table (notes, harmonies, cadences, measures) is a list of rows
//! indexed by the movement file they came from. Cell types follow a fixed
//! column schema; musical time is kept as exact fractions.

use std::fmt;

use num_rational::Ratio;

use crate::error::DataError;

/// Exact musical time (onsets, durations, offsets).
pub type Fraction = Ratio<i64>;

/// Raw measure counter in encoding order.
pub type Mc = u32;

/// One cell of a table.
///
/// Variant order matters: derived `Ord` sorts nulls after every value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Value {
    Int(i64),
    Fraction(Fraction),
    Text(String),
    /// Successor list of the `next` column
    List(Vec<Mc>),
    Null,
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_fraction(&self) -> Option<Fraction> {
        match self {
            Value::Fraction(f) => Some(*f),
            Value::Int(i) => Some(Fraction::from_integer(*i)),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Mc]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    /// Value of an `mc` cell.
    pub fn as_mc(&self) -> Option<Mc> {
        self.as_int().and_then(|i| Mc::try_from(i).ok())
    }
}

impl fmt::Display for Value {
    /// Renders the value the way it is stored in a TSV cell.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{i}"),
            Value::Fraction(r) => write!(f, "{r}"),
            Value::Text(s) => f.write_str(s),
            Value::List(l) => {
                for (i, mc) in l.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{mc}")?;
                }
                Ok(())
            }
            Value::Null => Ok(()),
        }
    }
}

/// Semantic type of a column, decided by its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Int,
    NullableInt,
    Text,
    Fraction,
    IntList,
}

impl ColumnType {
    /// Look up the fixed schema. Unknown columns are kept as text.
    pub fn of(column: &str) -> Self {
        match column {
            "keysig" | "mc" | "midi" | "mn" | "staff" | "tpc" | "voice" | "voices" => {
                ColumnType::Int
            }
            "dont_count" | "numbering_offset" | "tied" | "volta" => ColumnType::NullableInt,
            "act_dur" | "nominal_duration" | "offset" | "onset" | "duration" | "scalar" => {
                ColumnType::Fraction
            }
            "next" => ColumnType::IntList,
            // barline, repeats, timesig and everything else
            _ => ColumnType::Text,
        }
    }

    /// Parse one raw TSV cell into a typed value.
    pub fn parse(self, raw: &str) -> Result<Value, DataError> {
        let raw = raw.trim();
        match self {
            ColumnType::Int => {
                if raw.is_empty() {
                    return Err(DataError::ParsingError(
                        "missing value in integer column".to_string(),
                    ));
                }
                parse_int(raw).map(Value::Int)
            }
            ColumnType::NullableInt => {
                if raw.is_empty() {
                    Ok(Value::Null)
                } else {
                    parse_int(raw).map(Value::Int)
                }
            }
            ColumnType::Fraction => {
                if raw.is_empty() {
                    Ok(Value::Null)
                } else {
                    parse_fraction(raw).map(Value::Fraction)
                }
            }
            ColumnType::IntList => parse_mc_list(raw).map(Value::List),
            ColumnType::Text => {
                if raw.is_empty() {
                    Ok(Value::Null)
                } else {
                    Ok(Value::Text(raw.to_string()))
                }
            }
        }
    }
}

fn parse_int(raw: &str) -> Result<i64, DataError> {
    raw.parse::<i64>()
        .map_err(|e| DataError::ParsingError(format!("invalid integer '{raw}': {e}")))
}

/// Parse `"3/4"`, `"2"`, `"-1/8"` or a decimal such as `"0.75"` exactly.
pub fn parse_fraction(raw: &str) -> Result<Fraction, DataError> {
    let raw = raw.trim();
    let invalid = || DataError::ParsingError(format!("invalid fraction '{raw}'"));

    if let Some((num, den)) = raw.split_once('/') {
        let num: i64 = num.trim().parse().map_err(|_| invalid())?;
        let den: i64 = den.trim().parse().map_err(|_| invalid())?;
        if den == 0 {
            return Err(invalid());
        }
        return Ok(Fraction::new(num, den));
    }

    if let Some((whole, frac)) = raw.split_once('.') {
        if frac.is_empty() || !frac.bytes().all(|b| b.is_ascii_digit()) || frac.len() > 12 {
            return Err(invalid());
        }
        let negative = whole.starts_with('-');
        let whole = whole.trim_start_matches(['-', '+']);
        let whole: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid())?
        };
        let den = 10i64.pow(frac.len() as u32);
        let frac: i64 = frac.parse().map_err(|_| invalid())?;
        let numer = whole
            .checked_mul(den)
            .and_then(|n| n.checked_add(frac))
            .ok_or_else(invalid)?;
        let value = Fraction::new(numer, den);
        return Ok(if negative { -value } else { value });
    }

    raw.parse::<i64>()
        .map(Fraction::from_integer)
        .map_err(|_| invalid())
}

/// Parse the `next` column: comma-separated mc values, possibly empty.
pub fn parse_mc_list(raw: &str) -> Result<Vec<Mc>, DataError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<Mc>()
                .map_err(|e| DataError::ParsingError(format!("invalid mc '{s}' in next list: {e}")))
        })
        .collect()
}

/// The kinds of per-movement tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Kind {
    Notes,
    Harmonies,
    Cadences,
    Measures,
}

impl Kind {
    /// Directory holding this kind's TSVs; also the output suffix.
    pub const fn dir_name(self) -> &'static str {
        match self {
            Kind::Notes => "notes",
            Kind::Harmonies => "harmonies",
            Kind::Cadences => "cadences",
            Kind::Measures => "measures",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// One table row, indexed by its movement file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    /// Filename stem, e.g. "K279-1"
    pub file: String,
    /// One value per table column
    pub values: Vec<Value>,
}

/// A table of rows sharing a column list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Index of a column the caller cannot do without.
    pub fn require_column(&self, name: &str) -> Result<usize, DataError> {
        self.column_index(name)
            .ok_or_else(|| DataError::ParsingError(format!("table has no '{name}' column")))
    }

    /// Cell of `row` in column `name`; `None` if the column does not exist.
    pub fn get<'a>(&self, row: &'a Row, name: &str) -> Option<&'a Value> {
        self.column_index(name).and_then(|i| row.values.get(i))
    }

    /// Append a row, padding missing trailing cells with nulls.
    pub fn push_row(&mut self, file: impl Into<String>, mut values: Vec<Value>) {
        values.resize(self.columns.len(), Value::Null);
        self.rows.push(Row {
            file: file.into(),
            values,
        });
    }

    /// Files in order of first appearance.
    pub fn files(&self) -> Vec<&str> {
        let mut files: Vec<&str> = Vec::new();
        for row in &self.rows {
            if !files.contains(&row.file.as_str()) {
                files.push(&row.file);
            }
        }
        files
    }

    /// Rows belonging to `file`, in table order.
    pub fn rows_of<'a>(&'a self, file: &'a str) -> impl Iterator<Item = &'a Row> + 'a {
        self.rows.iter().filter(move |r| r.file == file)
    }

    /// Remove a column if present.
    pub fn drop_column(mut self, name: &str) -> Self {
        if let Some(i) = self.column_index(name) {
            self.columns.remove(i);
            for row in &mut self.rows {
                row.values.remove(i);
            }
        }
        self
    }

    /// Move a column to the first position, keeping the others in order.
    pub fn move_column_to_front(mut self, name: &str) -> Self {
        if let Some(i) = self.column_index(name) {
            let col = self.columns.remove(i);
            self.columns.insert(0, col);
            for row in &mut self.rows {
                let v = row.values.remove(i);
                row.values.insert(0, v);
            }
        }
        self
    }

    /// Keep only the rows matching `keep`.
    pub fn retain_rows<F>(mut self, mut keep: F) -> Self
    where
        F: FnMut(&[String], &Row) -> bool,
    {
        let columns = &self.columns;
        self.rows.retain(|r| keep(columns, r));
        self
    }

    /// Append the rows of `other`, unioning the column lists.
    pub fn extend(&mut self, other: Table) {
        let mapping: Vec<usize> = other
            .columns
            .iter()
            .map(|c| match self.column_index(c) {
                Some(i) => i,
                None => {
                    self.columns.push(c.clone());
                    for row in &mut self.rows {
                        row.values.push(Value::Null);
                    }
                    self.columns.len() - 1
                }
            })
            .collect();
        for row in other.rows {
            let mut values = vec![Value::Null; self.columns.len()];
            for (src, value) in row.values.into_iter().enumerate() {
                values[mapping[src]] = value;
            }
            self.rows.push(Row {
                file: row.file,
                values,
            });
        }
    }
}
