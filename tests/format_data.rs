//! End-to-end formatting runs over the fixture corpus in tests/fixtures.

use pretty_assertions::assert_eq;
use sonatadata::tsv::parse_tsv;
use sonatadata::{run, Catalog, CatalogEntry, DataError, FormatOptions, Outcome, Table};
use std::path::{Path, PathBuf};

/// Fixture tables laid out like the corpus: <kind>/<filename>.tsv
fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn options(out_dir: &Path) -> FormatOptions {
    FormatOptions {
        name: "out".to_string(),
        out_dir: out_dir.to_path_buf(),
        data_dir: fixtures_dir(),
        sonatas: Some(vec![1]),
        movements: Some(vec![1]),
        ..Default::default()
    }
}

fn stored(outcome: Outcome) -> Vec<PathBuf> {
    match outcome {
        Outcome::Stored(paths) => paths,
        other => panic!("expected stored files, got {other:?}"),
    }
}

fn read_output(path: &Path) -> Table {
    let text = std::fs::read_to_string(path).expect("output file should exist");
    parse_tsv(&text, "output").expect("output should be valid TSV")
}

fn column(table: &Table, name: &str) -> Vec<String> {
    table
        .rows
        .iter()
        .map(|r| table.get(r, name).map(|v| v.to_string()).unwrap_or_default())
        .collect()
}

#[test]
fn notes_without_unfolding_skip_first_endings() {
    let out = tempfile::tempdir().unwrap();
    let opts = FormatOptions {
        notes: true,
        ..options(out.path())
    };
    let paths = stored(run(&opts, &Catalog::default()).unwrap());
    assert_eq!(paths, vec![out.path().join("out_notes.tsv")]);

    let notes = read_output(&paths[0]);
    assert_eq!(
        notes.columns,
        vec!["filename", "mc", "mn", "onset", "duration", "staff", "voice", "midi", "tpc", "tied"]
    );
    assert_eq!(column(&notes, "midi"), vec!["60", "64", "62", "65", "72", "71"]);
    assert_eq!(column(&notes, "onset"), vec!["0", "1/2", "0", "0", "0", "1/2"]);
}

#[test]
fn unfolded_notes_follow_the_repeats() {
    let out = tempfile::tempdir().unwrap();
    let opts = FormatOptions {
        notes: true,
        unfold: true,
        ..options(out.path())
    };
    let paths = stored(run(&opts, &Catalog::default()).unwrap());
    let notes = read_output(&paths[0]);
    assert_eq!(notes.columns[1], "mc");
    assert!(!notes.has_column("volta"));
    assert_eq!(
        column(&notes, "mc"),
        vec!["1", "1", "2", "3", "4", "1", "1", "2", "3", "5", "5"]
    );
    assert_eq!(
        column(&notes, "midi"),
        vec!["60", "64", "62", "65", "67", "60", "64", "62", "65", "72", "71"]
    );
}

#[test]
fn unfolded_cadences_follow_measure_numbers() {
    let out = tempfile::tempdir().unwrap();
    let opts = FormatOptions {
        cadences: true,
        unfold: true,
        ..options(out.path())
    };
    let paths = stored(run(&opts, &Catalog::default()).unwrap());
    let cadences = read_output(&paths[0]);
    assert_eq!(cadences.columns, vec!["filename", "mn", "onset", "cadence"]);
    assert_eq!(column(&cadences, "cadence"), vec!["HC", "PAC", "HC", "PAC"]);
}

#[test]
fn joined_kinds_share_one_table() {
    let out = tempfile::tempdir().unwrap();
    let opts = FormatOptions {
        notes: true,
        harmonies: true,
        cadences: true,
        join: true,
        ..options(out.path())
    };
    let paths = stored(run(&opts, &Catalog::default()).unwrap());
    assert_eq!(paths, vec![out.path().join("out.tsv")]);

    let text = std::fs::read_to_string(&paths[0]).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines,
        vec![
            "filename\tmn\tonset\tmc\tduration\tstaff\tvoice\tmidi\ttpc\ttied\tlabel\tcadence",
            "K279-1\t1\t0\t1\t1/2\t1\t1\t60\t0\t\t.C.I\t",
            "K279-1\t1\t1/2\t1\t1/4\t1\t1\t64\t4\t\t\t",
            "K279-1\t2\t0\t2\t3/4\t1\t1\t62\t2\t\t\t",
            "K279-1\t3\t0\t3\t3/4\t2\t1\t65\t-1\t1\tV\tHC",
            "K279-1\t4\t0\t4\t3/4\t1\t1\t67\t1\t\tV7\t",
            "K279-1\t4\t0\t5\t1/2\t1\t1\t72\t0\t\tI\t",
            "K279-1\t4\t1/2\t5\t1/4\t1\t1\t71\t5\t\t\tPAC",
        ]
    );
}

#[test]
fn joined_and_unfolded() {
    let out = tempfile::tempdir().unwrap();
    let opts = FormatOptions {
        notes: true,
        harmonies: true,
        join: true,
        unfold: true,
        ..options(out.path())
    };
    let paths = stored(run(&opts, &Catalog::default()).unwrap());
    let joined = read_output(&paths[0]);
    assert_eq!(&joined.columns[..4], &["filename", "mc", "mn", "onset"]);
    assert_eq!(
        column(&joined, "label"),
        vec![".C.I", "", "", "V", "V7", ".C.I", "", "", "V", "I", ""]
    );
}

#[test]
fn measures_keep_their_successor_lists() {
    let out = tempfile::tempdir().unwrap();
    let opts = FormatOptions {
        measures: true,
        ..options(out.path())
    };
    let paths = stored(run(&opts, &Catalog::default()).unwrap());
    assert_eq!(paths, vec![out.path().join("out_measures.tsv")]);
    let measures = read_output(&paths[0]);
    assert_eq!(column(&measures, "next"), vec!["2", "3", "4, 5", "1", ""]);
}

#[test]
fn whole_sonata_selection() {
    let out = tempfile::tempdir().unwrap();
    let opts = FormatOptions {
        notes: true,
        unfold: true,
        movements: Some(vec![1, 2]),
        ..options(out.path())
    };
    let paths = stored(run(&opts, &Catalog::default()).unwrap());
    let notes = read_output(&paths[0]);
    let k2: Vec<String> = notes
        .rows
        .iter()
        .filter(|r| notes.get(r, "filename").map(|v| v.to_string()) == Some("K279-2".into()))
        .map(|r| notes.get(r, "midi").unwrap().to_string())
        .collect();
    // the last bar repeats back once
    assert_eq!(k2, vec!["65", "60", "65", "60"]);
}

#[test]
fn three_endings_abort_the_run() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    for kind in ["notes", "measures"] {
        std::fs::create_dir(data.path().join(kind)).unwrap();
    }
    std::fs::write(
        data.path().join("measures/odd.tsv"),
        "mc\tmn\tnext\n1\t1\t2, 3, 4\n2\t2\t1\n3\t2\t1\n4\t2\t\n",
    )
    .unwrap();
    std::fs::write(data.path().join("notes/odd.tsv"), "mc\tmn\tonset\tmidi\n1\t1\t0\t60\n").unwrap();

    let catalog = Catalog {
        entries: vec![CatalogEntry {
            sonata: 1,
            movement: 1,
            filename: "odd".to_string(),
        }],
    };
    let opts = FormatOptions {
        name: "out".to_string(),
        out_dir: out.path().to_path_buf(),
        data_dir: data.path().to_path_buf(),
        notes: true,
        unfold: true,
        ..Default::default()
    };
    assert!(matches!(
        run(&opts, &catalog),
        Err(DataError::UnsupportedVolta { mc: 1, successors: 3 })
    ));
    assert!(!out.path().join("out_notes.tsv").exists());
}

#[test]
fn missing_tables_are_io_errors() {
    let out = tempfile::tempdir().unwrap();
    let opts = FormatOptions {
        notes: true,
        sonatas: Some(vec![2]),
        ..options(out.path())
    };
    assert!(matches!(
        run(&opts, &Catalog::default()),
        Err(DataError::IoError(_))
    ));
}
