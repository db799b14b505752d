use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use clap::Parser;
use sonatadata::format::{resolve_output_dir, NO_DATA, USAGE};
use sonatadata::{run, Catalog, DataError, FormatOptions, Outcome};

fn main() {
    let result = main_result();
    std::process::exit(match result {
        Ok(()) => 0,
        Err(err) => {
            // use Display instead of Debug for user friendly error messages
            log::error!("{err}");
            1
        }
    });
}

fn main_result() -> Result<(), DataError> {
    // setup logging
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("sonatadata=info,format_data=info"),
    )
    .init();

    let raw_args: Vec<String> = std::env::args().skip(1).collect();
    let args = CliArgs::parse();

    let catalog = match &args.catalog {
        Some(path) => {
            log::info!("Using catalog {path:?}");
            Catalog::from_file(path)?
        }
        None => Catalog::default(),
    };

    let name = args.name.clone().unwrap_or_else(|| default_name(&raw_args));
    // nothing is written in test mode, so don't ask for a directory
    let out_dir = if args.test {
        args.dir.clone()
    } else {
        resolve_output_dir(&args.dir, confirm_create)?
    };

    let options = FormatOptions {
        name,
        out_dir,
        data_dir: args.data_dir,
        unfold: args.unfold,
        sonatas: args.sonatas,
        movements: args.movements,
        test: args.test,
        notes: args.notes,
        harmonies: args.harmonies,
        cadences: args.cadences,
        measures: args.measures,
        join: args.join,
        propagate: args.propagate,
    };

    match run(&options, &catalog)? {
        Outcome::Selection(listing) => print!("{listing}"),
        Outcome::Usage => println!("{USAGE}"),
        Outcome::NoData => println!("{NO_DATA}"),
        Outcome::Stored(paths) => {
            for path in paths {
                log::info!("Stored {}", path.display());
            }
        }
    }
    Ok(())
}

/// Without NAME the files are named after the command line.
fn default_name(raw_args: &[String]) -> String {
    let joined = raw_args.join(" ");
    if joined.is_empty() {
        "data".to_string()
    } else {
        joined
    }
}

fn confirm_create(dir: &Path) -> bool {
    print!("{} does not exist. Create? (y|n)", dir.display());
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    match io::stdin().lock().read_line(&mut answer) {
        Ok(_) => answer.trim() == "y",
        Err(_) => false,
    }
}

/// Format Mozart data to your needs.
///
/// Run from the top level of the corpus (or pass --data-dir). Run with -t to
/// see all file names.
#[derive(Parser, Debug)]
#[command(version, about, long_about)]
struct CliArgs {
    /// You may choose a name for the new TSV file(s). Existing files will be overwritten.
    #[arg(value_name = "NAME")]
    name: Option<String>,
    /// Folder for storing the new TSV file(s). Can be relative, defaults to ./formatted
    #[arg(value_name = "DIR", default_value = "formatted")]
    dir: PathBuf,
    /// Unfold: Repeat everything that is repeated in the score, taking into account first and
    /// second endings ('voltas'). Otherwise, only second endings are returned.
    #[arg(short, long)]
    unfold: bool,
    /// Select sonatas out of 1-18, e.g. -s 2 5 12
    #[arg(short, long, num_args = 1..)]
    sonatas: Option<Vec<u8>>,
    /// Select only movements 1, 2 or 3, e.g. -m 1 3
    #[arg(short, long, num_args = 1..)]
    movements: Option<Vec<u8>>,
    /// Only test/view file selection without storing any data. Use -t without -sm to view all files.
    #[arg(short, long)]
    test: bool,
    /// Get note lists.
    #[arg(short = 'N', long)]
    notes: bool,
    /// Get harmony labels.
    #[arg(short = 'H', long)]
    harmonies: bool,
    /// Get cadence labels.
    #[arg(short = 'C', long)]
    cadences: bool,
    /// Get measure properties.
    #[arg(short = 'M', long)]
    measures: bool,
    /// Join the data into one single TSV.
    #[arg(short, long)]
    join: bool,
    /// When joining, spread out chord and cadence labels (not implemented).
    #[arg(short, long)]
    propagate: bool,
    /// Folder containing notes/, harmonies/, cadences/ and measures/.
    #[arg(long, default_value = ".")]
    data_dir: PathBuf,
    /// JSON file replacing the built-in sonata catalog.
    #[arg(long)]
    catalog: Option<PathBuf>,
}
