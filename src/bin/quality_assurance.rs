use std::path::PathBuf;

use clap::Parser;
use sonatadata::qa::{mxl_files, scan_file};
use sonatadata::DataError;

fn main() {
    let result = main_result();
    std::process::exit(match result {
        Ok(()) => 0,
        Err(err) => {
            log::error!("{err}");
            1
        }
    });
}

fn main_result() -> Result<(), DataError> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("sonatadata=info,quality_assurance=info"),
    )
    .init();

    let args = CliArgs::parse();
    let files = mxl_files(&args.root)?;
    log::info!("Scanning {} MXL files in {:?}", files.len(), args.root);

    let mut total = 0;
    for path in files {
        let report = scan_file(&path)?;
        println!("{}", report.registry_line());
        for finding in &report.findings {
            println!("\t{finding}");
        }
        total += report.findings.len();
    }
    log::info!("{total} findings");
    Ok(())
}

/// Scan the harmony labels of converted scores for out-of-order and
/// conflicting annotations.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct CliArgs {
    /// Folder containing the .mxl files.
    #[arg(default_value = "mxl")]
    root: PathBuf,
}
