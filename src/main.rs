mod convert;
mod error;
mod models;
mod sanitize;
mod settings;
mod tables;
mod xml;

use clap::Parser;
use log::info;
use std::path::PathBuf;

use error::ConvertError;
use tables::SourceTables;

const DEFAULT_PREFIX: &str = "LK_";

#[derive(Parser)]
#[command(name = "quizport")]
#[command(about = "Convert Skillify CSV quiz exports into LearnDash quiz XML")]
#[command(version)]
struct Cli {
    /// Directory containing the Tests/Questions/Answers/Scenarios CSV files
    input_dir: PathBuf,

    /// Directory to write the generated XML files into
    output_dir: PathBuf,

    /// Filename prefix shared by the four CSV exports
    #[arg(long, default_value = DEFAULT_PREFIX)]
    prefix: String,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), ConvertError> {
    let tables = SourceTables::load(&cli.input_dir, &cli.prefix)?;
    let docs = convert::convert_all(&tables)?;

    for doc in &docs {
        let path = xml::write_document(doc, &cli.output_dir)?;
        info!("wrote {}", path.display());
    }

    println!(
        "Wrote {} quiz file(s) to {}",
        docs.len(),
        cli.output_dir.display()
    );
    Ok(())
}
