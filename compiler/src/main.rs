//! Построитель бинарного словаря.
//!
//! Читает XML-дамп OpenCorpora и собирает бинарный словарь с тремя DAWG и
//! упакованными парадигмами. Выходной файл пишется атомарно: сначала во
//! временный файл рядом с целевым, затем переименованием.

use std::error::Error;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::PathBuf;

use clap::Parser;

use xmorphy::opencorpora::build_from_opencorpora;

/// Аргументы командной строки.
#[derive(Parser, Debug)]
#[clap(name = "build", about = "Builds the binary dictionary from OpenCorpora XML")]
struct Args {
    /// OpenCorpora dictionary dump (XML).
    #[clap(short = 'i', long)]
    input: PathBuf,

    /// File to which the binary dictionary is output.
    #[clap(short = 'o', long)]
    output: PathBuf,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Args::parse();

    eprintln!("Building the dictionary from {}...", args.input.display());
    let reader = BufReader::new(File::open(&args.input)?);
    let bytes = build_from_opencorpora(reader)?;

    let parent = args
        .output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let mut temp_file = tempfile::NamedTempFile::new_in(parent)?;
    temp_file.write_all(&bytes)?;
    temp_file.as_file().sync_all()?;
    temp_file.persist(&args.output)?;

    eprintln!(
        "Wrote {} bytes to {}",
        bytes.len(),
        args.output.display()
    );
    Ok(())
}
