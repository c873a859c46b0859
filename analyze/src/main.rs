//! Утилита морфологического анализа.
//!
//! Читает текст из стандартного ввода и печатает для каждого токена
//! `Лемма\tТег\tВероятность` в формате TSV. Возвращает 0 при успехе и 2
//! при некорректном входе.

use std::error::Error;
use std::io::{BufRead, BufWriter, Write};
use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;

use xmorphy::engine::Engine;

/// Режим вывода.
#[derive(Clone, Debug)]
enum OutputMode {
    Plain,
    Detail,
}

impl FromStr for OutputMode {
    type Err = &'static str;

    fn from_str(mode: &str) -> Result<Self, Self::Err> {
        match mode {
            "plain" => Ok(Self::Plain),
            "detail" => Ok(Self::Detail),
            _ => Err("Could not parse a mode"),
        }
    }
}

/// Аргументы командной строки.
#[derive(Parser, Debug)]
#[clap(name = "analyze", about = "Analyzes morphology of Russian text")]
struct Args {
    /// Resource directory with the dictionary and models.
    ///
    /// Defaults to the XMORPHY_DATA_DIR environment variable.
    #[clap(short = 'd', long)]
    data_dir: Option<PathBuf>,

    /// Output mode. Choices are plain and detail.
    #[clap(short = 'O', long, default_value = "plain")]
    output_mode: OutputMode,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Args::parse();

    eprintln!("Loading the dictionary and models...");
    let engine = Engine::load(args.data_dir.as_deref())?;
    eprintln!("Ready to analyze");

    let is_tty = atty::is(atty::Stream::Stdout);

    let out = std::io::stdout();
    let mut out = BufWriter::new(out.lock());
    let lines = std::io::stdin().lock().lines();
    for line in lines {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                log::error!("malformed input: {}", e);
                std::process::exit(2);
            }
        };
        let sentences = engine.process(&line)?;
        match args.output_mode {
            OutputMode::Plain => {
                for sentence in &sentences {
                    for form in &sentence.words {
                        let Some(best) = form.best() else { continue };
                        writeln!(&mut out, "{}\t{}\t{:.4}", best.lemma, best.tag, best.prob)?;
                    }
                }
                if is_tty {
                    out.flush()?;
                }
            }
            OutputMode::Detail => {
                for sentence in &sentences {
                    for form in &sentence.words {
                        if form.infos.is_empty() {
                            continue;
                        }
                        let phem: Vec<String> =
                            form.phem.iter().map(|t| t.to_string()).collect();
                        writeln!(
                            &mut out,
                            "{}\tphem=[{}]",
                            form.text,
                            phem.join(" ")
                        )?;
                        for info in &form.infos {
                            writeln!(
                                &mut out,
                                "\t{}\t{}\t{:.4}\tsource={:?}\tstem_len={}",
                                info.lemma, info.tag, info.prob, info.source, info.stem_len,
                            )?;
                        }
                    }
                    out.write_all(b"EOS\n")?;
                }
                if is_tty {
                    out.flush()?;
                }
            }
        }
    }

    Ok(())
}
