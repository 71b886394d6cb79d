use anyhow::{Context, Result};
use cart_tools::lookup::{HmmStateModels, LookupTable, StateSymbolTable};
use clap::{CommandFactory, Parser};
use std::{
    fs::File,
    io::{self, BufRead, BufReader, BufWriter, Write},
    path::PathBuf,
};

#[derive(Parser)]
#[command(name = "lookup-table")]
#[command(about = "Create an HMM state lookup table from a context builder state log")]
#[command(version)]
struct Cli {
    /// HMM state model symbol table
    #[arg(short = 's', long)]
    state_symbols: Option<PathBuf>,

    /// Context builder state log file
    #[arg(short = 'l', long)]
    states_log: Option<PathBuf>,

    /// Allophone state list to process (defaults to standard input)
    #[arg(short, long)]
    allophone_states: Option<PathBuf>,

    /// Lookup table output file. Not used yet: the table goes to standard output.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Phone symbol used for empty context
    #[arg(short, long, default_value = "si")]
    empty_context: String,

    /// Context independent phones, separated by ','
    #[arg(short, long, value_delimiter = ',')]
    ci_phones: Vec<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let (Some(state_symbols), Some(states_log)) = (&cli.state_symbols, &cli.states_log) else {
        eprintln!("{}", Cli::command().render_usage());
        std::process::exit(1);
    };

    if let Some(output) = &cli.output {
        tracing::warn!(
            "--output {} is ignored; writing to standard output",
            output.display()
        );
    }

    let ci_phones: Vec<&str> = cli
        .ci_phones
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect();

    let symbols = StateSymbolTable::read(state_symbols)
        .with_context(|| format!("reading {}", state_symbols.display()))?;
    tracing::info!("read {} state symbols", symbols.len());

    let mut models = HmmStateModels::new(ci_phones.iter().copied(), cli.empty_context.as_str());
    models
        .parse_log_file(states_log, &symbols)
        .with_context(|| format!("parsing {}", states_log.display()))?;
    tracing::info!("read {} state models", models.len());

    let input: Box<dyn BufRead> = match &cli.allophone_states {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("opening {}", path.display()))?,
        )),
        None => Box::new(io::stdin().lock()),
    };

    let table = LookupTable::new(&models, ci_phones.iter().copied(), cli.empty_context.as_str());
    let mut out = BufWriter::new(io::stdout().lock());
    let summary = table.write(input, &mut out, &mut io::stderr().lock())?;
    out.flush()?;

    tracing::info!(
        "mapped {} allophone states, {} unmapped",
        summary.mapped,
        summary.unmapped
    );

    Ok(())
}
