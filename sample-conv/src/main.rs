use anyhow::{Context, Result};
use cart_tools::sample::{
    Questions, Samples, SymbolConverter, SymbolTable, example_list::read_example_list,
};
use clap::{ArgAction, CommandFactory, Parser};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sample-conv")]
#[command(about = "Convert CART example lists to context builder samples")]
#[command(version)]
#[command(override_usage = "sample-conv [OPTIONS] <INPUT> <OUTPUT_DIR>")]
struct Cli {
    /// Example list XML (gzip if it ends in .gz) and the output directory
    #[arg(value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Replacement phone for the empty context symbol
    #[arg(short, long, default_value = "si")]
    boundary: String,

    /// Empty context symbol in the input file
    #[arg(short, long, default_value = "#")]
    empty_context: String,

    /// Context independent phone, in addition to `si` (repeatable)
    #[arg(short = 'x', long, action = ArgAction::Append)]
    ci_phones: Vec<String>,

    /// Phone symbol table
    #[arg(short = 'p', long, default_value = "phones.sym")]
    phone_syms: PathBuf,

    /// Samples filename, relative to the output directory
    #[arg(short, long, default_value = "samples.txt")]
    samples: PathBuf,

    /// Enable word boundary information
    #[arg(short, long, action = ArgAction::SetTrue)]
    word_boundary: bool,

    /// Initial phone list filename
    #[arg(short, long, default_value = "initial_phones")]
    initials: PathBuf,

    /// Final phone list filename
    #[arg(short, long, default_value = "final_phones")]
    finals: PathBuf,

    /// Word boundary to normal phone map filename
    #[arg(short = 'm', long, default_value = "phone_map")]
    phone_map: PathBuf,

    /// Original question file
    #[arg(short, long)]
    questions: Option<PathBuf>,

    /// Mapped questions filename
    #[arg(short = 'n', long, default_value = "mapped_questions.txt")]
    mapped_questions: PathBuf,

    /// Central questions filename
    #[arg(short, long, default_value = "center_questions.txt")]
    center_questions: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let [input, output_dir, ..] = cli.paths.as_slice() else {
        eprintln!("{}", Cli::command().render_usage());
        std::process::exit(1);
    };

    let symbols = SymbolTable::read(&cli.phone_syms)
        .with_context(|| format!("reading {}", cli.phone_syms.display()))?;

    tracing::info!("parsing {}", input.display());
    let list =
        read_example_list(input).with_context(|| format!("parsing {}", input.display()))?;
    tracing::info!("read {} examples", list.examples.len());

    tracing::info!("converting to samples");
    let mut samples = Samples::new(cli.word_boundary);
    for (n, example) in list.examples.iter().enumerate() {
        samples
            .add_example(example)
            .with_context(|| format!("example {}", n + 1))?;
    }

    let mut converter = SymbolConverter::new(&symbols);
    let ci_phones = std::iter::once("si".to_string()).chain(cli.ci_phones.iter().cloned());
    converter.set_use_word_boundary(cli.word_boundary, ci_phones);
    converter.map_symbol(cli.empty_context.as_str(), cli.boundary.as_str());

    tracing::info!("converting context symbols");
    converter.convert_context_symbols(&mut samples)?;

    let samples_path = output_dir.join(&cli.samples);
    samples
        .write(&samples_path)
        .with_context(|| format!("writing {}", samples_path.display()))?;
    tracing::info!("wrote {} samples to {}", samples.len(), samples_path.display());

    if !cli.word_boundary {
        return Ok(());
    }

    tracing::info!("adding word boundary symbols");
    converter.write_initial_phones(&cli.initials)?;
    converter.write_final_phones(&cli.finals)?;
    converter.write_phone_map(&cli.phone_map)?;
    tracing::info!(
        "wrote {}, {} and {}",
        cli.initials.display(),
        cli.finals.display(),
        cli.phone_map.display()
    );

    let mut center_questions = Questions::new();
    center_questions.set_initial_final(
        converter.initial_phones(),
        converter.final_phones(),
        symbols.symbols(),
    );
    center_questions.write(&cli.center_questions)?;
    tracing::info!("wrote {}", cli.center_questions.display());

    if let Some(path) = &cli.questions {
        tracing::info!("converting questions");
        let mut questions = Questions::new();
        questions
            .read(path)
            .with_context(|| format!("reading {}", path.display()))?;
        questions.add_mapped_phones(converter.phone_classes());
        questions.write(&cli.mapped_questions)?;
        tracing::info!("wrote {}", cli.mapped_questions.display());
    }

    Ok(())
}
