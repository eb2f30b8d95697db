use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use clausemap_engine::batch::{read_batch, run_batch, run_parsed, BatchOutcome, BatchSummary};
use clausemap_engine::{EngineConfig, GroupExample, OrderTable, Pipeline, StaticPopulation};
use clausemap_parser::{ConllAdapter, GreedyParser, ParserAdapter};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Decomposes sentences into grammatical slots in bulk")]
struct Cli {
    /// Engine settings (TOML). Defaults apply when omitted.
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decompose a JSON Lines batch and write a JSON report.
    Run {
        /// Input file; stdin when omitted.
        #[arg(short, long, value_name = "FILE")]
        input: Option<PathBuf>,

        /// Report file; stdout when omitted.
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Treat the input as a CoNLL-X document instead of JSON Lines.
        #[arg(long)]
        conll: bool,

        /// Population file used to lay each sentence out in columns.
        #[arg(long, value_name = "FILE", requires = "group")]
        population: Option<PathBuf>,

        /// V-group the whole batch belongs to.
        #[arg(long, requires = "population")]
        group: Option<String>,
    },
    /// Build a group's order table from a population file and snapshot it.
    CompileOrder {
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },
    /// Print an order-table snapshot as JSON.
    Inspect {
        #[arg(value_name = "FILE")]
        snapshot: PathBuf,
    },
}

/// `{"v_group": "give", "examples": [{"id": .., "sentence": .., "expected": {..}}]}`
#[derive(Deserialize)]
struct PopulationFile {
    v_group: String,
    examples: Vec<PopulationEntry>,
}

#[derive(Deserialize)]
struct PopulationEntry {
    id: String,
    sentence: String,
    /// When absent, the engine's own decomposition stands in.
    #[serde(default)]
    expected: Option<BTreeMap<String, String>>,
}

#[derive(Serialize)]
struct Report<'a> {
    summary: &'a BatchSummary,
    outcomes: &'a [BatchOutcome],
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Command::Run { input, output, conll, population, group } => {
            run(config, input.as_deref(), output.as_deref(), conll, population.as_deref().zip(group.as_deref()))
        }
        Command::CompileOrder { input, output } => compile_order(config, &input, &output),
        Command::Inspect { snapshot } => inspect(&snapshot),
    }
}

fn read_input(input: Option<&Path>) -> anyhow::Result<String> {
    match input {
        Some(path) => fs::read_to_string(path).with_context(|| format!("reading {}", path.display())),
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        }
    }
}

fn load_population(pipeline: &Pipeline, path: &Path) -> anyhow::Result<(String, Vec<GroupExample>)> {
    let file: PopulationFile = serde_json::from_str(&fs::read_to_string(path)?)
        .with_context(|| format!("parsing population {}", path.display()))?;
    let mut examples = Vec::with_capacity(file.examples.len());
    for entry in file.examples {
        let sentence = pipeline.parse(&entry.sentence)?;
        let example = match &entry.expected {
            Some(expected) => GroupExample::from_expected(entry.id.clone(), &sentence, expected)
                .with_context(|| format!("example {}", entry.id))?,
            None => GroupExample::new(entry.id.clone(), pipeline.decompose_parsed(&sentence).result.slots),
        };
        examples.push(example);
    }
    tracing::info!(v_group = %file.v_group, examples = examples.len(), "population loaded");
    Ok((file.v_group, examples))
}

fn run(
    config: EngineConfig,
    input: Option<&Path>,
    output: Option<&Path>,
    conll: bool,
    grouping: Option<(&Path, &str)>,
) -> anyhow::Result<()> {
    let text = read_input(input)?;
    let parser: Box<dyn ParserAdapter> = if conll {
        Box::new(ConllAdapter::new())
    } else {
        Box::new(GreedyParser::new())
    };
    let pipeline = Pipeline::with_parser(parser, config)?;

    let (mut outcomes, summary) = if conll {
        let sentences = ConllAdapter::new().parse_document(&text)?;
        run_parsed(&pipeline, &sentences)
    } else {
        run_batch(&pipeline, &read_batch(&text)?)
    };

    if let Some((path, v_group)) = grouping {
        // Population sentences are always plain text.
        let plain = Pipeline::with_parser(Box::new(GreedyParser::new()), pipeline.config().clone())?;
        let (file_group, examples) = load_population(&plain, path)?;
        let mut population = StaticPopulation::new();
        population.insert(file_group, examples);
        for outcome in &mut outcomes {
            if let Some(record) = outcome.record.take() {
                let assignment = pipeline.orders().assign(v_group, &population, &record.result.slots)?;
                outcome.record = Some(record.with_assignment(v_group, assignment));
            }
        }
    }

    let report = serde_json::to_string_pretty(&Report { summary: &summary, outcomes: &outcomes })?;
    match output {
        Some(path) => {
            fs::write(path, report)?;
            tracing::info!(path = %path.display(), "report written");
        }
        None => println!("{}", report),
    }
    Ok(())
}

fn compile_order(config: EngineConfig, input: &Path, output: &Path) -> anyhow::Result<()> {
    let pipeline = Pipeline::with_parser(Box::new(GreedyParser::new()), config)?;
    let (v_group, examples) = load_population(&pipeline, input)?;

    let table = OrderTable::build(v_group, &examples);
    tracing::info!(v_group = %table.v_group, columns = table.len(), "compiling order table");
    let bytes = table.to_snapshot()?;
    fs::write(output, bytes)?;
    tracing::info!(path = %output.display(), "snapshot written");
    Ok(())
}

fn inspect(snapshot: &Path) -> anyhow::Result<()> {
    let bytes = fs::read(snapshot)?;
    let table = OrderTable::from_snapshot(&bytes)?;
    println!("{}", serde_json::to_string_pretty(&table)?);
    Ok(())
}
