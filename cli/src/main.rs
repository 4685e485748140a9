use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use aud_simulator_core_rs::{
    LookupRecords, LookupRepository, ResultSink, RunConfig, SimulationError, SimulationRunner,
    YearSummary,
};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "aud-sim",
    version,
    about = "Run a drinking-behavior population microsimulation from a JSON scenario"
)]
struct Cli {
    /// Scenario file: run configuration plus pre-built lookup records.
    scenario: PathBuf,

    /// Where to write yearly summaries; stdout when omitted.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Summary output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
    format: OutputFormat,

    /// Override the scenario's experiment seed.
    #[arg(long)]
    seed: Option<u64>,

    /// Override the scenario's end year (the output window is clamped to it).
    #[arg(long)]
    end_year: Option<i32>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Csv,
    Jsonl,
}

#[derive(Debug, Serialize, Deserialize)]
struct Scenario {
    config: RunConfig,
    lookups: LookupRecords,
}

/// Writes summaries as CSV, header first
struct CsvSink<W: Write> {
    out: W,
    wrote_header: bool,
}

impl<W: Write> CsvSink<W> {
    fn new(out: W) -> Self {
        Self {
            out,
            wrote_header: false,
        }
    }
}

impl<W: Write> ResultSink for CsvSink<W> {
    fn record(&mut self, summary: &YearSummary) -> Result<(), SimulationError> {
        let io_err = |e: io::Error| SimulationError::Sink(e.to_string());
        if !self.wrote_header {
            writeln!(self.out, "{}", YearSummary::header().join(",")).map_err(io_err)?;
            self.wrote_header = true;
        }
        writeln!(self.out, "{}", summary.row().join(",")).map_err(io_err)?;
        self.out.flush().map_err(io_err)
    }
}

/// Writes one JSON object per summary per line
struct JsonLinesSink<W: Write> {
    out: W,
}

impl<W: Write> ResultSink for JsonLinesSink<W> {
    fn record(&mut self, summary: &YearSummary) -> Result<(), SimulationError> {
        let line =
            serde_json::to_string(summary).map_err(|e| SimulationError::Sink(e.to_string()))?;
        writeln!(self.out, "{}", line).map_err(|e| SimulationError::Sink(e.to_string()))?;
        self.out
            .flush()
            .map_err(|e| SimulationError::Sink(e.to_string()))
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let scenario = load_scenario(&cli.scenario)?;
    let mut config = scenario.config;
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    if let Some(end_year) = cli.end_year {
        config.end_year = end_year;
        config.output_end_year = config.output_end_year.min(end_year);
    }

    let lookups = LookupRepository::from_records(&scenario.lookups)
        .context("lookup records failed validation")?;
    let runner = SimulationRunner::new(config, &lookups).context("failed to start simulation")?;

    let out: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    };
    let out = BufWriter::new(out);

    let report = match cli.format {
        OutputFormat::Csv => runner.run(&mut CsvSink::new(out)),
        OutputFormat::Jsonl => runner.run(&mut JsonLinesSink { out }),
    }
    .context("simulation aborted")?;

    let failed = report
        .validations
        .iter()
        .filter(|v| !v.within_tolerance)
        .count();
    if failed > 0 {
        warn!(failed, "some years differ from their reference totals");
    }
    info!(
        config_hash = %report.config_hash,
        final_year = report.final_year,
        final_population = report.final_population,
        summaries = report.summaries_emitted,
        events = report.events.len(),
        "run complete"
    );
    Ok(())
}

fn load_scenario(path: &PathBuf) -> Result<Scenario> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    parse_scenario(io::BufReader::new(file))
        .with_context(|| format!("parsing scenario {}", path.display()))
}

fn parse_scenario(reader: impl io::Read) -> Result<Scenario> {
    Ok(serde_json::from_reader(reader)?)
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use aud_simulator_core_rs::{DrinkingStage, MemorySink, Person, PersonTable, Race, Sex};

    const MINIMAL_SCENARIO: &str = r#"{
        "config": {
            "seed": 42,
            "initial_year": 2000,
            "end_year": 2000,
            "output_start_year": 2000,
            "output_end_year": 2000,
            "initial_population": 10
        },
        "lookups": {
            "initial_drinking": [
                {"age_group": "18-34", "sex": "Male", "race": "White", "stage": "Low", "proportion": 1.0},
                {"age_group": "18-34", "sex": "Female", "race": "White", "stage": "Abs", "proportion": 1.0}
            ],
            "initial_population": {
                "ages": [{"age": 30, "proportion": 1.0}],
                "sex": [{"age": 30, "male_ratio": 0.5}],
                "races": [
                    {"age_group": "30 to 34 years", "sex": "Male", "race": "White", "proportion": 1.0},
                    {"age_group": "30 to 34 years", "sex": "Female", "race": "White", "proportion": 1.0}
                ]
            }
        }
    }"#;

    fn summaries() -> Vec<YearSummary> {
        let table = PersonTable::from_persons(vec![
            Person::new(0, 30, Sex::Male, Race::White, DrinkingStage::High),
            Person::new(1, 12, Sex::Female, Race::Black, DrinkingStage::Abstinent),
        ]);
        vec![
            YearSummary::from_table(2000, &table),
            YearSummary::from_table(2001, &table),
        ]
    }

    #[test]
    fn test_csv_sink_writes_header_once() {
        let mut sink = CsvSink::new(Vec::new());
        for summary in summaries() {
            sink.record(&summary).unwrap();
        }

        let text = String::from_utf8(sink.out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], YearSummary::header().join(","));
        for line in &lines[1..] {
            assert_eq!(line.split(',').count(), 45);
        }
        assert!(lines[1].starts_with("2000,2,1,1,"));
        assert!(lines[2].starts_with("2001,"));
    }

    #[test]
    fn test_json_lines_sink_writes_one_summary_per_line() {
        let mut sink = JsonLinesSink { out: Vec::new() };
        let expected = summaries();
        for summary in &expected {
            sink.record(summary).unwrap();
        }

        let text = String::from_utf8(sink.out).unwrap();
        let parsed: Vec<YearSummary> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(parsed, expected);
    }

    #[test]
    fn test_minimal_scenario_runs_snapshot() {
        let scenario = parse_scenario(MINIMAL_SCENARIO.as_bytes()).unwrap();
        assert_eq!(scenario.config.seed, 42);
        assert_eq!(scenario.config.population_coefficient, 1.0);

        let lookups = LookupRepository::from_records(&scenario.lookups).unwrap();
        let mut sink = MemorySink::new();
        let report = SimulationRunner::new(scenario.config, &lookups)
            .unwrap()
            .run(&mut sink)
            .unwrap();

        assert_eq!(report.summaries_emitted, 1);
        let snapshot = &sink.summaries()[0];
        assert_eq!(snapshot.year, 2000);
        assert_eq!(snapshot.total_population, 10);
        assert_eq!(snapshot.race_counts[&Race::White], 10);
        assert_eq!(
            snapshot.stage_counts[&DrinkingStage::Low] + snapshot.stage_counts[&DrinkingStage::Abstinent],
            10
        );
    }

    #[test]
    fn test_malformed_scenario_rejected() {
        assert!(parse_scenario(r#"{"config": {"seed": 1}}"#.as_bytes()).is_err());
    }
}
