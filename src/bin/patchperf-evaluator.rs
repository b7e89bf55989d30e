use std::io::{stdout, Write};
use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use patchperf_evaluator::aggregator::Aggregate;
use patchperf_evaluator::performances::{ExtractOpts, Extraction, Performances};
use patchperf_evaluator::quantity::UnitClass;
use patchperf_evaluator::simulation::SimulationMetadata;
use patchperf_evaluator::source_file::PerformancesFile;
use patchperf_evaluator::terminal_table::TerminalTable;
use patchperf_evaluator::utillib::get_terminal_width::get_terminal_width;
use patchperf_evaluator::utillib::logging::{set_log_level, LogLevelOpt};
use patchperf_evaluator::{info, PATCHPERF_VERSION};

const PROGRAM_NAME: &str = "patchperf-evaluator";

#[derive(clap::Parser, Debug)]
#[clap(next_line_help = true)]
#[clap(set_term_width = get_terminal_width(4))]
/// Evaluate the performance records (`Performances.json`) of a
/// patch-based simulation: per-process values, maps over the
/// simulation domain, and histograms of formulas over the recorded
/// quantities.
struct Opts {
    #[clap(flatten)]
    log_level: LogLevelOpt,

    /// The subcommand to run. Use `--help` after the sub-command to
    /// get a list of the allowed options there.
    #[clap(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug)]
struct SourcesOpts {
    /// Results directories containing a `Performances.json` (or
    /// `Performances.json.zstd`) file, or paths to such files. Several
    /// are combined, e.g. for a simulation and its restarts.
    #[clap(required = true)]
    sources: Vec<PathBuf>,
}

impl SourcesOpts {
    fn files(&self) -> Vec<PerformancesFile> {
        self.sources.iter().map(PerformancesFile::new).collect()
    }
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Print version
    Version,

    /// List the quantities available in all of the given sources,
    /// with their units
    Quantities {
        #[clap(flatten)]
        sources_opts: SourcesOpts,
    },

    /// List the timesteps available in the given sources
    Timesteps {
        #[clap(flatten)]
        sources_opts: SourcesOpts,
    },

    /// Evaluate a formula over the quantities, for each selected
    /// timestep
    Extract {
        #[clap(flatten)]
        extract_opts: ExtractOpts,

        /// Path to the simulation metadata (JSON5 with the fields
        /// `number_of_patches`, `number_of_cells`, `cell_length`),
        /// needed for `--map`; by default, `simulation.json5` next to
        /// the first source is used if present
        #[clap(long)]
        simulation: Option<PathBuf>,

        /// Print tab-separated values instead of an aligned table
        #[clap(long)]
        tsv: bool,

        #[clap(flatten)]
        sources_opts: SourcesOpts,
    },
}

fn print_extraction(
    performances: &Performances,
    timestep: u64,
    extraction: &Extraction,
    tsv: bool,
    out: &mut impl Write,
) -> Result<()> {
    let axes = &performances.axes().axes;
    let value_title = format!("{} [{}]", performances.title(), performances.value_units());
    let t = timestep.to_string();
    match extraction {
        Extraction::Raw(values) | Extraction::Map1D(values) => {
            let table = TerminalTable::new(
                &[12, 16],
                &["timestep", axes[0].label.as_str(), value_title.as_str()],
                tsv,
            )?;
            table.write_title_row(out)?;
            for (center, value) in axes[0].centers.iter().zip(values) {
                table.write_data_row(&[t.clone(), center.to_string(), value.to_string()], out)?;
            }
        }
        Extraction::Map2D(values) => {
            let table = TerminalTable::new(
                &[12, 12, 12],
                &[
                    "timestep",
                    axes[0].label.as_str(),
                    axes[1].label.as_str(),
                    value_title.as_str(),
                ],
                tsv,
            )?;
            table.write_title_row(out)?;
            for ((ix, iy), value) in values.indexed_iter() {
                table.write_data_row(
                    &[
                        t.clone(),
                        axes[0].centers[ix].to_string(),
                        axes[1].centers[iy].to_string(),
                        value.to_string(),
                    ],
                    out,
                )?;
            }
        }
        Extraction::Histogram(counts) => {
            let table = TerminalTable::new(
                &[12, 16],
                &["timestep", axes[0].label.as_str(), value_title.as_str()],
                tsv,
            )?;
            table.write_title_row(out)?;
            for (center, count) in axes[0].centers.iter().zip(counts) {
                table.write_data_row(&[t.clone(), center.to_string(), count.to_string()], out)?;
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let Opts { log_level, command } = Opts::parse();
    set_log_level(log_level.into());

    match command {
        Command::Version => println!("{PROGRAM_NAME} version {PATCHPERF_VERSION}"),

        Command::Quantities { sources_opts } => {
            let aggregate = Aggregate::load(&sources_opts.files())?;
            let mut out = stdout().lock();
            for name in aggregate.quantities().names() {
                match UnitClass::of_name(name) {
                    Ok(unit) => writeln!(out, "{name}\t{unit}")?,
                    Err(_) => writeln!(out, "{name}\t(not usable in formulas)")?,
                }
            }
        }

        Command::Timesteps { sources_opts } => {
            let aggregate = Aggregate::load(&sources_opts.files())?;
            let mut timesteps = aggregate.timesteps();
            timesteps.dedup();
            let mut out = stdout().lock();
            for timestep in timesteps {
                writeln!(out, "{timestep}")?;
            }
        }

        Command::Extract {
            extract_opts,
            simulation,
            tsv,
            sources_opts,
        } => {
            let opts = extract_opts.into_performances_opts()?;
            let files = sources_opts.files();
            let search_dirs: Vec<PathBuf> = files
                .first()
                .map(|file| file.results_dir().to_owned())
                .into_iter()
                .collect();
            let metadata = SimulationMetadata::load(simulation.as_deref(), &search_dirs)?;
            let performances = Performances::open(&files, metadata.as_ref(), &opts)?;
            info!("{}", performances.info());

            let mut out = stdout().lock();
            let mut failures = 0;
            for (timestep, extraction) in performances.extract_all() {
                if let Some(extraction) = extraction {
                    print_extraction(&performances, timestep, &extraction, tsv, &mut out)?;
                } else {
                    failures += 1;
                }
            }
            if failures == performances.timesteps().len() {
                bail!("none of the selected timesteps could be extracted")
            }
        }
    }

    Ok(())
}
