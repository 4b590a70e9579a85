use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tabstat::config::{EngineConfig, load_config};
use tabstat::dataset::Dataset;
use tabstat::hypothesis::{Alternative, LeveneRequest, NormalityRequest, TTestMode, TTestRequest};
use tabstat::pipeline::Recipe;
use tabstat::remote::{StatClient, StatRequest};
use tabstat::utils;
use tabstat::worker::message::{
    ExportPayload, IngestFilePayload, IngestPastePayload, LevenePayload, NormalityPayload, ProfilePayload,
    TTestPayload, TransformPayload,
};
use tabstat::worker::{Engine, Request, Response, TaskHandle};

#[derive(Parser)]
#[command(name = "tabstat", about = "Tabular ingestion, recipe transforms, profiling and hypothesis tests")]
pub struct Cli {
    /// JSON configuration file
    #[arg(long, global = true, env = "TABSTAT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Keep only the first N rows after ingestion
    #[arg(long, global = true)]
    pub max_rows: Option<usize>,

    /// Cap rows at the configured preview limit
    #[arg(long, global = true)]
    pub preview: bool,

    /// Cap rows at the configured chart-data limit
    #[arg(long, global = true, conflicts_with = "preview")]
    pub viz: bool,

    /// Also write logs to daily rotating files in this directory
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Read a CSV, spreadsheet or JSON file and print its rows
    Ingest {
        file: PathBuf,

        /// MIME type hint used for routing
        #[arg(long)]
        content_type: Option<String>,
    },
    /// Read pasted clipboard text (and optionally its HTML flavour)
    Paste {
        text: PathBuf,

        #[arg(long)]
        html: Option<PathBuf>,
    },
    /// Apply a transform recipe
    Transform {
        file: PathBuf,

        /// Recipe JSON, or @path to a file holding it
        #[arg(long)]
        recipe: String,

        /// Print the result as CSV export instead of rows
        #[arg(long)]
        export: bool,
    },
    /// Profile columns, duplicates and associations
    Profile {
        file: PathBuf,

        #[arg(long)]
        sample_size: Option<usize>,

        /// Treat this column as numeric (repeatable)
        #[arg(long = "numeric")]
        numeric: Vec<String>,
    },
    /// One-sample, paired or Welch t-test
    Ttest {
        file: PathBuf,

        #[arg(long, value_enum)]
        mode: ModeArg,

        #[arg(long)]
        col_a: Option<String>,

        #[arg(long)]
        col_b: Option<String>,

        #[arg(long)]
        one_col: Option<String>,

        /// Hypothesised mean for one-sample tests
        #[arg(long, default_value_t = 0.0)]
        mu: f64,

        #[arg(long, value_enum, default_value_t = AlternativeArg::TwoSided)]
        alternative: AlternativeArg,
    },
    /// Jarque–Bera normality test
    Normality {
        file: PathBuf,

        #[arg(long)]
        column: String,
    },
    /// Brown–Forsythe test for equal variances across groups
    Levene {
        file: PathBuf,

        #[arg(long)]
        column: String,

        #[arg(long)]
        group: String,
    },
    /// Send the rows to the remote statistics service
    Remote {
        /// Service operation, e.g. describe, corr, ttest, chisq, ols
        op: String,

        file: PathBuf,

        /// Operation arguments as JSON
        #[arg(long)]
        args: Option<String>,

        /// Operation options as JSON
        #[arg(long)]
        options: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ModeArg {
    OneSample,
    Paired,
    Independent,
}

impl From<ModeArg> for TTestMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::OneSample => Self::OneSample,
            ModeArg::Paired => Self::Paired,
            ModeArg::Independent => Self::Independent,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum AlternativeArg {
    TwoSided,
    Greater,
    Less,
}

impl From<AlternativeArg> for Alternative {
    fn from(alt: AlternativeArg) -> Self {
        match alt {
            AlternativeArg::TwoSided => Self::TwoSided,
            AlternativeArg::Greater => Self::Greater,
            AlternativeArg::Less => Self::Less,
        }
    }
}

/// Runs one command and prints its JSON response. Failed responses are
/// printed too and turn into a non-zero exit code.
pub fn run(cli: Cli) -> Result<ExitCode> {
    let config = load_config(cli.config.as_deref()).context("Failed to load configuration")?;
    let row_cap = cli
        .max_rows
        .or_else(|| cli.preview.then_some(config.preview_row_cap))
        .or_else(|| cli.viz.then_some(config.viz_row_cap));
    let engine = Engine::new(config);
    let input = Input { engine: &engine, row_cap };

    let response = match cli.command {
        Commands::Ingest { file, content_type } => match input.dataset(&file, content_type) {
            Ok(ds) => Response::success(serde_json::to_value(ds)?),
            Err(failed) => failed,
        },
        Commands::Paste { text, html } => {
            let text = read_text(&text)?;
            let html = html.as_deref().map(read_text).transpose()?;
            await_response(engine.dispatch(Request::IngestPaste(IngestPastePayload { text, html })))
        }
        Commands::Transform { file, recipe, export } => {
            let recipe = read_recipe(&recipe)?;
            input.then(&file, |rows| {
                if export {
                    let name = file.file_name().map(|n| n.to_string_lossy().into_owned());
                    Request::TransformExport(ExportPayload {
                        rows: tabstat::pipeline::apply(&rows, &recipe),
                        name,
                    })
                } else {
                    Request::TransformApply(TransformPayload { rows, recipe })
                }
            })
        }
        Commands::Profile {
            file,
            sample_size,
            numeric,
        } => input.then(&file, |rows| {
            Request::Profile(ProfilePayload {
                rows,
                sample_size,
                numeric_hint: numeric,
            })
        }),
        Commands::Ttest {
            file,
            mode,
            col_a,
            col_b,
            one_col,
            mu,
            alternative,
        } => input.then(&file, |rows| {
            Request::TestTtest(TTestPayload {
                rows,
                test: TTestRequest {
                    mode: mode.into(),
                    col_a,
                    col_b,
                    one_col,
                    mu,
                    alternative: alternative.into(),
                },
            })
        }),
        Commands::Normality { file, column } => input.then(&file, |rows| {
            Request::TestNormality(NormalityPayload {
                rows,
                test: NormalityRequest { column },
            })
        }),
        Commands::Levene { file, column, group } => input.then(&file, |rows| {
            Request::TestLevene(LevenePayload {
                rows,
                test: LeveneRequest { column, group },
            })
        }),
        Commands::Remote {
            op,
            file,
            args,
            options,
        } => match input.dataset(&file, None) {
            Ok(rows) => run_remote(engine.config(), &op, &rows, args.as_deref(), options.as_deref())?,
            Err(failed) => failed,
        },
    };

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(if response.ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

struct Input<'a> {
    engine: &'a Engine,
    row_cap: Option<usize>,
}

impl Input<'_> {
    /// Ingests `path` on a worker. A failed ingestion comes back as the
    /// response to print.
    fn dataset(&self, path: &Path, content_type: Option<String>) -> std::result::Result<Dataset, Response> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => return Err(Response::failure(format!("cannot read {}: {e}", path.display()))),
        };
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());

        let response = await_response(self.engine.dispatch(Request::IngestFile(IngestFilePayload {
            name,
            content_type,
            bytes,
        })));
        let data = response.clone().into_result().map_err(|_| response)?;
        let dataset: Dataset = serde_json::from_value(data)
            .map_err(|e| Response::failure(format!("ingested rows are malformed: {e}")))?;

        Ok(match self.row_cap {
            Some(limit) => utils::cap_rows(dataset, limit),
            None => dataset,
        })
    }

    /// Ingests `path`, then runs the request `build` makes from its rows.
    fn then(&self, path: &Path, build: impl FnOnce(Dataset) -> Request) -> Response {
        match self.dataset(path, None) {
            Ok(rows) => await_response(self.engine.dispatch(build(rows))),
            Err(failed) => failed,
        }
    }
}

fn await_response(handle: TaskHandle) -> Response {
    let operation = handle.operation();
    handle.wait_with(|progress| {
        tracing::debug!("{operation}: {:?} {:?}%", progress.mode, progress.percent);
    })
}

fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn read_recipe(arg: &str) -> Result<Recipe> {
    let json = match arg.strip_prefix('@') {
        Some(path) => read_text(Path::new(path))?,
        None => arg.to_owned(),
    };
    Ok(Recipe::from_json(&json)?)
}

fn parse_json_arg(flag: &str, raw: Option<&str>) -> Result<Value> {
    raw.map_or(Ok(Value::Null), |text| {
        serde_json::from_str(text).with_context(|| format!("--{flag} is not valid JSON"))
    })
}

fn run_remote(
    config: &EngineConfig,
    op: &str,
    rows: &Dataset,
    args: Option<&str>,
    options: Option<&str>,
) -> Result<Response> {
    let service = config
        .stat_service
        .as_ref()
        .context("No statistics service configured (set stat_service or TABSTAT_STAT_URL)")?;
    let request = StatRequest::new(op, rows)
        .with_args(parse_json_arg("args", args)?)
        .with_options(parse_json_arg("options", options)?);

    let client = StatClient::new(service)?;
    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    Ok(runtime.block_on(client.run(&request)).into())
}
