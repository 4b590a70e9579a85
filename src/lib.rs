//! # tabstat - client-side tabular data engine
//!
//! tabstat loads tabular data, reshapes it through declarative recipes and
//! computes statistical summaries and hypothesis tests without a backend.
//! Each operation is a pure function of its input message and can run on its
//! own worker thread.
//!
//! ## Quick Start
//!
//! ```
//! use tabstat::{hypothesis, ingest, pipeline::{self, Recipe}};
//!
//! let raw = "group,score\na,1\na,2\na,3\nb,4\nb,5\nb,6\n";
//! let ds = ingest::ingest_paste(raw, None)?;
//!
//! let recipe = Recipe::from_json(r#"{"typeCast": {"score": "number"}}"#)?;
//! let typed = pipeline::apply(&ds, &recipe);
//!
//! let test = hypothesis::LeveneRequest { column: "score".into(), group: "group".into() };
//! let result = hypothesis::levene(&typed, &test)?;
//! assert_eq!(result.stats.map(|s| s.k), Some(2));
//! # Ok::<(), tabstat::error::EngineError>(())
//! ```
//!
//! ## Core Modules
//!
//! - [`ingest`]: delimited text, spreadsheets, JSON and pasted HTML tables into a [`dataset::Dataset`]
//! - [`pipeline`]: recipe model, interpreter, `derive` expressions and CSV export
//! - [`profiling`]: sample-based column profiles, duplicates, correlations and ANOVA
//! - [`hypothesis`]: t-tests, Jarque–Bera and Brown–Forsythe
//! - [`worker`]: request/response messages and per-task worker threads
//! - [`remote`]: client for the optional remote statistics service
//! - [`error`]: error types and handling utilities
//!
//! ## Failure model
//!
//! Malformed input, unsupported files, invalid recipes and unknown columns
//! are hard errors ([`error::EngineError`]). Underpowered samples and
//! degenerate numbers are not: they show up as warnings, per-result `error`
//! strings or NaN.

#![warn(clippy::all, rust_2018_idioms)]

pub mod config;
pub mod dataset;
pub mod error;
pub mod hypothesis;
pub mod ingest;
pub mod logging;
pub mod pipeline;
pub mod profiling;
pub mod remote;
pub mod stats;
pub mod utils;
pub mod worker;
