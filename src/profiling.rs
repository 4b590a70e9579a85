//! Sample-based dataset profiling.
//!
//! Large inputs are first reduced to a uniform reservoir sample (1000 rows by
//! default). Everything reported, including the duplicate count and the
//! column types, describes that sample rather than the full dataset.
//!
//! The report carries:
//! - a type and null/distinct counts per column
//! - the number of duplicated row contents
//! - up to 10 most correlated numeric column pairs
//! - up to 10 strongest categorical → numeric ANOVA associations
//! - warnings for anything that could not be computed

pub mod association;
pub mod columns;
pub mod sampling;

pub use association::{AnovaPair, CorrPair};
pub use columns::{ColumnKind, ColumnProfile};

use crate::dataset::Dataset;
use rand::Rng;
use serde::ser::SerializeMap as _;
use serde::{Deserialize, Serialize, Serializer};

pub const DEFAULT_SAMPLE_SIZE: usize = 1000;

/// Samples smaller than this get a reliability warning.
pub const MIN_RELIABLE_ROWS: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileOptions {
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,

    /// Columns to treat as numeric for correlation regardless of content
    #[serde(default)]
    pub numeric_hint: Vec<String>,
}

fn default_sample_size() -> usize {
    DEFAULT_SAMPLE_SIZE
}

impl Default for ProfileOptions {
    fn default() -> Self {
        Self {
            sample_size: DEFAULT_SAMPLE_SIZE,
            numeric_hint: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileReport {
    pub sample_count: usize,
    pub columns: Vec<String>,
    /// Keyed by column name, in column order
    #[serde(serialize_with = "profiles_as_map")]
    pub profile: Vec<ColumnProfile>,
    pub duplicates: usize,
    pub top_corr: Vec<CorrPair>,
    pub top_anova: Vec<AnovaPair>,
    pub warnings: Vec<String>,
}

impl ProfileReport {
    pub fn column(&self, name: &str) -> Option<&ColumnProfile> {
        self.profile.iter().find(|p| p.name == name)
    }
}

fn profiles_as_map<S: Serializer>(profiles: &[ColumnProfile], serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(profiles.len()))?;
    for p in profiles {
        map.serialize_entry(&p.name, p)?;
    }
    map.end()
}

/// Profiles `dataset` with a thread-local random source.
pub fn profile(dataset: &Dataset, options: &ProfileOptions) -> ProfileReport {
    profile_with_rng(dataset, options, &mut rand::thread_rng())
}

/// Profiles `dataset`, drawing the sample from `rng`.
pub fn profile_with_rng<R: Rng + ?Sized>(dataset: &Dataset, options: &ProfileOptions, rng: &mut R) -> ProfileReport {
    let mut report = ProfileReport::default();

    if dataset.is_empty() {
        report.warnings.push("Dataset is empty.".to_owned());
        return report;
    }

    let sample_size = options.sample_size.max(1);
    let sample = if dataset.len() > sample_size {
        let indices = sampling::reservoir_indices(dataset.len(), sample_size, rng);
        dataset.select_rows(&indices)
    } else {
        dataset.clone()
    };
    tracing::info!(
        "Profiling {} of {} rows, {} columns",
        sample.len(),
        dataset.len(),
        sample.width()
    );

    report.sample_count = sample.len();
    report.columns = sample.columns().to_vec();

    if sample.len() < MIN_RELIABLE_ROWS {
        report.warnings.push(format!(
            "Sample is very small (fewer than {MIN_RELIABLE_ROWS} rows); profile figures are unreliable."
        ));
    }
    if sample.width() == 0 {
        report.warnings.push("Dataset has no columns.".to_owned());
        return report;
    }

    report.profile = (0..sample.width())
        .map(|idx| columns::analyse_column(&sample, idx))
        .collect();
    report.duplicates = columns::count_duplicates(&sample);

    let numeric: Vec<usize> = (0..sample.width())
        .filter(|&idx| {
            options.numeric_hint.contains(&sample.columns()[idx]) || columns::is_numeric_column(&sample, idx)
        })
        .collect();
    report.top_corr = association::top_correlations(&sample, &numeric);
    if report.top_corr.is_empty() {
        report
            .warnings
            .push("Not enough valid pairs to compute correlations (at least 3 needed).".to_owned());
    }

    let categorical: Vec<usize> = report
        .profile
        .iter()
        .enumerate()
        .filter(|(_, p)| p.kind == ColumnKind::Category)
        .map(|(idx, _)| idx)
        .collect();
    report.top_anova = association::top_anova(&sample, &categorical, &numeric);
    if report.top_anova.is_empty() {
        report
            .warnings
            .push("No categorical → numeric column pair meets the ANOVA requirements.".to_owned());
    }

    tracing::debug!(
        "Profile: {} duplicates, {} correlations, {} ANOVA results, {} warnings",
        report.duplicates,
        report.top_corr.len(),
        report.top_anova.len(),
        report.warnings.len()
    );
    report
}
