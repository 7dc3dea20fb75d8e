//! Analysis session lifecycle.
//!
//! A session owns every grid for one run. Files are fed to it in argument
//! order with [`AnalysisSession::process_file`]; [`AnalysisSession::finalize`]
//! consumes it and hands back read-only [`AnalysisResults`].

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::analysis::afr::AfrAnalyzer;
use crate::analysis::fuel_trim::FuelTrimAnalyzer;
use crate::analysis::knock::KnockAnalyzer;
use crate::analysis::{RecordAnalyzer, Thresholds};
use crate::columns::ColumnResolver;
use crate::config::Config;
use crate::error::{ConfigError, LogError};
use crate::state::{load_files, LoadedFile};
use crate::validator::{reject_blank_lines, validate_record, Stats};

/// A file that could not be analyzed
#[derive(Clone, Debug, Serialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Per-file row tallies
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileSummary {
    pub name: String,
    pub good_lines: u64,
    pub bad_lines: u64,
}

/// Finalized output of a run
#[derive(Clone, Debug, Serialize)]
pub struct AnalysisResults {
    pub config: Config,
    pub stats: Stats,
    pub skipped: Vec<SkippedFile>,
    pub fuel_trim: Option<FuelTrimAnalyzer>,
    pub knock: Option<KnockAnalyzer>,
    pub afr: AfrAnalyzer,
}

/// Mutable aggregation state for one run
pub struct AnalysisSession {
    config: Config,
    stats: Stats,
    skipped: Vec<SkippedFile>,
    fuel_trim: Option<FuelTrimAnalyzer>,
    knock: Option<KnockAnalyzer>,
    afr: AfrAnalyzer,
}

fn active<'a>(
    fuel_trim: &'a mut Option<FuelTrimAnalyzer>,
    knock: &'a mut Option<KnockAnalyzer>,
    afr: &'a mut AfrAnalyzer,
) -> Vec<&'a mut dyn RecordAnalyzer> {
    let mut analyzers: Vec<&'a mut dyn RecordAnalyzer> = Vec::with_capacity(3);
    if let Some(a) = fuel_trim.as_mut() {
        analyzers.push(a);
    }
    if let Some(a) = knock.as_mut() {
        analyzers.push(a);
    }
    analyzers.push(afr);
    analyzers
}

impl AnalysisSession {
    /// Allocate the grids for every enabled analyzer
    ///
    /// Fails when an enabled analyzer needs a field whose `COL_*` option is
    /// not configured.
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        let thresholds = Thresholds::from_config(&config);
        let mut session = Self {
            fuel_trim: config
                .fuel_trim
                .as_ref()
                .map(|c| FuelTrimAnalyzer::new(thresholds, c)),
            knock: config.knock.as_ref().map(|c| KnockAnalyzer::new(thresholds, c)),
            afr: AfrAnalyzer::new(thresholds, &config.afr),
            stats: Stats::default(),
            skipped: Vec::new(),
            config,
        };

        let Self {
            config,
            fuel_trim,
            knock,
            afr,
            ..
        } = &mut session;
        for analyzer in active(fuel_trim, knock, afr) {
            tracing::debug!("Analyzer enabled: {} ({})", analyzer.name(), analyzer.id());
            for field in analyzer.required_fields() {
                config.columns.name(field)?;
            }
        }

        Ok(session)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn skipped(&self) -> &[SkippedFile] {
        &self.skipped
    }

    /// Enabled analyzers in processing order
    pub fn analyzers_mut(&mut self) -> Vec<&mut dyn RecordAnalyzer> {
        active(&mut self.fuel_trim, &mut self.knock, &mut self.afr)
    }

    /// Resolve columns for a file and accumulate all of its rows
    ///
    /// An unresolvable column is fatal for the whole run.
    pub fn process_file(&mut self, file: &LoadedFile) -> Result<FileSummary, ConfigError> {
        let Self {
            config,
            stats,
            fuel_trim,
            knock,
            afr,
            ..
        } = self;

        let resolver = ColumnResolver::new(&file.name, &file.log.header, &config.columns);
        let mut analyzers = active(fuel_trim, knock, afr);
        for analyzer in analyzers.iter_mut() {
            analyzer.bind(&resolver)?;
            analyzer.begin_file();
        }

        let width = resolver.width();
        let mut file_stats = Stats::default();
        for record in &file.log.records {
            if !validate_record(&mut file_stats, record, width) {
                continue;
            }
            for analyzer in analyzers.iter_mut() {
                analyzer.accumulate(record);
            }
        }

        reject_blank_lines(&mut file_stats, file.log.blank_lines);

        stats.good_lines += file_stats.good_lines;
        stats.bad_lines += file_stats.bad_lines;
        stats.files_processed += 1;

        tracing::info!(
            "Processed {}: accepted {}/{} lines",
            file.name,
            file_stats.good_lines,
            file_stats.total_lines()
        );

        Ok(FileSummary {
            name: file.name.clone(),
            good_lines: file_stats.good_lines,
            bad_lines: file_stats.bad_lines,
        })
    }

    /// Record a file that could not be loaded
    pub fn skip_file(&mut self, path: &Path, error: &LogError) {
        tracing::warn!("Couldn't load {}, skipping: {}", path.display(), error);
        self.stats.files_skipped += 1;
        self.skipped.push(SkippedFile {
            path: path.to_path_buf(),
            reason: error.to_string(),
        });
    }

    /// Load files in parallel, then accumulate them in argument order
    pub fn process_paths(&mut self, paths: &[PathBuf]) -> Result<Vec<FileSummary>, ConfigError> {
        tracing::info!("Loading {} file(s)", paths.len());

        let mut summaries = Vec::with_capacity(paths.len());
        for (path, loaded) in paths.iter().zip(load_files(paths)) {
            match loaded {
                Ok(file) => summaries.push(self.process_file(&file)?),
                Err(e) => self.skip_file(path, &e),
            }
        }
        Ok(summaries)
    }

    /// Compute every cell average and freeze the results
    pub fn finalize(mut self) -> AnalysisResults {
        for analyzer in self.analyzers_mut() {
            analyzer.finalize();
        }

        tracing::info!(
            "Finalized: {} files processed, {} skipped, {}/{} lines accepted",
            self.stats.files_processed,
            self.stats.files_skipped,
            self.stats.good_lines,
            self.stats.total_lines()
        );

        AnalysisResults {
            config: self.config,
            stats: self.stats,
            skipped: self.skipped,
            fuel_trim: self.fuel_trim,
            knock: self.knock,
            afr: self.afr,
        }
    }
}
