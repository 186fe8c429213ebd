use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::info;

use crate::config::ResolvedConfig;
use crate::domain::{ReadLengths, RunHeader, RunInfo, SampleRecord};
use crate::error::MetadataError;
use crate::run_info::extract_run_info;
use crate::run_stats::{ReconcileSummary, StatisticsSource, reconcile};
use crate::sample_sheet::{SampleSheet, SheetOptions};

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

/// Per-sample metadata for one sequencing run, in sample-sheet order.
#[derive(Debug, Clone, Serialize)]
pub struct RunMetadata {
    pub run_info: RunInfo,
    pub header: RunHeader,
    pub date: Option<String>,
    pub read_lengths: ReadLengths,
    pub number_of_reads: u8,
    pub samples: Vec<SampleRecord>,
    pub statistics: ReconcileSummary,
}

impl RunMetadata {
    /// Reads `RunInfo.xml`, the sample sheet and whichever statistics report
    /// the run directory holds, and joins them into one record per sample.
    pub fn collect(
        config: &ResolvedConfig,
        sink: &dyn ProgressSink,
    ) -> Result<Self, MetadataError> {
        let start = Instant::now();

        sink.event(ProgressEvent {
            message: format!("phase=RunInfo; reading {}", config.run_info),
            elapsed: None,
        });
        let run_info = extract_run_info(&config.run_info);

        sink.event(ProgressEvent {
            message: format!("phase=SampleSheet; parsing {}", config.sample_sheet),
            elapsed: Some(start.elapsed()),
        });
        let options = SheetOptions {
            name_column: config.name_column,
            output_root: config.run_dir.clone(),
            commit: config.commit.clone(),
        };
        let SampleSheet {
            header,
            mut samples,
            read_lengths,
            date,
        } = SampleSheet::from_path(&config.sample_sheet, &options)?;

        let source = StatisticsSource::detect(&config.run_dir);
        sink.event(ProgressEvent {
            message: format!("phase=RunStats; source={:?}", source.kind()),
            elapsed: Some(start.elapsed()),
        });
        let statistics = reconcile(&mut samples, &run_info, &source, config.name_column)?;

        info!(
            run_id = %run_info.run_id,
            samples = samples.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "collected run metadata"
        );
        Ok(Self {
            number_of_reads: read_lengths.number_of_reads(),
            run_info,
            header,
            date,
            read_lengths,
            samples,
            statistics,
        })
    }
}
