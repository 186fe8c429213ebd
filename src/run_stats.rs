//! Run statistics: loading one of the two report formats and joining its rows
//! back onto the sample-sheet records.
//!
//! Statistics rows reference samples only by their 1-based sample number. Each
//! row is matched to `samples[number - 1]` and the row's canonical name must
//! equal the record's canonical value of the sheet column the report names
//! samples by; a disagreement aborts the whole reconciliation before any
//! record is written. Rows whose number falls outside the sample
//! list are skipped.

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::{NameColumn, RunInfo, SampleRecord, SampleStatistics, StatValue};
use crate::error::MetadataError;
use crate::naming::{canonical_name, canonical_name_at};

pub const XML_STATISTICS_FILE: &str = "GenerateFASTQRunStatistics.xml";
pub const INDEXING_QC_FILE: &str = "indexingQC.txt";

/// The statistics report available for a run, probed in priority order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatisticsSource {
    Xml(Utf8PathBuf),
    IndexingQc(Utf8PathBuf),
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatisticsKind {
    Xml,
    IndexingQc,
    None,
}

impl StatisticsSource {
    pub fn detect(run_dir: &Utf8Path) -> Self {
        let xml = run_dir.join(XML_STATISTICS_FILE);
        if xml.as_std_path().is_file() {
            return StatisticsSource::Xml(xml);
        }
        let text = run_dir.join(INDEXING_QC_FILE);
        if text.as_std_path().is_file() {
            return StatisticsSource::IndexingQc(text);
        }
        StatisticsSource::None
    }

    pub fn kind(&self) -> StatisticsKind {
        match self {
            StatisticsSource::Xml(_) => StatisticsKind::Xml,
            StatisticsSource::IndexingQc(_) => StatisticsKind::IndexingQc,
            StatisticsSource::None => StatisticsKind::None,
        }
    }

    /// Reads the report. `None` when the run has no statistics.
    pub fn load(&self, name_column: NameColumn) -> Result<Option<RunStatistics>, MetadataError> {
        let path = match self {
            StatisticsSource::Xml(path) | StatisticsSource::IndexingQc(path) => path,
            StatisticsSource::None => return Ok(None),
        };
        let text = fs::read_to_string(path.as_std_path())
            .map_err(|err| MetadataError::Filesystem(format!("read {path}: {err}")))?;
        let parsed = match self {
            StatisticsSource::Xml(_) => parse_statistics_xml(&text, name_column),
            _ => parse_indexing_qc(&text),
        };
        parsed.map(Some).map_err(|err| match err {
            MetadataError::MalformedRunStats(message) => {
                MetadataError::MalformedRunStats(format!("{path}: {message}"))
            }
            other => other,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunStatistics {
    /// Always positive.
    pub total_clusters_pf: f64,
    /// Sheet column the report's sample names come from.
    pub names_from: NameColumn,
    pub rows: Vec<StatisticsRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatisticsRow {
    pub sample_number: usize,
    /// Sample name as found in the report.
    pub name: String,
    pub clusters: ClusterCount,
}

/// The XML report gives absolute counts, the indexing QC table gives percents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClusterCount {
    Absolute(f64),
    Percent(f64),
}

/// Join key of a statistics row: ordinal position plus canonical name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleKey {
    pub sample_number: usize,
    pub name: String,
}

impl StatisticsRow {
    pub fn key(&self) -> SampleKey {
        SampleKey {
            sample_number: self.sample_number,
            name: canonical_name(&self.name),
        }
    }

    fn statistics(&self, total: f64, run_info: &RunInfo) -> SampleStatistics {
        let (clusters, percent) = match self.clusters {
            ClusterCount::Absolute(count) => (count.round() as u64, count / total * 100.0),
            ClusterCount::Percent(percent) => {
                let percent = (percent * 100.0).round() / 100.0;
                ((percent * total / 100.0).round() as u64, percent)
            }
        };
        SampleStatistics {
            number_of_clusters_pf: StatValue::Value(clusters),
            total_clusters_in_run: StatValue::Value(total.round() as u64),
            percent_of_clusters: StatValue::Value(format!("{percent:.2}")),
            flowcell: StatValue::Value(run_info.flowcell.clone()),
            instrument: StatValue::Value(run_info.instrument.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    pub source: StatisticsKind,
    pub matched: usize,
    pub skipped: usize,
}

/// Writes run statistics into `samples`. Without statistics every sample is
/// numbered by position and its counts are set to "NA".
pub fn reconcile(
    samples: &mut [SampleRecord],
    run_info: &RunInfo,
    source: &StatisticsSource,
    name_column: NameColumn,
) -> Result<ReconcileSummary, MetadataError> {
    let Some(statistics) = source.load(name_column)? else {
        info!(samples = samples.len(), "no run statistics found, using NA values");
        for (idx, sample) in samples.iter_mut().enumerate() {
            sample.sample_number = idx + 1;
            sample.statistics = SampleStatistics::not_available(run_info);
        }
        return Ok(ReconcileSummary {
            source: StatisticsKind::None,
            matched: 0,
            skipped: 0,
        });
    };

    let plan = match_rows(samples, &statistics)?;
    for (idx, row) in &plan.matches {
        let sample = &mut samples[*idx];
        sample.sample_number = row.sample_number;
        sample.statistics = row.statistics(statistics.total_clusters_pf, run_info);
        debug!(
            sample = %sample.name,
            clusters = %sample.statistics.number_of_clusters_pf,
            percent = %sample.statistics.percent_of_clusters,
            "reconciled sample"
        );
    }
    let summary = ReconcileSummary {
        source: source.kind(),
        matched: plan.matches.len(),
        skipped: plan.skipped,
    };
    info!(
        matched = summary.matched,
        skipped = summary.skipped,
        total_clusters = statistics.total_clusters_pf,
        "reconciled run statistics"
    );
    Ok(summary)
}

struct JoinPlan<'r> {
    matches: Vec<(usize, &'r StatisticsRow)>,
    skipped: usize,
}

/// Resolves every row to a sample index, checking names. Nothing is written
/// here, so a mismatch leaves the records untouched.
fn match_rows<'r>(
    samples: &[SampleRecord],
    statistics: &'r RunStatistics,
) -> Result<JoinPlan<'r>, MetadataError> {
    let mut plan = JoinPlan {
        matches: Vec::with_capacity(statistics.rows.len()),
        skipped: 0,
    };
    for row in &statistics.rows {
        let key = row.key();
        let Some(idx) = key
            .sample_number
            .checked_sub(1)
            .filter(|idx| *idx < samples.len())
        else {
            warn!(
                sample_number = key.sample_number,
                sample = %key.name,
                samples = samples.len(),
                "statistics row has no matching sample, skipping"
            );
            plan.skipped += 1;
            continue;
        };
        let expected = expected_name(&samples[idx], statistics.names_from);
        if expected != key.name {
            return Err(MetadataError::SampleNameMismatch {
                sample_number: key.sample_number,
                expected,
                found: key.name,
            });
        }
        plan.matches.push((idx, row));
    }
    Ok(plan)
}

/// Canonical value of `column` for a sheet record. `SampleName` is what the
/// record was already named by, since it falls back to the ID itself.
fn expected_name(sample: &SampleRecord, column: NameColumn) -> String {
    match column {
        NameColumn::SampleName => sample.name.clone(),
        NameColumn::SampleId => sample
            .run
            .get(column.header_key())
            .map(canonical_name)
            .unwrap_or_else(|| sample.name.clone()),
    }
}

#[derive(Debug, Deserialize)]
struct StatisticsXml {
    #[serde(rename = "RunStats")]
    run_stats: Option<RunStatsXml>,
    #[serde(rename = "OverallSamples")]
    overall_samples: Option<OverallSamplesXml>,
}

#[derive(Debug, Deserialize)]
struct RunStatsXml {
    #[serde(rename = "NumberOfClustersPF")]
    number_of_clusters_pf: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OverallSamplesXml {
    #[serde(rename = "SummarizedSampleStatistics", default)]
    samples: Vec<SampleStatisticsXml>,
}

#[derive(Debug, Deserialize)]
struct SampleStatisticsXml {
    #[serde(rename = "SampleNumber")]
    sample_number: Option<String>,
    #[serde(rename = "SampleID")]
    sample_id: Option<String>,
    #[serde(rename = "SampleName")]
    sample_name: Option<String>,
    #[serde(rename = "NumberOfClustersPF")]
    number_of_clusters_pf: Option<String>,
}

impl SampleStatisticsXml {
    /// Mirrors the column choice made for the sample sheet.
    fn name(&self, name_column: NameColumn) -> Option<&str> {
        let id = self.sample_id.as_deref().filter(|id| !id.trim().is_empty());
        match name_column {
            NameColumn::SampleName => self
                .sample_name
                .as_deref()
                .filter(|name| !name.trim().is_empty())
                .or(id),
            NameColumn::SampleId => id,
        }
    }
}

/// Parses `GenerateFASTQRunStatistics.xml`.
pub fn parse_statistics_xml(
    text: &str,
    name_column: NameColumn,
) -> Result<RunStatistics, MetadataError> {
    let parsed: StatisticsXml = quick_xml::de::from_str(text)
        .map_err(|err| MetadataError::MalformedRunStats(err.to_string()))?;
    let total = parsed
        .run_stats
        .and_then(|stats| stats.number_of_clusters_pf)
        .ok_or_else(|| {
            MetadataError::MalformedRunStats("missing RunStats/NumberOfClustersPF".to_string())
        })
        .and_then(|value| parse_total(&value, "RunStats/NumberOfClustersPF"))?;

    let rows = parsed
        .overall_samples
        .map(|overall| overall.samples)
        .unwrap_or_default()
        .iter()
        .map(|sample| -> Result<StatisticsRow, MetadataError> {
            let number = required(&sample.sample_number, "SampleNumber")?;
            let clusters = required(&sample.number_of_clusters_pf, "NumberOfClustersPF")?;
            Ok(StatisticsRow {
                sample_number: parse_sample_number(number)?,
                name: sample.name(name_column).unwrap_or_default().to_string(),
                clusters: ClusterCount::Absolute(parse_number(clusters, "NumberOfClustersPF")?),
            })
        })
        .collect::<Result<Vec<_>, MetadataError>>()?;

    Ok(RunStatistics {
        total_clusters_pf: total,
        names_from: name_column,
        rows,
    })
}

/// Parses `indexingQC.txt`, the tab-delimited Indexing QC table copied from
/// BaseSpace. The run total is the first field of the second line; every line
/// after the first one mentioning `Index` is `number, id, _, _, _, percent`,
/// where `id` is the sheet's `Sample_ID`.
pub fn parse_indexing_qc(text: &str) -> Result<RunStatistics, MetadataError> {
    let total_field = text
        .lines()
        .nth(1)
        .and_then(|line| line.split('\t').next())
        .ok_or_else(|| MetadataError::MalformedRunStats("missing run cluster total".to_string()))?;
    let total = parse_total(total_field, "run cluster total")?;

    let rows = text
        .lines()
        .skip_while(|line| !line.contains("Index"))
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .map(|line| -> Result<StatisticsRow, MetadataError> {
            let fields = line.split('\t').map(str::trim).collect::<Vec<_>>();
            let percent = fields.get(5).ok_or_else(|| {
                MetadataError::MalformedRunStats(format!("row {line:?} has no percent column"))
            })?;
            Ok(StatisticsRow {
                sample_number: parse_sample_number(fields[0])?,
                name: canonical_name_at(&fields, 1),
                clusters: ClusterCount::Percent(parse_number(percent, "percent of reads")?),
            })
        })
        .collect::<Result<Vec<_>, MetadataError>>()?;

    Ok(RunStatistics {
        total_clusters_pf: total,
        names_from: NameColumn::SampleId,
        rows,
    })
}

fn required<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str, MetadataError> {
    value
        .as_deref()
        .ok_or_else(|| MetadataError::MalformedRunStats(format!("sample is missing {field}")))
}

fn parse_sample_number(value: &str) -> Result<usize, MetadataError> {
    value.trim().parse().map_err(|_| {
        MetadataError::MalformedRunStats(format!("invalid sample number {value:?}"))
    })
}

fn parse_number(value: &str, field: &str) -> Result<f64, MetadataError> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| MetadataError::MalformedRunStats(format!("invalid {field} {value:?}")))
}

/// Run totals divide every per-sample count, so zero is rejected.
fn parse_total(value: &str, field: &str) -> Result<f64, MetadataError> {
    let total = parse_number(value, field)?;
    if !(total.is_finite() && total > 0.0) {
        return Err(MetadataError::MalformedRunStats(format!(
            "{field} must be positive, found {value:?}"
        )));
    }
    Ok(total)
}
