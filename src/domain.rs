use std::fmt;

use camino::Utf8PathBuf;
use clap::ValueEnum;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

pub const NOT_AVAILABLE: &str = "NA";

/// Which sample-sheet column provides the sample name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum NameColumn {
    /// `Sample_Name`, falling back to `Sample_ID` when the cell is empty.
    #[default]
    SampleName,
    SampleId,
}

impl NameColumn {
    /// Normalized header key of the column.
    pub fn header_key(self) -> &'static str {
        match self {
            NameColumn::SampleName => "SampleName",
            NameColumn::SampleId => "SampleID",
        }
    }
}

impl fmt::Display for NameColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameColumn::SampleName => write!(f, "sample_name"),
            NameColumn::SampleId => write!(f, "sample_id"),
        }
    }
}

/// Ordered key/value store for sample-sheet header fields and per-sample columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunHeader {
    entries: Vec<(String, String)>,
}

impl RunHeader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key`, keeping its original position when it already exists.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for RunHeader {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// A statistics field: never written, explicitly unavailable, or known.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum StatValue<T> {
    #[default]
    Unset,
    NotAvailable,
    Value(T),
}

impl<T> StatValue<T> {
    pub fn is_not_available(&self) -> bool {
        matches!(self, StatValue::NotAvailable)
    }
}

impl<T: fmt::Display> fmt::Display for StatValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatValue::Unset => Ok(()),
            StatValue::NotAvailable => write!(f, "{NOT_AVAILABLE}"),
            StatValue::Value(value) => write!(f, "{value}"),
        }
    }
}

impl<T: Serialize> Serialize for StatValue<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            StatValue::Unset => serializer.serialize_none(),
            StatValue::NotAvailable => serializer.serialize_str(NOT_AVAILABLE),
            StatValue::Value(value) => value.serialize(serializer),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SampleStatistics {
    #[serde(rename = "NumberOfClustersPF")]
    pub number_of_clusters_pf: StatValue<u64>,
    pub total_clusters_in_run: StatValue<u64>,
    pub percent_of_clusters: StatValue<String>,
    #[serde(rename = "flowcell")]
    pub flowcell: StatValue<String>,
    #[serde(rename = "instrument")]
    pub instrument: StatValue<String>,
}

impl SampleStatistics {
    pub fn not_available(run_info: &RunInfo) -> Self {
        Self {
            number_of_clusters_pf: StatValue::NotAvailable,
            total_clusters_in_run: StatValue::NotAvailable,
            percent_of_clusters: StatValue::NotAvailable,
            flowcell: StatValue::Value(run_info.flowcell.clone()),
            instrument: StatValue::Value(run_info.instrument.clone()),
        }
    }
}

/// Caller-supplied values stamped onto every sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneralInfo {
    pub output_directory: Utf8PathBuf,
    pub pipeline_commit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleRecord {
    pub name: String,
    /// Header snapshot taken when the row was read, plus the row's own columns.
    pub run: RunHeader,
    /// 1-based position of the row below the `Sample_ID` header line.
    pub sample_number: usize,
    pub statistics: SampleStatistics,
    pub general: GeneralInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunInfo {
    pub flowcell: String,
    pub instrument: String,
    pub run_id: String,
    pub run_number: String,
}

impl Default for RunInfo {
    fn default() -> Self {
        Self {
            flowcell: NOT_AVAILABLE.to_string(),
            instrument: NOT_AVAILABLE.to_string(),
            run_id: NOT_AVAILABLE.to_string(),
            run_number: NOT_AVAILABLE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReadLengths {
    pub forward: Option<u64>,
    pub reverse: Option<u64>,
    pub total: u64,
}

impl ReadLengths {
    pub fn number_of_reads(&self) -> u8 {
        match self.reverse {
            Some(length) if length != 0 => 2,
            _ => 1,
        }
    }
}
