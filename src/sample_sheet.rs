//! Parser for Illumina `SampleSheet.csv` files.
//!
//! The sheet is a comma-separated document split into bracketed sections.
//! Lines outside `[Data]`/`[Reads]` are `key,value` header pairs; inside, lines
//! before the `Sample_ID` column row are read lengths and lines after it are
//! samples, numbered by their distance from the column row. Blank lines are
//! skipped and do not count.

use camino::{Utf8Path, Utf8PathBuf};
use csv::{ReaderBuilder, StringRecord};
use tracing::{debug, info, warn};

use crate::domain::{
    GeneralInfo, NOT_AVAILABLE, NameColumn, ReadLengths, RunHeader, SampleRecord,
    SampleStatistics,
};
use crate::error::MetadataError;
use crate::naming::canonical_name;

/// Values stamped onto each parsed sample.
#[derive(Debug, Clone)]
pub struct SheetOptions {
    pub name_column: NameColumn,
    /// Per-sample output directories are created below this path.
    pub output_root: Utf8PathBuf,
    pub commit: String,
}

#[derive(Debug, Clone)]
pub struct SampleSheet {
    pub header: RunHeader,
    pub samples: Vec<SampleRecord>,
    pub read_lengths: ReadLengths,
    pub date: Option<String>,
}

impl SampleSheet {
    pub fn from_path(path: &Utf8Path, options: &SheetOptions) -> Result<Self, MetadataError> {
        if !path.as_std_path().is_file() {
            return Err(MetadataError::MissingSampleSheet(path.to_path_buf()));
        }
        let reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path.as_std_path())
            .map_err(|err| csv_error(path, err))?;
        let mut parser = SheetParser::new(options);
        for record in reader.into_records() {
            let record = record.map_err(|err| csv_error(path, err))?;
            parser.push(&record)?;
        }
        let sheet = parser.finish();
        info!(
            path = %path,
            samples = sheet.samples.len(),
            header_fields = sheet.header.len(),
            "parsed sample sheet"
        );
        Ok(sheet)
    }

    /// Parses sample-sheet text that is already in memory.
    pub fn from_text(text: &str, options: &SheetOptions) -> Result<Self, MetadataError> {
        let reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes());
        let mut parser = SheetParser::new(options);
        for record in reader.into_records() {
            let record =
                record.map_err(|err| MetadataError::MalformedSampleSheet(err.to_string()))?;
            parser.push(&record)?;
        }
        Ok(parser.finish())
    }
}

struct SheetParser<'a> {
    options: &'a SheetOptions,
    header: RunHeader,
    samples: Vec<SampleRecord>,
    read_lengths: ReadLengths,
    in_samples: bool,
    columns: Vec<String>,
    /// Count of non-blank lines seen so far.
    ordinal: u64,
    baseline: u64,
}

impl<'a> SheetParser<'a> {
    fn new(options: &'a SheetOptions) -> Self {
        Self {
            options,
            header: RunHeader::new(),
            samples: Vec::new(),
            read_lengths: ReadLengths::default(),
            in_samples: false,
            columns: Vec::new(),
            ordinal: 0,
            baseline: 0,
        }
    }

    fn push(&mut self, record: &StringRecord) -> Result<(), MetadataError> {
        let mut fields = record.iter().map(str::to_string).collect::<Vec<_>>();
        if let Some(last) = fields.last_mut() {
            last.truncate(last.trim_end().len());
        }
        if fields.iter().all(|field| field.is_empty()) {
            return Ok(());
        }
        self.ordinal += 1;
        let line = record.position().map(|pos| pos.line()).unwrap_or_default();
        let raw = fields.join(",");
        let bracketed = raw.starts_with('[');

        if raw.contains("[Settings]") {
            self.in_samples = false;
        }

        if !bracketed && !self.in_samples {
            self.header
                .insert(fields[0].replace(' ', ""), fields[1..].concat());
        } else if raw.contains("[Data]") || raw.contains("[Reads]") {
            self.in_samples = true;
        } else if bracketed {
            debug!(line, section = %raw, "skipping section header");
        } else if self.in_samples && raw.contains("Sample_ID") {
            self.columns = fields
                .iter()
                .map(|field| field.replace(['_', ' '], ""))
                .collect();
            self.baseline = self.ordinal;
        } else if !self.columns.is_empty() {
            self.push_sample(&fields, line);
        } else {
            self.push_read_length(&fields[0], line)?;
        }
        Ok(())
    }

    fn push_sample(&mut self, fields: &[String], line: u64) {
        let name = canonical_name(self.name_field(fields));
        if fields.len() > self.columns.len() {
            warn!(
                line,
                sample = %name,
                fields = fields.len(),
                columns = self.columns.len(),
                "sample row has more fields than the column row, ignoring the extra fields"
            );
        }
        let mut run = self.header.clone();
        for (column, value) in self.columns.iter().zip(fields) {
            if value.is_empty() {
                run.insert(column.as_str(), NOT_AVAILABLE);
            } else {
                run.insert(column.as_str(), value.as_str());
            }
        }
        let sample_number = (self.ordinal - self.baseline) as usize;
        debug!(sample = %name, sample_number, "sample sheet row");
        self.samples.push(SampleRecord {
            general: GeneralInfo {
                output_directory: self.options.output_root.join(&name),
                pipeline_commit: self.options.commit.clone(),
            },
            name,
            run,
            sample_number,
            statistics: SampleStatistics::default(),
        });
    }

    fn name_field<'f>(&self, fields: &'f [String]) -> &'f str {
        let cell = |key: &str| {
            self.columns
                .iter()
                .position(|column| column == key)
                .and_then(|idx| fields.get(idx))
                .map(String::as_str)
                .filter(|value| !value.trim().is_empty())
        };
        let preferred = match self.options.name_column {
            NameColumn::SampleName => cell("SampleName").or_else(|| cell("SampleID")),
            NameColumn::SampleId => cell("SampleID"),
        };
        preferred
            .or_else(|| fields.first().map(String::as_str))
            .unwrap_or_default()
    }

    fn push_read_length(&mut self, value: &str, line: u64) -> Result<(), MetadataError> {
        let length = value.trim().parse::<u64>().map_err(|_| {
            MetadataError::MalformedSampleSheet(format!(
                "line {line}: expected a read length, found {value:?}"
            ))
        })?;
        if self.read_lengths.forward.is_none() {
            self.read_lengths.forward = Some(length);
            self.header.insert("forwardlength", value.trim());
        } else {
            self.read_lengths.reverse = Some(length);
            self.header.insert("reverselength", value.trim());
        }
        self.read_lengths.total += length;
        Ok(())
    }

    fn finish(mut self) -> SampleSheet {
        let date = self.header.get("Date").map(str::to_string);
        for sample in &mut self.samples {
            if !sample.run.contains_key("InvestigatorName") {
                sample.run.insert("InvestigatorName", NOT_AVAILABLE);
            }
        }
        SampleSheet {
            header: self.header,
            samples: self.samples,
            read_lengths: self.read_lengths,
            date,
        }
    }
}

fn csv_error(path: &Utf8Path, err: csv::Error) -> MetadataError {
    if err.is_io_error() {
        MetadataError::Filesystem(format!("read {path}: {err}"))
    } else {
        MetadataError::MalformedSampleSheet(format!("{path}: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> SheetOptions {
        SheetOptions {
            name_column: NameColumn::SampleName,
            output_root: Utf8PathBuf::from("/runs/run1"),
            commit: "0.1.0".to_string(),
        }
    }

    #[test]
    fn settings_section_ends_read_lengths() {
        let text = "[Reads]\n151\n151\n\n[Settings]\nAdapter,CTGTCTCTTATA\n";
        let sheet = SampleSheet::from_text(text, &options()).unwrap();
        assert_eq!(sheet.read_lengths.forward, Some(151));
        assert_eq!(sheet.read_lengths.reverse, Some(151));
        assert_eq!(sheet.read_lengths.total, 302);
        assert_eq!(sheet.header.get("Adapter"), Some("CTGTCTCTTATA"));
        assert!(sheet.samples.is_empty());
    }

    #[test]
    fn non_numeric_read_length_is_rejected() {
        let err = SampleSheet::from_text("[Reads]\nlong\n", &options()).unwrap_err();
        assert!(matches!(err, MetadataError::MalformedSampleSheet(_)));
    }

    #[test]
    fn extra_row_fields_are_ignored() {
        let text = "[Data]\nSample_ID,Sample_Name\nS1,Strain A,stray,more\n";
        let sheet = SampleSheet::from_text(text, &options()).unwrap();
        let sample = &sheet.samples[0];
        assert_eq!(sample.name, "Strain-A");
        assert_eq!(sample.run.get("SampleName"), Some("Strain A"));
        assert!(sample.run.iter().all(|(_, value)| value != "stray" && value != "more"));
    }

    #[test]
    fn falls_back_to_sample_id_for_empty_name() {
        let text = "[Data]\nSample_ID,Sample_Name\nS1.a,\n";
        let sheet = SampleSheet::from_text(text, &options()).unwrap();
        assert_eq!(sheet.samples[0].name, "S1-a");
        assert_eq!(sheet.samples[0].run.get("SampleName"), Some("NA"));
    }
}
