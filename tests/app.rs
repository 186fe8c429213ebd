use std::cell::RefCell;

use camino::Utf8PathBuf;

use seqrun_metadata::app::{ProgressEvent, ProgressSink, RunMetadata};
use seqrun_metadata::config::{Config, ConfigLoader, ConfigOverrides};
use seqrun_metadata::output::JsonOutput;
use seqrun_metadata::run_stats::StatisticsKind;

const SHEET: &str = "\
[Header]
IEMFileVersion,4
Investigator Name,Jane Doe
Date,2/16/2017

[Reads]
151
151

[Settings]
ReverseComplement,0

[Data]
Sample_ID,Sample_Name,index
S1,Strain A.1,TAAGGCGA
S2,Strain B.2,CGTACTAG
";

const RUN_INFO: &str = r#"<?xml version="1.0"?>
<RunInfo Version="2">
  <Run Id="170216_M02466_0010_000000000-AYL1J" Number="10">
    <Flowcell>000000000-AYL1J</Flowcell>
    <Instrument>M02466</Instrument>
  </Run>
</RunInfo>
"#;

const STATS_XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<StatisticsGenerateFASTQRunStatistics>
  <RunStats>
    <NumberOfClustersPF>2000</NumberOfClustersPF>
  </RunStats>
  <OverallSamples>
    <SummarizedSampleStatistics>
      <SampleNumber>1</SampleNumber>
      <SampleID>S1</SampleID>
      <SampleName>Strain A.1</SampleName>
      <NumberOfClustersPF>1500</NumberOfClustersPF>
    </SummarizedSampleStatistics>
    <SummarizedSampleStatistics>
      <SampleNumber>2</SampleNumber>
      <SampleID>S2</SampleID>
      <SampleName>Strain B.2</SampleName>
      <NumberOfClustersPF>500</NumberOfClustersPF>
    </SummarizedSampleStatistics>
  </OverallSamples>
</StatisticsGenerateFASTQRunStatistics>
"#;

#[derive(Default)]
struct RecordingSink {
    messages: RefCell<Vec<String>>,
}

impl ProgressSink for RecordingSink {
    fn event(&self, event: ProgressEvent) {
        self.messages.borrow_mut().push(event.message);
    }
}

fn run_dir(files: &[(&str, &str)]) -> (tempfile::TempDir, Utf8PathBuf) {
    let temp = tempfile::tempdir().unwrap();
    let dir = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    for (name, content) in files {
        std::fs::write(dir.join(name).as_std_path(), content).unwrap();
    }
    (temp, dir)
}

fn resolve(dir: &Utf8PathBuf) -> seqrun_metadata::config::ResolvedConfig {
    let config = Config {
        path: Some(dir.clone()),
        commit: Some("abc123".to_string()),
        ..Config::default()
    };
    ConfigLoader::resolve_config(config, ConfigOverrides::default()).unwrap()
}

#[test]
fn collects_full_run() {
    let (_temp, dir) = run_dir(&[
        ("SampleSheet.csv", SHEET),
        ("RunInfo.xml", RUN_INFO),
        ("GenerateFASTQRunStatistics.xml", STATS_XML),
    ]);
    let sink = RecordingSink::default();

    let metadata = RunMetadata::collect(&resolve(&dir), &sink).unwrap();

    assert_eq!(metadata.run_info.run_id, "170216_M02466_0010_000000000-AYL1J");
    assert_eq!(metadata.date.as_deref(), Some("2/16/2017"));
    assert_eq!(metadata.number_of_reads, 2);
    assert_eq!(metadata.statistics.source, StatisticsKind::Xml);
    assert_eq!(metadata.samples.len(), 2);

    let first = &metadata.samples[0];
    assert_eq!(first.name, "Strain-A-1");
    assert_eq!(first.statistics.percent_of_clusters.to_string(), "75.00");
    assert_eq!(first.statistics.flowcell.to_string(), "000000000-AYL1J");
    assert_eq!(first.general.output_directory, dir.join("Strain-A-1"));
    assert_eq!(first.general.pipeline_commit, "abc123");

    let messages = sink.messages.borrow();
    assert_eq!(messages.len(), 3);
    assert!(messages[0].starts_with("phase=RunInfo"));
    assert!(messages[1].starts_with("phase=SampleSheet"));
    assert!(messages[2].starts_with("phase=RunStats"));
}

#[test]
fn run_without_run_info_or_statistics() {
    let (_temp, dir) = run_dir(&[("SampleSheet.csv", SHEET)]);

    let metadata = RunMetadata::collect(&resolve(&dir), &JsonOutput).unwrap();

    assert_eq!(metadata.run_info.flowcell, "NA");
    assert_eq!(metadata.statistics.source, StatisticsKind::None);
    for sample in &metadata.samples {
        assert_eq!(sample.statistics.number_of_clusters_pf.to_string(), "NA");
        assert_eq!(sample.statistics.flowcell.to_string(), "NA");
    }
}

#[test]
fn metadata_serializes_in_sheet_order() {
    let (_temp, dir) = run_dir(&[
        ("SampleSheet.csv", SHEET),
        ("GenerateFASTQRunStatistics.xml", STATS_XML),
    ]);
    let metadata = RunMetadata::collect(&resolve(&dir), &JsonOutput).unwrap();

    let out = dir.join("out").join("metadata.json");
    JsonOutput::write_metadata(&out, &metadata).unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(out.as_std_path()).unwrap()).unwrap();

    assert_eq!(json["samples"][0]["name"], "Strain-A-1");
    assert_eq!(json["samples"][1]["sample_number"], 2);
    assert_eq!(json["samples"][1]["statistics"]["NumberOfClustersPF"], 500);
    assert_eq!(json["samples"][1]["statistics"]["PercentOfClusters"], "25.00");
    assert_eq!(json["samples"][1]["statistics"]["flowcell"], "NA");
    assert_eq!(json["samples"][0]["run"]["InvestigatorName"], "Jane Doe");
    assert_eq!(json["statistics"]["source"], "xml");
    assert_eq!(json["header"]["Date"], "2/16/2017");
}
