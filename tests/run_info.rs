use camino::Utf8PathBuf;

use seqrun_metadata::domain::RunInfo;
use seqrun_metadata::run_info::extract_run_info;

const RUN_INFO: &str = r#"<?xml version="1.0"?>
<RunInfo xmlns:xsd="http://www.w3.org/2001/XMLSchema" Version="2">
  <Run Id="170216_M02466_0010_000000000-AYL1J" Number="10">
    <Flowcell>000000000-AYL1J</Flowcell>
    <Instrument>M02466</Instrument>
    <Date>170216</Date>
    <Reads>
      <Read NumCycles="151" Number="1" IsIndexedRead="N" />
      <Read NumCycles="8" Number="2" IsIndexedRead="Y" />
    </Reads>
    <FlowcellLayout LaneCount="1" SurfaceCount="2" SwathCount="1" TileCount="14" />
  </Run>
</RunInfo>
"#;

#[test]
fn extracts_run_identifiers() {
    let temp = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::from_path_buf(temp.path().join("RunInfo.xml")).unwrap();
    std::fs::write(path.as_std_path(), RUN_INFO).unwrap();

    let run_info = extract_run_info(&path);
    assert_eq!(run_info.flowcell, "000000000-AYL1J");
    assert_eq!(run_info.instrument, "M02466");
    assert_eq!(run_info.run_id, "170216_M02466_0010_000000000-AYL1J");
    assert_eq!(run_info.run_number, "10");
}

#[test]
fn absent_file_yields_defaults() {
    let temp = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::from_path_buf(temp.path().join("RunInfo.xml")).unwrap();

    let run_info = extract_run_info(&path);
    assert_eq!(run_info, RunInfo::default());
    assert_eq!(run_info.flowcell, "NA");
    assert_eq!(run_info.run_number, "NA");
}

#[test]
fn unparseable_file_yields_defaults() {
    let temp = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::from_path_buf(temp.path().join("RunInfo.xml")).unwrap();
    std::fs::write(path.as_std_path(), "<RunInfo><Run></Flowcell></RunInfo>").unwrap();

    assert_eq!(extract_run_info(&path), RunInfo::default());
}
