use std::fs;

use camino::Utf8Path;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use tracing::{info, warn};

use crate::domain::RunInfo;
use crate::error::MetadataError;

/// Reads flowcell, instrument and run identifiers from `RunInfo.xml`.
///
/// The file is optional: when it cannot be read or parsed every field keeps
/// its "NA" default and processing carries on.
pub fn extract_run_info(path: &Utf8Path) -> RunInfo {
    let text = match fs::read_to_string(path.as_std_path()) {
        Ok(text) => text,
        Err(err) => {
            warn!(path = %path, error = %err, "run info unavailable, using NA values");
            return RunInfo::default();
        }
    };
    match parse_run_info(&text) {
        Ok(run_info) => {
            info!(
                flowcell = %run_info.flowcell,
                instrument = %run_info.instrument,
                run_id = %run_info.run_id,
                "parsed run info"
            );
            run_info
        }
        Err(err) => {
            warn!(path = %path, error = %err, "run info unreadable, using NA values");
            RunInfo::default()
        }
    }
}

/// Parses `RunInfo.xml` content. The last element carrying both `Id` and
/// `Number` attributes names the run; the last `Flowcell`/`Instrument` text wins.
pub fn parse_run_info(text: &str) -> Result<RunInfo, MetadataError> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut run_info = RunInfo::default();
    let mut open = Vec::<String>::new();
    loop {
        match reader.read_event().map_err(malformed)? {
            Event::Start(element) => {
                read_run_attributes(&element, &mut run_info)?;
                open.push(local_name(&element));
            }
            Event::Empty(element) => read_run_attributes(&element, &mut run_info)?,
            Event::End(_) => {
                open.pop();
            }
            Event::Text(text) => {
                let value = text.unescape().map_err(malformed)?.into_owned();
                match open.last().map(String::as_str) {
                    Some("Flowcell") => run_info.flowcell = value,
                    Some("Instrument") => run_info.instrument = value,
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(run_info)
}

fn read_run_attributes(
    element: &BytesStart<'_>,
    run_info: &mut RunInfo,
) -> Result<(), MetadataError> {
    let id = element.try_get_attribute("Id").map_err(malformed)?;
    let number = element.try_get_attribute("Number").map_err(malformed)?;
    if let (Some(id), Some(number)) = (id, number) {
        run_info.run_id = id.unescape_value().map_err(malformed)?.into_owned();
        run_info.run_number = number.unescape_value().map_err(malformed)?.into_owned();
    }
    Ok(())
}

fn local_name(element: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(element.local_name().as_ref()).into_owned()
}

fn malformed(err: impl std::fmt::Display) -> MetadataError {
    MetadataError::MalformedRunInfo(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_run_and_instrument() {
        let xml = r#"<?xml version="1.0"?>
<RunInfo Version="2">
  <Run Id="170216_M02466_0010_000000000-AYL1J" Number="10">
    <Flowcell>000000000-AYL1J</Flowcell>
    <Instrument>M02466</Instrument>
    <Date>170216</Date>
  </Run>
</RunInfo>"#;
        let run_info = parse_run_info(xml).unwrap();
        assert_eq!(run_info.run_id, "170216_M02466_0010_000000000-AYL1J");
        assert_eq!(run_info.run_number, "10");
        assert_eq!(run_info.flowcell, "000000000-AYL1J");
        assert_eq!(run_info.instrument, "M02466");
    }

    #[test]
    fn missing_fields_stay_na() {
        let run_info = parse_run_info("<RunInfo><Run Id=\"x\"/></RunInfo>").unwrap();
        assert_eq!(run_info, RunInfo::default());
    }
}
