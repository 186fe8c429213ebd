use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum MetadataError {
    #[error("cannot find sample sheet at {0}")]
    #[diagnostic(help("pass --sample-sheet or check the run directory"))]
    MissingSampleSheet(Utf8PathBuf),

    #[error("cannot find custom sample sheet as specified: {0}")]
    MissingCustomSampleSheet(Utf8PathBuf),

    #[error(
        "sample {sample_number}: name {found:?} in run statistics does not match sample sheet name {expected:?}"
    )]
    #[diagnostic(help(
        "the statistics report and the sample sheet disagree on sample order or identity"
    ))]
    SampleNameMismatch {
        sample_number: usize,
        expected: String,
        found: String,
    },

    #[error("malformed sample sheet: {0}")]
    MalformedSampleSheet(String),

    #[error("malformed run info: {0}")]
    MalformedRunInfo(String),

    #[error("malformed run statistics: {0}")]
    MalformedRunStats(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(Utf8PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl MetadataError {
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            MetadataError::MissingSampleSheet(_)
                | MetadataError::MissingCustomSampleSheet(_)
                | MetadataError::ConfigRead(_)
                | MetadataError::ConfigParse(_)
        )
    }

    pub fn is_integrity(&self) -> bool {
        matches!(self, MetadataError::SampleNameMismatch { .. })
    }
}
