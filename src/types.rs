//! Core types for qblast

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Remote database to search against
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Database {
    /// Nucleotide collection (default)
    #[default]
    Nt,
    /// Non-redundant protein sequences
    Nr,
    /// RefSeq RNA
    RefseqRna,
    /// RefSeq protein
    RefseqProtein,
    /// UniProtKB/Swiss-Prot
    Swissprot,
    /// Protein Data Bank proteins
    Pdbaa,
    /// Protein Data Bank nucleotides
    Pdbnt,
}

impl Database {
    /// All supported databases
    pub const ALL: [Database; 7] = [
        Database::Nt,
        Database::Nr,
        Database::RefseqRna,
        Database::RefseqProtein,
        Database::Swissprot,
        Database::Pdbaa,
        Database::Pdbnt,
    ];

    /// Name sent in the `DATABASE` parameter
    pub fn as_str(&self) -> &'static str {
        match self {
            Database::Nt => "nt",
            Database::Nr => "nr",
            Database::RefseqRna => "refseq_rna",
            Database::RefseqProtein => "refseq_protein",
            Database::Swissprot => "swissprot",
            Database::Pdbaa => "pdbaa",
            Database::Pdbnt => "pdbnt",
        }
    }
}

/// Search program
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Program {
    /// Nucleotide query against nucleotide database (default)
    #[default]
    Blastn,
    /// Protein query against protein database
    Blastp,
    /// Protein query against translated nucleotide database
    Tblastn,
    /// Translated protein search
    Tblastp,
}

impl Program {
    /// All supported programs
    pub const ALL: [Program; 4] = [
        Program::Blastn,
        Program::Blastp,
        Program::Tblastn,
        Program::Tblastp,
    ];

    /// Name sent in the `PROGRAM` parameter
    pub fn as_str(&self) -> &'static str {
        match self {
            Program::Blastn => "blastn",
            Program::Blastp => "blastp",
            Program::Tblastn => "tblastn",
            Program::Tblastp => "tblastp",
        }
    }
}

/// Result format requested at download time
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Structured JSON (default)
    #[default]
    Json,
    /// Plain text report
    Text,
    /// XML
    Xml,
    /// XML version 2
    Xml2,
    /// HTML report
    Html,
    /// Tab-separated hit table
    Tab,
}

impl OutputFormat {
    /// All supported output formats
    pub const ALL: [OutputFormat; 6] = [
        OutputFormat::Json,
        OutputFormat::Text,
        OutputFormat::Xml,
        OutputFormat::Xml2,
        OutputFormat::Html,
        OutputFormat::Tab,
    ];

    /// Logical name used in configuration
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Text => "text",
            OutputFormat::Xml => "xml",
            OutputFormat::Xml2 => "xml2",
            OutputFormat::Html => "html",
            OutputFormat::Tab => "tab",
        }
    }

    /// Protocol token sent in the `FORMAT_TYPE` parameter
    pub fn token(&self) -> &'static str {
        match self {
            OutputFormat::Json => "JSON2",
            OutputFormat::Text => "Text",
            OutputFormat::Xml => "XML",
            OutputFormat::Xml2 => "XML2",
            OutputFormat::Html => "HTML",
            OutputFormat::Tab => "Tabular",
        }
    }
}

macro_rules! impl_name_conversions {
    ($ty:ty, $field:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                <$ty>::ALL
                    .into_iter()
                    .find(|v| v.as_str() == s)
                    .ok_or_else(|| Error::Validation {
                        field: $field,
                        value: s.to_string(),
                    })
            }
        }
    };
}

impl_name_conversions!(Database, "database");
impl_name_conversions!(Program, "program");
impl_name_conversions!(OutputFormat, "output format");

/// A search to submit
///
/// Database and program are already validated by their types; the query text is
/// sent as-is.
#[derive(Clone, PartialEq, Eq)]
pub struct JobRequest {
    database: Database,
    program: Program,
    query: String,
    megablast: bool,
    credential: Option<String>,
}

impl JobRequest {
    /// Create a request for `query` (typically FASTA text)
    pub fn new(database: Database, program: Program, query: impl Into<String>) -> Self {
        Self {
            database,
            program,
            query: query.into(),
            megablast: false,
            credential: None,
        }
    }

    /// Enable or disable megablast
    pub fn with_megablast(mut self, enabled: bool) -> Self {
        self.megablast = enabled;
        self
    }

    /// Attach an API key
    pub fn with_credential(mut self, key: impl Into<String>) -> Self {
        self.credential = Some(key.into());
        self
    }

    /// Target database
    pub fn database(&self) -> Database {
        self.database
    }

    /// Search program
    pub fn program(&self) -> Program {
        self.program
    }

    /// Query sequence text
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Whether megablast is requested
    pub fn megablast(&self) -> bool {
        self.megablast
    }

    /// API key, if any
    pub fn credential(&self) -> Option<&str> {
        self.credential.as_deref()
    }
}

impl fmt::Debug for JobRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobRequest")
            .field("database", &self.database)
            .field("program", &self.program)
            .field("query_len", &self.query.len())
            .field("megablast", &self.megablast)
            .field("credential", &self.credential.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Handle to a submitted job
///
/// The request id is the only correlation key with the service. It is fixed at
/// submission and never changes.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct JobHandle {
    request_id: String,
    estimated_wait: Duration,
}

impl JobHandle {
    pub(crate) fn new(request_id: String, estimated_wait: Duration) -> Self {
        Self {
            request_id,
            estimated_wait,
        }
    }

    /// Request id (`RID`) assigned by the service
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Estimated time to completion reported at submission (`RTOE`)
    pub fn estimated_wait(&self) -> Duration {
        self.estimated_wait
    }
}

/// Classification of one status check
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollOutcome {
    /// The service is still working on the job
    StillRunning,
    /// Results are available for download
    Ready,
    /// Neither a status nor a hits indicator was reported
    Unknown,
}

/// Lifecycle state of a [`JobClient`](crate::JobClient)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum JobState {
    /// Nothing submitted yet, or a submission is in flight
    #[default]
    Submitting,
    /// Submission accepted, request id known
    Submitted,
    /// Status checks in progress
    Polling,
    /// Results available
    Ready,
    /// Result archive being fetched and extracted
    Downloading,
    /// Results extracted
    Done,
    /// A lifecycle step failed
    Failed,
}

impl JobState {
    /// Whether the lifecycle allows moving from `self` to `next`
    pub fn can_transition_to(&self, next: JobState) -> bool {
        use JobState::*;
        matches!(
            (self, next),
            (Submitting, Submitted)
                | (Submitted, Polling)
                | (Polling, Polling)
                | (Polling, Ready)
                | (Ready, Downloading)
                | (Downloading, Done)
                | (Submitting | Polling | Downloading, Failed)
        )
    }

    /// Whether no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Done | JobState::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobState::Submitting => "submitting",
            JobState::Submitted => "submitted",
            JobState::Polling => "polling",
            JobState::Ready => "ready",
            JobState::Downloading => "downloading",
            JobState::Done => "done",
            JobState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Files materialized by a download
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadResult {
    /// Directory the archive was extracted into
    pub destination: PathBuf,
    /// Extracted files (directories excluded), in archive order
    pub files: Vec<PathBuf>,
}
