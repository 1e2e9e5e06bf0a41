//! Status envelope parsing
//!
//! The service reports job state inside an HTML comment of the form
//!
//! ```text
//! <!--QBlastInfoBegin
//!     RID = ABC123
//!     RTOE = 15
//! QBlastInfoEnd
//! -->
//! ```
//!
//! [`StatusBlock::parse`] extracts those `key = value` lines into a map.

use crate::error::{Error, Phase, Result};
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

/// Field carrying the request id assigned at submission
pub const FIELD_RID: &str = "RID";
/// Field carrying the estimated time of execution in seconds
pub const FIELD_RTOE: &str = "RTOE";
/// Field carrying the job status while polling
pub const FIELD_STATUS: &str = "Status";
/// Field whose presence signals that results are available
pub const FIELD_THERE_ARE_HITS: &str = "ThereAreHits";

#[allow(clippy::expect_used)]
fn comment_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?s)<!--(.*?)-->").expect("comment pattern is valid"))
}

#[allow(clippy::expect_used)]
fn envelope_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // Greedy prefix: the last begin marker inside a comment opens the payload
        Regex::new(r"(?s).*QBlastInfoBegin(.*)QBlastInfoEnd").expect("envelope pattern is valid")
    })
}

/// Key/value fields of one status envelope
///
/// No field is guaranteed to be present. An empty block means the response carried
/// no envelope at all.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StatusBlock {
    fields: BTreeMap<String, String>,
}

impl StatusBlock {
    /// Parse the status envelope out of a response body
    ///
    /// Returns an empty block when no comment carries an envelope. When several do,
    /// the last one replaces the earlier ones. A non-blank payload line without `=`
    /// fails with [`Error::Protocol`].
    pub fn parse(body: &str, phase: Phase) -> Result<Self> {
        let mut block = StatusBlock::default();

        for comment in comment_pattern().captures_iter(body) {
            let Some(payload) = envelope_pattern()
                .captures(&comment[1])
                .and_then(|c| c.get(1))
            else {
                continue;
            };
            block = Self::parse_payload(payload.as_str(), phase)?;
        }

        Ok(block)
    }

    fn parse_payload(payload: &str, phase: Phase) -> Result<Self> {
        let mut fields = BTreeMap::new();

        for line in payload.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(Error::Protocol {
                    phase,
                    reason: format!("malformed status line '{line}'"),
                    observed: StatusBlock { fields },
                });
            };
            fields.insert(key.trim().to_string(), value.trim().to_string());
        }

        Ok(StatusBlock { fields })
    }

    /// Value of a field, if present
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Whether a field is present, whatever its value
    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// The `Status` field
    pub fn status(&self) -> Option<&str> {
        self.get(FIELD_STATUS)
    }

    /// Whether the hits indicator is present
    pub fn has_hits_indicator(&self) -> bool {
        self.contains(FIELD_THERE_ARE_HITS)
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True if the response carried no envelope or an empty one
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate fields in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StatusBlock {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl fmt::Display for StatusBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.fields.is_empty() {
            return f.write_str("no status fields");
        }
        for (i, (key, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key} = {value}")?;
        }
        Ok(())
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    const SUBMIT_BODY: &str = r#"<html><head><title>NCBI Blast</title></head>
<body>
<!--QBlastInfoBegin
    RID = ABC123
    RTOE = 15
QBlastInfoEnd
-->
<p>Your request has been submitted.</p>
</body></html>"#;

    #[test]
    fn test_parse_trims_keys_and_values() {
        let block = StatusBlock::parse(SUBMIT_BODY, Phase::Submit).unwrap();

        assert_eq!(block.len(), 2);
        assert_eq!(block.get("RID"), Some("ABC123"));
        assert_eq!(block.get("RTOE"), Some("15"));
    }

    #[test]
    fn test_no_envelope_is_empty() {
        let body = "<html><!-- just a comment --><body>nothing here</body></html>";
        let block = StatusBlock::parse(body, Phase::Poll).unwrap();
        assert!(block.is_empty());
    }

    #[test]
    fn test_last_envelope_wins() {
        let body = "<!--QBlastInfoBegin\n Status = WAITING\n Extra = 1\nQBlastInfoEnd-->\n\
                    <p>between</p>\n\
                    <!--QBlastInfoBegin\n Status = READY\nQBlastInfoEnd-->";
        let block = StatusBlock::parse(body, Phase::Poll).unwrap();

        assert_eq!(block.status(), Some("READY"));
        assert!(!block.contains("Extra"), "earlier block must be replaced");
    }

    #[test]
    fn test_line_without_equals_is_rejected() {
        let body = "<!--QBlastInfoBegin\n Status = WAITING\n garbage line\nQBlastInfoEnd-->";
        let err = StatusBlock::parse(body, Phase::Poll).unwrap_err();

        match err {
            Error::Protocol {
                phase, observed, ..
            } => {
                assert_eq!(phase, Phase::Poll);
                assert_eq!(observed.status(), Some("WAITING"));
            }
            other => panic!("expected protocol error, got {other:?}"),
        }
    }

    #[test]
    fn test_value_may_contain_equals() {
        let body = "<!--QBlastInfoBegin\n Note = a=b\nQBlastInfoEnd-->";
        let block = StatusBlock::parse(body, Phase::Poll).unwrap();
        assert_eq!(block.get("Note"), Some("a=b"));
    }

    #[test]
    fn test_hits_indicator_presence_only() {
        let body = "<!--QBlastInfoBegin\n ThereAreHits = no\nQBlastInfoEnd-->";
        let block = StatusBlock::parse(body, Phase::Poll).unwrap();
        assert!(block.has_hits_indicator());
        assert_eq!(block.status(), None);
    }

    #[test]
    fn test_envelope_outside_comment_is_ignored() {
        let body = "QBlastInfoBegin\n RID = X\nQBlastInfoEnd";
        assert!(StatusBlock::parse(body, Phase::Submit).unwrap().is_empty());
    }

    #[test]
    fn test_display_lists_fields() {
        let block: StatusBlock = [("RID", "X"), ("RTOE", "3")].into_iter().collect();
        assert_eq!(block.to_string(), "RID = X, RTOE = 3");
        assert_eq!(StatusBlock::default().to_string(), "no status fields");
    }
}
