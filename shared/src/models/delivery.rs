//! Delivery log models (远程投递记录)

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Mall that receives the accreditation files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mall {
    /// SMB share
    Ayala,
    /// SFTP server
    Robinson,
}

impl Mall {
    /// Top-level directory under the local report root
    pub fn dir_name(&self) -> &'static str {
        match self {
            Mall::Ayala => "AYALA",
            Mall::Robinson => "ROBINSON",
        }
    }
}

impl std::fmt::Display for Mall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Kind of generated artifact; decides naming and write discipline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Consolidated Z-read text
    AyalaZRead,
    /// Hourly sales CSV
    AyalaHourly,
    /// 21-field daily CSV
    AyalaDaily,
    /// Wide "new requirements" sheet shared by all terminals
    AyalaSheet,
    /// 30-field Robinson batch file
    RobinsonBatch,
}

impl ArtifactKind {
    pub fn mall(&self) -> Mall {
        match self {
            ArtifactKind::RobinsonBatch => Mall::Robinson,
            _ => Mall::Ayala,
        }
    }
}

/// One remote delivery attempt
///
/// Append-only: every attempt creates a new record; only a successful drain
/// cycle flips `sent` to true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub id: i64,
    /// Artifact path relative to the mall root, `/`-separated
    pub file_name: String,
    pub kind: ArtifactKind,
    pub sent: bool,
    pub transaction_date: NaiveDate,
    pub store_code: String,
    pub terminal: u16,
    /// Unix millis of the attempt
    pub attempted_at: i64,
    /// Failure reason of the attempt (None when sent)
    #[serde(default)]
    pub error: Option<String>,
}

impl DeliveryRecord {
    pub fn mall(&self) -> Mall {
        self.kind.mall()
    }
}

/// Report emitted after each drain cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrainReport {
    /// Queue was empty when the cycle started
    pub empty: bool,
    /// At least one delivery was attempted in this cycle
    pub resent: bool,
    /// Every attempted delivery succeeded
    pub full_sent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DrainReport {
    pub fn empty() -> Self {
        Self {
            empty: true,
            ..Default::default()
        }
    }

    /// The cycle that ends the worker
    pub fn is_terminal(&self) -> bool {
        self.empty || self.full_sent
    }
}

/// Resend coordinator state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DrainState {
    Idle,
    Draining,
    Empty,
    PartialFailure,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_report_wire_format() {
        let report = DrainReport {
            resent: true,
            full_sent: true,
            ..Default::default()
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["fullSent"], true);
        assert_eq!(json["resent"], true);
        assert_eq!(json["empty"], false);
        assert!(json.get("error").is_none());
        assert!(report.is_terminal());
    }

    #[test]
    fn test_artifact_kind_mall() {
        assert_eq!(ArtifactKind::AyalaSheet.mall(), Mall::Ayala);
        assert_eq!(ArtifactKind::RobinsonBatch.mall(), Mall::Robinson);
        assert_eq!(Mall::Robinson.to_string(), "ROBINSON");
    }
}
