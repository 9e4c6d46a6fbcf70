//! Deterministic artifact naming
//!
//! Local files live under `<REPORTS_ROOT>/<MALL>/...`. Ayala's SMB share
//! mirrors the local tree; Robinson's SFTP root is flat and drops the
//! local `.txt` suffix.

use chrono::{Datelike, NaiveDate};
use shared::models::{ArtifactKind, StoreSettings};

/// Where an artifact lives locally and remotely
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPath {
    pub kind: ArtifactKind,
    /// Segments relative to the local reports root, file name last
    pub local: Vec<String>,
    /// Segments relative to the remote root, file name last
    pub remote: Vec<String>,
}

impl ArtifactPath {
    /// `/`-joined local path; the value stored in delivery records
    pub fn relative(&self) -> String {
        self.local.join("/")
    }

    pub fn file_name(&self) -> &str {
        self.local.last().map(String::as_str).unwrap_or_default()
    }

    /// Remote directory segments (without the file name)
    pub fn remote_dir(&self) -> &[String] {
        &self.remote[..self.remote.len().saturating_sub(1)]
    }

    /// Rebuild from a delivery record's stored relative path
    pub fn from_relative(kind: ArtifactKind, relative: &str) -> Self {
        let local: Vec<String> = relative.split('/').map(str::to_string).collect();
        let remote = match kind {
            ArtifactKind::RobinsonBatch => {
                let name = local.last().map(String::as_str).unwrap_or_default();
                vec![name.strip_suffix(".txt").unwrap_or(name).to_string()]
            }
            _ => local.clone(),
        };
        Self {
            kind,
            local,
            remote,
        }
    }
}

fn ayala_existing(settings: &StoreSettings, date: NaiveDate, kind: ArtifactKind, suffix: &str) -> ArtifactPath {
    let local = vec![
        "AYALA".to_string(),
        date.year().to_string(),
        "existing".to_string(),
        format!("EOD{}", settings.ayala_terminal()),
        format!("{}{}{}", settings.contract_number, date.format("%m%d"), suffix),
    ];
    ArtifactPath {
        kind,
        remote: local.clone(),
        local,
    }
}

/// `AYALA/<year>/existing/EOD<terminal>/<contract><MM><DD>Z.txt`
pub fn ayala_zread(settings: &StoreSettings, date: NaiveDate) -> ArtifactPath {
    ayala_existing(settings, date, ArtifactKind::AyalaZRead, "Z.txt")
}

/// `AYALA/<year>/existing/EOD<terminal>/<contract><MM><DD>H.txt`
pub fn ayala_hourly(settings: &StoreSettings, date: NaiveDate) -> ArtifactPath {
    ayala_existing(settings, date, ArtifactKind::AyalaHourly, "H.txt")
}

/// `AYALA/<year>/existing/EOD<terminal>/<contract><MM><DD>.txt`
pub fn ayala_daily(settings: &StoreSettings, date: NaiveDate) -> ArtifactPath {
    ayala_existing(settings, date, ArtifactKind::AyalaDaily, ".txt")
}

/// `AYALA/<year>/new requirements/EOD<companyCode><contract><MMDDYY>.csv`
pub fn ayala_sheet(settings: &StoreSettings, date: NaiveDate) -> ArtifactPath {
    let local = vec![
        "AYALA".to_string(),
        date.year().to_string(),
        "new requirements".to_string(),
        format!(
            "EOD{}{}{}.csv",
            settings.company_code,
            settings.contract_number,
            date.format("%m%d%y")
        ),
    ];
    ArtifactPath {
        kind: ArtifactKind::AyalaSheet,
        remote: local.clone(),
        local,
    }
}

/// Remote name `<tenantLast4><MMDD>.<terminal:02><batch>`
pub fn robinson_file_name(settings: &StoreSettings, date: NaiveDate, batch: u32) -> String {
    let code = &settings.robinson_tenant_code;
    let tail: String = code.chars().skip(code.chars().count().saturating_sub(4)).collect();
    format!(
        "{}{}.{}{}",
        tail,
        date.format("%m%d"),
        settings.robinson_terminal(),
        batch
    )
}

/// Local `ROBINSON/<year>/<name>.txt`, remote `<name>`
pub fn robinson_batch(settings: &StoreSettings, date: NaiveDate, batch: u32) -> ArtifactPath {
    let name = robinson_file_name(settings, date, batch);
    ArtifactPath {
        kind: ArtifactKind::RobinsonBatch,
        local: vec![
            "ROBINSON".to_string(),
            date.year().to_string(),
            format!("{name}.txt"),
        ],
        remote: vec![name],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_settings;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    #[test]
    fn test_ayala_paths() {
        let settings = sample_settings();
        assert_eq!(
            ayala_zread(&settings, date()).relative(),
            "AYALA/2024/existing/EOD001/C1230501Z.txt"
        );
        assert_eq!(
            ayala_hourly(&settings, date()).relative(),
            "AYALA/2024/existing/EOD001/C1230501H.txt"
        );
        assert_eq!(
            ayala_daily(&settings, date()).relative(),
            "AYALA/2024/existing/EOD001/C1230501.txt"
        );
        let sheet = ayala_sheet(&settings, date());
        assert_eq!(
            sheet.relative(),
            "AYALA/2024/new requirements/EODCMPC123050124.csv"
        );
        assert_eq!(sheet.remote, sheet.local);
        assert_eq!(sheet.remote_dir().len(), 3);
    }

    #[test]
    fn test_robinson_paths() {
        let settings = sample_settings();
        let path = robinson_batch(&settings, date(), 2);
        assert_eq!(path.remote, vec!["23450501.012".to_string()]);
        assert_eq!(path.relative(), "ROBINSON/2024/23450501.012.txt");
        assert!(path.remote_dir().is_empty());

        let rebuilt = ArtifactPath::from_relative(ArtifactKind::RobinsonBatch, &path.relative());
        assert_eq!(rebuilt, path);
    }
}
