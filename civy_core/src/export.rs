//! CSV export of ledger balances.

use crate::{Account, Ledger, Result};
use std::path::Path;

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow<'a> {
    user_id: &'a str,
    gold: u64,
    wood: u64,
    stone: u64,
    iron: u64,
    last_daily: Option<String>,
}

impl<'a> CsvRow<'a> {
    fn new(user_id: &'a str, account: &Account) -> Self {
        CsvRow {
            user_id,
            gold: account.gold,
            wood: account.wood,
            stone: account.stone,
            iron: account.iron,
            last_daily: account.last_daily.map(|t| t.to_rfc3339()),
        }
    }
}

/// Write every account to `csv_path`, replacing any previous export
///
/// Returns the number of rows written.
pub fn export_csv(ledger: &Ledger, csv_path: &Path) -> Result<usize> {
    if let Some(parent) = csv_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut writer = csv::Writer::from_path(csv_path)?;
    for (user_id, account) in ledger.iter() {
        writer.serialize(CsvRow::new(user_id, account))?;
    }
    writer.flush()?;

    tracing::info!("Exported {} accounts to {:?}", ledger.len(), csv_path);
    Ok(ledger.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_export_writes_header_and_rows() {
        let temp_dir = tempfile::tempdir().unwrap();
        let csv_path = temp_dir.path().join("balances.csv");

        let mut ledger = Ledger::new();
        let (account, _) = account::ensure(&mut ledger, "42", 100);
        account.wood = 110;
        account.last_daily = Some(Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap());
        account::ensure(&mut ledger, "7", 0);

        let count = export_csv(&ledger, &csv_path).unwrap();
        assert_eq!(count, 2);

        let content = std::fs::read_to_string(&csv_path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "user_id,gold,wood,stone,iron,last_daily");
        assert_eq!(lines[1], "42,100,110,0,0,2025-01-02T03:04:05+00:00");
        assert_eq!(lines[2], "7,0,0,0,0,");
    }

    #[test]
    fn test_export_empty_ledger() {
        let temp_dir = tempfile::tempdir().unwrap();
        let csv_path = temp_dir.path().join("out/balances.csv");

        assert_eq!(export_csv(&Ledger::new(), &csv_path).unwrap(), 0);
        assert!(csv_path.exists());
    }
}
