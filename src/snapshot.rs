use crate::error::AuditError;
use std::collections::HashMap;
use tracing::{debug, warn};

pub const ID_COLUMN: &str = "id";
pub const APPROVED_COLUMN: &str = "approvedForOpenAccess";

/// Raw cell text of a sheet, first row being the header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetTable {
    pub rows: Vec<Vec<String>>,
}

impl SheetTable {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn column(&self, name: &'static str) -> Result<usize, AuditError> {
        self.rows
            .first()
            .and_then(|header| header.iter().position(|h| h == name))
            .ok_or(AuditError::MissingColumn { column: name })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalRecord {
    pub id: String,
    pub approved: bool,
}

/// Approval flags carried over from the previous run, keyed by file id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApprovalSnapshot {
    approvals: HashMap<String, bool>,
}

impl ApprovalSnapshot {
    pub fn from_records(records: impl IntoIterator<Item = ApprovalRecord>) -> Self {
        let mut approvals: HashMap<String, bool> = HashMap::new();
        for record in records {
            let flag = approvals.entry(record.id).or_insert(false);
            *flag |= record.approved;
        }
        Self { approvals }
    }

    pub fn get(&self, id: &str) -> Option<bool> {
        self.approvals.get(id).copied()
    }

    /// Absent ids are not approved.
    pub fn is_approved(&self, id: &str) -> bool {
        self.get(id).unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.approvals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.approvals.is_empty()
    }
}

/// Only the literal `"TRUE"` approves. Everything else, including `"true"`, is a denial.
pub fn parse_approval(value: &str) -> bool {
    match value {
        "TRUE" => true,
        "FALSE" => false,
        _ => false,
    }
}

/// Parse the previously exported inventory into per-file approval flags.
///
/// A sheet with no rows at all is the first run and yields an empty snapshot. A header
/// row without both `id` and `approvedForOpenAccess` is malformed.
pub fn read_snapshot(table: &SheetTable) -> Result<ApprovalSnapshot, AuditError> {
    if table.is_empty() {
        debug!("Snapshot sheet is empty, starting from scratch");
        return Ok(ApprovalSnapshot::default());
    }

    let id_col = table.column(ID_COLUMN)?;
    let approved_col = table.column(APPROVED_COLUMN)?;

    let records: Vec<ApprovalRecord> = table
        .rows
        .iter()
        .skip(1)
        .filter_map(|row| {
            let id = row.get(id_col).map(String::as_str).unwrap_or_default();
            if id.is_empty() {
                return None;
            }
            let approved = row
                .get(approved_col)
                .map(|v| parse_approval(v))
                .unwrap_or(false);
            Some(ApprovalRecord {
                id: id.to_string(),
                approved,
            })
        })
        .collect();

    let snapshot = ApprovalSnapshot::from_records(records.iter().cloned());
    if snapshot.len() < records.len() {
        warn!(
            "Snapshot has {} duplicate id rows",
            records.len() - snapshot.len()
        );
    }
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[&[&str]]) -> SheetTable {
        SheetTable::new(
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn test_parse_approval() {
        assert!(parse_approval("TRUE"));
        assert!(!parse_approval("FALSE"));
        assert!(!parse_approval(""));
        assert!(!parse_approval("maybe"));
        assert!(!parse_approval("true"));
        assert!(!parse_approval("1"));
    }

    #[test]
    fn test_read_snapshot() {
        let t = table(&[
            &["title", "anyoneWithLinkRole", "approvedForOpenAccess", "id"],
            &["a", "reader", "TRUE", "1"],
            &["b", "", "FALSE", "2"],
            &["c", "writer", "maybe", "3"],
            &["d", "writer", "", "4"],
            &["e", "writer"],
        ]);
        let snapshot = read_snapshot(&t).unwrap();
        assert_eq!(snapshot.get("1"), Some(true));
        assert_eq!(snapshot.get("2"), Some(false));
        assert_eq!(snapshot.get("3"), Some(false));
        assert_eq!(snapshot.get("4"), Some(false));
        // Row "e" has no id cell at all
        assert_eq!(snapshot.len(), 4);
        assert!(!snapshot.is_approved("missing"));
    }

    #[test]
    fn test_short_row_defaults_to_false() {
        let t = table(&[&["id", "title", "approvedForOpenAccess"], &["7", "x"]]);
        let snapshot = read_snapshot(&t).unwrap();
        assert_eq!(snapshot.get("7"), Some(false));
    }

    #[test]
    fn test_empty_sheet_is_empty_snapshot() {
        let snapshot = read_snapshot(&SheetTable::default()).unwrap();
        assert!(snapshot.is_empty());
    }

    #[test]
    fn test_missing_column_is_error() {
        let t = table(&[&["id", "title"], &["1", "a"]]);
        let err = read_snapshot(&t).unwrap_err();
        assert!(matches!(
            err,
            AuditError::MissingColumn {
                column: "approvedForOpenAccess"
            }
        ));

        let t = table(&[&["approvedForOpenAccess"]]);
        assert!(matches!(
            read_snapshot(&t),
            Err(AuditError::MissingColumn { column: "id" })
        ));
    }

    #[test]
    fn test_duplicate_ids_any_true_wins() {
        let t = table(&[
            &["id", "approvedForOpenAccess"],
            &["1", "FALSE"],
            &["1", "TRUE"],
            &["1", "FALSE"],
        ]);
        let snapshot = read_snapshot(&t).unwrap();
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.is_approved("1"));
    }
}
