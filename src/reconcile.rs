use crate::classify::LinkRole;
use crate::inventory::{FileRecord, Inventory, FOLDER_LINK_PATTERN};
use crate::snapshot::ApprovalSnapshot;
use serde::Serialize;

/// A current file with its carried-forward approval flag. Serializes under the sheet's
/// column names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciledRow {
    pub id: String,
    pub title: String,
    #[serde(rename = "anyoneWithLinkRole")]
    pub link_role: LinkRole,
    #[serde(rename = "approvedForOpenAccess")]
    pub approved: bool,
    pub owner_email: String,
    pub alternate_link: String,
}

impl ReconciledRow {
    fn from_record(record: &FileRecord, approved: bool) -> Self {
        Self {
            id: record.id.clone(),
            title: record.title.clone(),
            link_role: record.link_role.clone(),
            approved,
            owner_email: record.owner_email.clone(),
            alternate_link: record.alternate_link.clone(),
        }
    }

    pub fn is_folder(&self) -> bool {
        self.alternate_link.contains(FOLDER_LINK_PATTERN)
    }
}

/// Left join of the current inventory onto the previous approvals.
///
/// Output order follows the inventory. Ids only present in the snapshot are gone from
/// Drive and are dropped.
pub fn reconcile(inventory: &Inventory, snapshot: &ApprovalSnapshot) -> Vec<ReconciledRow> {
    inventory
        .records()
        .iter()
        .map(|record| ReconciledRow::from_record(record, snapshot.is_approved(&record.id)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::ApprovalRecord;

    fn record(id: &str) -> FileRecord {
        FileRecord {
            id: id.to_string(),
            title: format!("title {id}"),
            link_role: LinkRole::Reader,
            alternate_link: format!("https://drive.google.com/file/d/{id}/view"),
            owner_email: "owner@example.com".to_string(),
        }
    }

    fn approvals(pairs: &[(&str, bool)]) -> ApprovalSnapshot {
        ApprovalSnapshot::from_records(pairs.iter().map(|(id, approved)| ApprovalRecord {
            id: id.to_string(),
            approved: *approved,
        }))
    }

    #[test]
    fn test_carries_approval_forward() {
        let inventory = Inventory::from_records(vec![record("1"), record("2")]);
        let rows = reconcile(&inventory, &approvals(&[("1", true)]));

        let flags: Vec<(&str, bool)> = rows.iter().map(|r| (r.id.as_str(), r.approved)).collect();
        assert_eq!(flags, vec![("1", true), ("2", false)]);
        assert_eq!(rows[0].title, "title 1");
        assert_eq!(rows[0].owner_email, "owner@example.com");
    }

    #[test]
    fn test_drops_stale_ids() {
        let inventory = Inventory::from_records(vec![record("1")]);
        let rows = reconcile(&inventory, &approvals(&[("1", true), ("9", true)]));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "1");
    }

    #[test]
    fn test_explicit_false_stays_false() {
        let inventory = Inventory::from_records(vec![record("1")]);
        let rows = reconcile(&inventory, &approvals(&[("1", false)]));
        assert!(!rows[0].approved);
    }

    #[test]
    fn test_serializes_with_sheet_column_names() {
        let inventory = Inventory::from_records(vec![record("1")]);
        let rows = reconcile(&inventory, &approvals(&[("1", true)]));
        let value = serde_json::to_value(&rows[0]).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "id": "1",
                "title": "title 1",
                "anyoneWithLinkRole": "reader",
                "approvedForOpenAccess": true,
                "ownerEmail": "owner@example.com",
                "alternateLink": "https://drive.google.com/file/d/1/view",
            })
        );
    }

    #[test]
    fn test_is_idempotent() {
        let inventory = Inventory::from_records(vec![record("1"), record("2"), record("3")]);
        let snapshot = approvals(&[("2", true), ("4", true)]);
        let inventory_before = inventory.clone();
        let snapshot_before = snapshot.clone();

        let first = reconcile(&inventory, &snapshot);
        let second = reconcile(&inventory, &snapshot);

        assert_eq!(first, second);
        assert_eq!(inventory, inventory_before);
        assert_eq!(snapshot, snapshot_before);
    }
}
