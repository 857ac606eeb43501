#![allow(dead_code)]

use async_trait::async_trait;
use drive_audit::{
    AuditError, CellValue, CheckboxValidation, DriveFile, DriveSource, HighlightRule, Owner,
    PermissionEntry, SheetStore, SheetTable,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Mutex;

pub const FOLDER_LINK: &str = "https://drive.google.com/drive/folders/folder-1";
pub const FILE_LINK: &str = "https://drive.google.com/file/d/file-1/view";

pub fn drive_file(id: &str, title: &str, link: &str) -> DriveFile {
    DriveFile {
        id: id.to_string(),
        title: title.to_string(),
        alternate_link: link.to_string(),
        mime_type: None,
        owners: vec![Owner {
            email_address: Some("owner@example.com".to_string()),
        }],
    }
}

pub fn link_share(role: &str) -> Vec<PermissionEntry> {
    vec![
        json!({"id": "0123", "role": "owner", "type": "user"}),
        json!({"id": "anyoneWithLink", "role": role, "type": "anyone"}),
    ]
    .into_iter()
    .filter_map(|v| v.as_object().cloned())
    .collect()
}

/// Drive with fixed files; permission fetches for ids in `failing` error out.
#[derive(Default)]
pub struct FakeDrive {
    pub files: Vec<DriveFile>,
    pub permissions: HashMap<String, Vec<PermissionEntry>>,
    pub failing: Vec<String>,
    pub permission_calls: Mutex<Vec<String>>,
}

impl FakeDrive {
    pub fn new(files: Vec<DriveFile>) -> Self {
        Self {
            files,
            ..Default::default()
        }
    }

    pub fn with_permissions(mut self, id: &str, permissions: Vec<PermissionEntry>) -> Self {
        self.permissions.insert(id.to_string(), permissions);
        self
    }

    pub fn failing_on(mut self, id: &str) -> Self {
        self.failing.push(id.to_string());
        self
    }
}

#[async_trait]
impl DriveSource for FakeDrive {
    async fn list_files(&self, limit: usize) -> Result<Vec<DriveFile>, AuditError> {
        Ok(self.files.iter().take(limit).cloned().collect())
    }

    async fn list_permissions(&self, file_id: &str) -> Result<Vec<PermissionEntry>, AuditError> {
        self.permission_calls
            .lock()
            .unwrap()
            .push(file_id.to_string());
        if self.failing.iter().any(|id| id == file_id) {
            return Err(AuditError::MissingField {
                field: "permissions",
                context: format!("fake permission fetch for {file_id}"),
            });
        }
        Ok(self.permissions.get(file_id).cloned().unwrap_or_default())
    }
}

/// Sheet that records every write.
#[derive(Default)]
pub struct FakeSheet {
    pub existing: SheetTable,
    pub written: Mutex<Option<Vec<Vec<CellValue>>>>,
    pub rules: Mutex<Option<Vec<HighlightRule>>>,
    pub validation: Mutex<Option<CheckboxValidation>>,
}

impl FakeSheet {
    pub fn with_rows(rows: &[&[&str]]) -> Self {
        Self {
            existing: SheetTable::new(
                rows.iter()
                    .map(|r| r.iter().map(|c| c.to_string()).collect())
                    .collect(),
            ),
            ..Default::default()
        }
    }

    pub fn written(&self) -> Option<Vec<Vec<CellValue>>> {
        self.written.lock().unwrap().clone()
    }

    pub fn was_touched(&self) -> bool {
        self.written.lock().unwrap().is_some()
            || self.rules.lock().unwrap().is_some()
            || self.validation.lock().unwrap().is_some()
    }
}

#[async_trait]
impl SheetStore for FakeSheet {
    async fn read_table(&self) -> Result<SheetTable, AuditError> {
        Ok(self.existing.clone())
    }

    async fn overwrite_rows(&self, table: &[Vec<CellValue>]) -> Result<(), AuditError> {
        *self.written.lock().unwrap() = Some(table.to_vec());
        Ok(())
    }

    async fn replace_highlight_rules(&self, rules: &[HighlightRule]) -> Result<(), AuditError> {
        *self.rules.lock().unwrap() = Some(rules.to_vec());
        Ok(())
    }

    async fn set_checkbox_validation(
        &self,
        validation: &CheckboxValidation,
    ) -> Result<(), AuditError> {
        *self.validation.lock().unwrap() = Some(*validation);
        Ok(())
    }
}
