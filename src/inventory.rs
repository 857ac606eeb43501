use crate::classify::{classify, LinkRole, PermissionEntry};
use crate::error::AuditError;
use crate::rate_limit::CallBudget;
use async_trait::async_trait;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Only the first page of the listing is consumed. Raising this requires following
/// page tokens in the `DriveSource` implementation.
pub const MAX_FILES_PER_RUN: usize = 100;

/// Path fragment present in the canonical link of every folder.
pub const FOLDER_LINK_PATTERN: &str = "/folders";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Owner {
    pub email_address: Option<String>,
}

/// A file as handed over by the listing API, before permissions are looked at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriveFile {
    pub id: String,
    pub title: String,
    pub alternate_link: String,
    pub mime_type: Option<String>,
    pub owners: Vec<Owner>,
}

/// Source of file metadata and permission lists.
#[async_trait]
pub trait DriveSource: Send + Sync {
    /// One batch of files, at most `limit` long. No pagination.
    async fn list_files(&self, limit: usize) -> Result<Vec<DriveFile>, AuditError>;

    async fn list_permissions(&self, file_id: &str) -> Result<Vec<PermissionEntry>, AuditError>;
}

/// Current sharing state of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub id: String,
    pub title: String,
    pub link_role: LinkRole,
    pub alternate_link: String,
    pub owner_email: String,
}

impl FileRecord {
    pub fn is_folder(&self) -> bool {
        self.alternate_link.contains(FOLDER_LINK_PATTERN)
    }
}

/// File records in listing order, unique by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    records: Vec<FileRecord>,
}

impl Inventory {
    /// Keeps the first record for each id.
    pub fn from_records(records: impl IntoIterator<Item = FileRecord>) -> Self {
        let mut seen = HashSet::new();
        let mut kept = Vec::new();
        for record in records {
            if seen.insert(record.id.clone()) {
                kept.push(record);
            } else {
                warn!("Dropping duplicate listing of file {}", record.id);
            }
        }
        Self { records: kept }
    }

    pub fn records(&self) -> &[FileRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn owner_email(file: &DriveFile) -> Result<String, AuditError> {
    let owner = file.owners.first().ok_or_else(|| AuditError::MissingOwner {
        file_id: file.id.clone(),
    })?;
    owner
        .email_address
        .clone()
        .ok_or_else(|| AuditError::MissingField {
            field: "emailAddress",
            context: format!("first owner of file {}", file.id),
        })
}

/// Build the current inventory: one listing call, then one throttled permission fetch per
/// file, strictly in sequence. Any failure aborts the whole batch.
pub async fn build_inventory(
    source: &dyn DriveSource,
    budget: &mut CallBudget,
    max_files: usize,
) -> Result<Inventory, AuditError> {
    let files = source.list_files(max_files).await?;
    info!("Received {} files from the Drive listing", files.len());

    let mut records = Vec::with_capacity(files.len().min(max_files));
    for file in files.into_iter().take(max_files) {
        let permissions = budget
            .throttled(source.list_permissions(&file.id))
            .await?;
        let record = FileRecord {
            link_role: classify(&permissions),
            owner_email: owner_email(&file)?,
            id: file.id,
            title: file.title,
            alternate_link: file.alternate_link,
        };
        debug!(?record, "Built file record");
        records.push(record);
    }

    Ok(Inventory::from_records(records))
}
