use crate::classify::PermissionEntry;
use crate::error::AuditError;
use crate::inventory::{DriveFile, DriveSource, Owner};
use async_recursion::async_recursion;
use async_trait::async_trait;
use google_drive3::api::{File, Permission, Scope};
use google_drive3::hyper::client::HttpConnector;
use google_drive3::hyper_rustls::HttpsConnector;
use google_drive3::DriveHub;
use serde_json::Value;
use tracing::debug;

pub type Hub = DriveHub<HttpsConnector<HttpConnector>>;

pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Largest `pageSize` files.list accepts.
pub const MAX_PAGE_SIZE: usize = 1000;

const FILE_FIELDS: &str = "files(id,name,mimeType,webViewLink,owners(emailAddress))";
const PERMISSION_FIELDS: &str = "permissions(id,type,role)";

/// Drive v3 backed file source. Audits everything visible to the service account, or one
/// folder tree when `folder_id` is set.
pub struct GoogleDrive {
    hub: Hub,
    folder_id: Option<String>,
}

impl GoogleDrive {
    pub fn new(hub: Hub, folder_id: Option<String>) -> Self {
        Self { hub, folder_id }
    }

    /// First page of a listing, never more.
    async fn list_page(
        &self,
        query: Option<&str>,
        page_size: usize,
    ) -> Result<Vec<DriveFile>, AuditError> {
        let mut call = self
            .hub
            .files()
            .list()
            .page_size(api_page_size(page_size))
            .param("fields", FILE_FIELDS)
            .add_scope(Scope::MetadataReadonly);
        if let Some(query) = query {
            call = call.q(query);
        }

        let files = call
            .doit()
            .await
            .map_err(AuditError::Drive)?
            .1
            .files
            .unwrap_or_default();

        files.into_iter().map(drive_file).collect()
    }

    #[async_recursion]
    async fn collect_folder(
        &self,
        folder_id: &str,
        limit: usize,
        out: &mut Vec<DriveFile>,
    ) -> Result<(), AuditError> {
        let remaining = limit.saturating_sub(out.len());
        if remaining == 0 {
            return Ok(());
        }

        let query = format!("'{}' in parents and trashed = false", folder_id);
        let children = self.list_page(Some(&query), remaining).await?;
        debug!("Folder {} has {} listed children", folder_id, children.len());

        for child in children {
            if out.len() >= limit {
                break;
            }
            let subfolder = (child.mime_type.as_deref() == Some(FOLDER_MIME_TYPE))
                .then(|| child.id.clone());
            out.push(child);

            if let Some(id) = subfolder {
                self.collect_folder(&id, limit, out).await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DriveSource for GoogleDrive {
    async fn list_files(&self, limit: usize) -> Result<Vec<DriveFile>, AuditError> {
        match &self.folder_id {
            Some(folder_id) => {
                let mut files = Vec::new();
                self.collect_folder(folder_id, limit, &mut files).await?;
                Ok(files)
            }
            None => self.list_page(None, limit).await,
        }
    }

    async fn list_permissions(&self, file_id: &str) -> Result<Vec<PermissionEntry>, AuditError> {
        let permissions = self
            .hub
            .permissions()
            .list(file_id)
            .supports_all_drives(true)
            .param("fields", PERMISSION_FIELDS)
            .add_scope(Scope::MetadataReadonly)
            .doit()
            .await
            .map_err(AuditError::Drive)?
            .1
            .permissions
            .unwrap_or_default();

        permissions.iter().map(permission_entry).collect()
    }
}

fn api_page_size(limit: usize) -> i32 {
    limit.clamp(1, MAX_PAGE_SIZE) as i32
}

fn drive_file(file: File) -> Result<DriveFile, AuditError> {
    let id = file.id.ok_or_else(|| AuditError::MissingField {
        field: "id",
        context: format!("Drive file {:?}", file.name),
    })?;
    let owners = file
        .owners
        .unwrap_or_default()
        .into_iter()
        .map(|user| Owner {
            email_address: user.email_address,
        })
        .collect();

    Ok(DriveFile {
        id,
        title: file.name.unwrap_or_default(),
        alternate_link: file.web_view_link.unwrap_or_default(),
        mime_type: file.mime_type,
        owners,
    })
}

fn permission_entry(permission: &Permission) -> Result<PermissionEntry, AuditError> {
    match serde_json::to_value(permission)? {
        Value::Object(map) => Ok(map),
        _ => Ok(PermissionEntry::new()),
    }
}
