pub mod audit;
pub mod auth;
pub mod classify;
pub mod config;
pub mod drive;
pub mod error;
pub mod inventory;
pub mod rate_limit;
pub mod reconcile;
pub mod report;
pub mod sheets;
pub mod snapshot;

// Re-export commonly used types
pub use audit::{run, AuditOptions, AuditOutcome};
pub use classify::{anyone_with_link_role, classify, LinkRole, PermissionEntry};
pub use config::{AuditConfig, ConfigArgs, ConfigError, CredentialSource};
pub use error::{AuditError, ErrorCategory};
pub use inventory::{build_inventory, DriveFile, DriveSource, FileRecord, Inventory, Owner};
pub use rate_limit::{CallBudget, Exhaustion, RateLimitPolicy};
pub use reconcile::{reconcile, ReconciledRow};
pub use report::{render, CellValue, CheckboxValidation, HighlightKind, HighlightRule, Report, SheetStore};
pub use snapshot::{parse_approval, read_snapshot, ApprovalRecord, ApprovalSnapshot, SheetTable};
