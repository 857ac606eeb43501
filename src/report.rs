use crate::error::AuditError;
use crate::inventory::FOLDER_LINK_PATTERN;
use crate::reconcile::ReconciledRow;
use crate::snapshot::{SheetTable, APPROVED_COLUMN, ID_COLUMN};
use async_trait::async_trait;
use serde_json::Value;

/// Output columns, in sheet order.
pub const COLUMNS: [&str; 6] = [
    "title",
    "anyoneWithLinkRole",
    APPROVED_COLUMN,
    "ownerEmail",
    "alternateLink",
    ID_COLUMN,
];

const LINK_ROLE_COLUMN_INDEX: usize = 1;
const APPROVED_COLUMN_INDEX: usize = 2;
const ALTERNATE_LINK_COLUMN_INDEX: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Bool(bool),
}

impl CellValue {
    pub fn to_json(&self) -> Value {
        match self {
            CellValue::Text(text) => Value::String(text.clone()),
            CellValue::Bool(flag) => Value::Bool(*flag),
        }
    }
}

impl From<&str> for CellValue {
    fn from(text: &str) -> Self {
        CellValue::Text(text.to_string())
    }
}

/// Background color, channels in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
}

pub const PURPLE: Rgb = Rgb {
    red: 2.0 / 3.0,
    green: 0.0,
    blue: 1.0,
};

pub const RED: Rgb = Rgb {
    red: 1.0,
    green: 0.0,
    blue: 0.0,
};

/// Zero-based, end-exclusive cell range on the first sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridSpan {
    pub start_row: usize,
    pub end_row: usize,
    pub start_column: usize,
    pub end_column: usize,
}

impl GridSpan {
    pub fn is_empty(&self) -> bool {
        self.start_row >= self.end_row || self.start_column >= self.end_column
    }

    /// A1 notation, e.g. `A2:F3`.
    pub fn to_a1(&self) -> String {
        format!(
            "{}{}:{}{}",
            column_letter(self.start_column),
            self.start_row + 1,
            column_letter(self.end_column.saturating_sub(1)),
            self.end_row
        )
    }
}

fn column_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

fn cell_ref(column: usize) -> String {
    format!("${}2", column_letter(column))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightKind {
    /// Folder shared by link, not approved.
    SharedFolder,
    /// Anything shared by link, not approved.
    SharedFile,
}

/// A conditional-format rule, described rather than applied.
#[derive(Debug, Clone, PartialEq)]
pub struct HighlightRule {
    pub kind: HighlightKind,
    pub range: GridSpan,
    pub formula: String,
    pub color: Rgb,
}

impl HighlightRule {
    fn new(kind: HighlightKind, range: GridSpan) -> Self {
        let shared_unapproved = format!(
            "NOT(LEN({})=0),NOT({})",
            cell_ref(LINK_ROLE_COLUMN_INDEX),
            cell_ref(APPROVED_COLUMN_INDEX)
        );
        let (formula, color) = match kind {
            HighlightKind::SharedFolder => (
                format!(
                    "=AND(REGEXMATCH({}, \"{}\"), {})",
                    cell_ref(ALTERNATE_LINK_COLUMN_INDEX),
                    FOLDER_LINK_PATTERN,
                    shared_unapproved
                ),
                PURPLE,
            ),
            HighlightKind::SharedFile => (format!("=AND({})", shared_unapproved), RED),
        };
        Self {
            kind,
            range,
            formula,
            color,
        }
    }

    /// Evaluates the same condition as `formula` against a row.
    pub fn applies_to(&self, row: &ReconciledRow) -> bool {
        let shared_unapproved = row.link_role.is_shared() && !row.approved;
        match self.kind {
            HighlightKind::SharedFolder => shared_unapproved && row.is_folder(),
            HighlightKind::SharedFile => shared_unapproved,
        }
    }
}

/// Turns the approval column into checkboxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckboxValidation {
    pub range: GridSpan,
}

/// Everything a run writes to the sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub rows: Vec<Vec<CellValue>>,
    /// Folder rule first so it paints over the general one.
    pub highlight_rules: Vec<HighlightRule>,
    pub validation: Option<CheckboxValidation>,
}

impl Report {
    pub fn header() -> Vec<CellValue> {
        COLUMNS.iter().map(|c| CellValue::from(*c)).collect()
    }

    /// Header row followed by data rows.
    pub fn table(&self) -> Vec<Vec<CellValue>> {
        std::iter::once(Self::header())
            .chain(self.rows.iter().cloned())
            .collect()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

fn project(row: &ReconciledRow) -> Vec<CellValue> {
    vec![
        CellValue::Text(row.title.clone()),
        CellValue::Text(row.link_role.to_string()),
        CellValue::Bool(row.approved),
        CellValue::Text(row.owner_email.clone()),
        CellValue::Text(row.alternate_link.clone()),
        CellValue::Text(row.id.clone()),
    ]
}

pub fn render(rows: &[ReconciledRow]) -> Report {
    let data_rows = GridSpan {
        start_row: 1,
        end_row: rows.len() + 1,
        start_column: 0,
        end_column: COLUMNS.len(),
    };

    let (highlight_rules, validation) = if data_rows.is_empty() {
        (Vec::new(), None)
    } else {
        let rules = vec![
            HighlightRule::new(HighlightKind::SharedFolder, data_rows),
            HighlightRule::new(HighlightKind::SharedFile, data_rows),
        ];
        let validation = CheckboxValidation {
            range: GridSpan {
                start_column: APPROVED_COLUMN_INDEX,
                end_column: APPROVED_COLUMN_INDEX + 1,
                ..data_rows
            },
        };
        (rules, Some(validation))
    };

    Report {
        rows: rows.iter().map(project).collect(),
        highlight_rules,
        validation,
    }
}

/// The review spreadsheet's first sheet.
#[async_trait]
pub trait SheetStore: Send + Sync {
    async fn read_table(&self) -> Result<SheetTable, AuditError>;

    /// Replace every cell value with `table`.
    async fn overwrite_rows(&self, table: &[Vec<CellValue>]) -> Result<(), AuditError>;

    /// Drop all conditional formats and install `rules` in order.
    async fn replace_highlight_rules(&self, rules: &[HighlightRule]) -> Result<(), AuditError>;

    async fn set_checkbox_validation(
        &self,
        validation: &CheckboxValidation,
    ) -> Result<(), AuditError>;
}
