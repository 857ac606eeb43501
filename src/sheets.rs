use crate::error::AuditError;
use crate::report::{CellValue, CheckboxValidation, GridSpan, HighlightRule, Rgb, SheetStore};
use crate::snapshot::SheetTable;
use async_trait::async_trait;
use google_sheets4::api::{
    AddConditionalFormatRuleRequest, BatchUpdateSpreadsheetRequest, BooleanCondition,
    BooleanRule, CellFormat, ClearValuesRequest, Color, ConditionValue, ConditionalFormatRule,
    DataValidationRule, DeleteConditionalFormatRuleRequest, GridRange, Request, Scope,
    SetDataValidationRequest, ValueRange,
};
use google_sheets4::hyper::client::HttpConnector;
use google_sheets4::hyper_rustls::HttpsConnector;
use google_sheets4::Sheets;
use serde_json::Value;
use tracing::{debug, info};

pub type Hub = Sheets<HttpsConnector<HttpConnector>>;

const SHEET_FIELDS: &str = "sheets(properties(sheetId,title),conditionalFormats)";

/// Right edge of the area cleared below the written table.
const LAST_COLUMN: &str = "ZZ";

/// First sheet of the spreadsheet, as seen right now.
#[derive(Debug, Clone, PartialEq, Eq)]
struct FirstSheet {
    id: i32,
    title: String,
    rule_count: usize,
}

impl FirstSheet {
    fn whole_range(&self) -> String {
        format!("'{}'", self.title.replace('\'', "''"))
    }

    fn anchor(&self) -> String {
        format!("{}!A1", self.whole_range())
    }

    /// Everything under the first `written` rows.
    fn rows_below(&self, written: usize) -> String {
        format!("{}!A{}:{}", self.whole_range(), written + 1, LAST_COLUMN)
    }
}

/// Sheets v4 backed store for the review spreadsheet.
pub struct GoogleSheet {
    hub: Hub,
    spreadsheet_id: String,
}

impl GoogleSheet {
    pub fn new(hub: Hub, spreadsheet_id: String) -> Self {
        Self {
            hub,
            spreadsheet_id,
        }
    }

    async fn first_sheet(&self) -> Result<FirstSheet, AuditError> {
        let spreadsheet = self
            .hub
            .spreadsheets()
            .get(&self.spreadsheet_id)
            .param("fields", SHEET_FIELDS)
            .add_scope(Scope::Spreadsheet)
            .doit()
            .await
            .map_err(AuditError::Sheets)?
            .1;

        let sheet = spreadsheet
            .sheets
            .unwrap_or_default()
            .into_iter()
            .next()
            .ok_or(AuditError::NoSheet)?;
        let properties = sheet.properties.unwrap_or_default();

        Ok(FirstSheet {
            id: properties.sheet_id.unwrap_or_default(),
            title: properties.title.unwrap_or_default(),
            rule_count: sheet.conditional_formats.map(|r| r.len()).unwrap_or_default(),
        })
    }

    async fn batch_update(&self, requests: Vec<Request>) -> Result<(), AuditError> {
        if requests.is_empty() {
            return Ok(());
        }
        let request = BatchUpdateSpreadsheetRequest {
            requests: Some(requests),
            ..Default::default()
        };
        self.hub
            .spreadsheets()
            .batch_update(request, &self.spreadsheet_id)
            .add_scope(Scope::Spreadsheet)
            .doit()
            .await
            .map_err(AuditError::Sheets)?;
        Ok(())
    }
}

#[async_trait]
impl SheetStore for GoogleSheet {
    async fn read_table(&self) -> Result<SheetTable, AuditError> {
        let sheet = self.first_sheet().await?;
        let values = self
            .hub
            .spreadsheets()
            .values_get(&self.spreadsheet_id, &sheet.whole_range())
            .value_render_option("UNFORMATTED_VALUE")
            .add_scope(Scope::Spreadsheet)
            .doit()
            .await
            .map_err(AuditError::Sheets)?
            .1
            .values
            .unwrap_or_default();

        Ok(table_from_values(&values))
    }

    /// Writes the new table over the old one, then clears whatever is left below it. A
    /// failure at any point leaves the previous approvals readable.
    async fn overwrite_rows(&self, table: &[Vec<CellValue>]) -> Result<(), AuditError> {
        let sheet = self.first_sheet().await?;

        let values = table
            .iter()
            .map(|row| row.iter().map(CellValue::to_json).collect())
            .collect();
        let body = ValueRange {
            major_dimension: Some("ROWS".to_string()),
            range: Some(sheet.anchor()),
            values: Some(values),
            ..Default::default()
        };
        self.hub
            .spreadsheets()
            .values_update(body, &self.spreadsheet_id, &sheet.anchor())
            .value_input_option("RAW")
            .add_scope(Scope::Spreadsheet)
            .doit()
            .await
            .map_err(AuditError::Sheets)?;

        self.hub
            .spreadsheets()
            .values_clear(
                ClearValuesRequest::default(),
                &self.spreadsheet_id,
                &sheet.rows_below(table.len()),
            )
            .add_scope(Scope::Spreadsheet)
            .doit()
            .await
            .map_err(AuditError::Sheets)?;

        info!("Wrote {} rows to sheet {}", table.len(), sheet.title);
        Ok(())
    }

    async fn replace_highlight_rules(&self, rules: &[HighlightRule]) -> Result<(), AuditError> {
        let sheet = self.first_sheet().await?;
        debug!(
            "Replacing {} conditional formats with {}",
            sheet.rule_count,
            rules.len()
        );
        self.batch_update(highlight_requests(&sheet, rules)).await
    }

    async fn set_checkbox_validation(
        &self,
        validation: &CheckboxValidation,
    ) -> Result<(), AuditError> {
        let sheet = self.first_sheet().await?;
        let request = Request {
            set_data_validation: Some(SetDataValidationRequest {
                range: Some(grid_range(sheet.id, &validation.range)),
                rule: Some(DataValidationRule {
                    condition: Some(BooleanCondition {
                        type_: Some("BOOLEAN".to_string()),
                        values: None,
                    }),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        };
        self.batch_update(vec![request]).await
    }
}

fn table_from_values(values: &[Vec<Value>]) -> SheetTable {
    SheetTable::new(
        values
            .iter()
            .map(|row| row.iter().map(cell_text).collect())
            .collect(),
    )
}

/// Unformatted cell as text. Checkboxes arrive as JSON booleans and become `TRUE`/`FALSE`
/// whatever the spreadsheet locale.
fn cell_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Bool(true) => "TRUE".to_string(),
        Value::Bool(false) => "FALSE".to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn grid_range(sheet_id: i32, span: &GridSpan) -> GridRange {
    GridRange {
        sheet_id: Some(sheet_id),
        start_row_index: Some(span.start_row as i32),
        end_row_index: Some(span.end_row as i32),
        start_column_index: Some(span.start_column as i32),
        end_column_index: Some(span.end_column as i32),
    }
}

fn color(rgb: Rgb) -> Color {
    Color {
        red: Some(rgb.red),
        green: Some(rgb.green),
        blue: Some(rgb.blue),
        alpha: None,
    }
}

fn format_rule(sheet_id: i32, rule: &HighlightRule) -> ConditionalFormatRule {
    ConditionalFormatRule {
        ranges: Some(vec![grid_range(sheet_id, &rule.range)]),
        boolean_rule: Some(BooleanRule {
            condition: Some(BooleanCondition {
                type_: Some("CUSTOM_FORMULA".to_string()),
                values: Some(vec![ConditionValue {
                    user_entered_value: Some(rule.formula.clone()),
                    ..Default::default()
                }]),
            }),
            format: Some(CellFormat {
                background_color: Some(color(rule.color)),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Deletes every existing rule (always at index 0 as the list shrinks), then inserts the new
/// rules so their order is preserved.
fn highlight_requests(sheet: &FirstSheet, rules: &[HighlightRule]) -> Vec<Request> {
    let deletes = (0..sheet.rule_count).map(|_| Request {
        delete_conditional_format_rule: Some(DeleteConditionalFormatRuleRequest {
            index: Some(0),
            sheet_id: Some(sheet.id),
        }),
        ..Default::default()
    });
    let adds = rules.iter().enumerate().map(|(index, rule)| Request {
        add_conditional_format_rule: Some(AddConditionalFormatRuleRequest {
            index: Some(index as i32),
            rule: Some(format_rule(sheet.id, rule)),
        }),
        ..Default::default()
    });
    deletes.chain(adds).collect()
}
