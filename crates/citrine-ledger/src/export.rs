//! History export rendering.
//!
//! Delimited-text (CSV) and structured-text (JSON) renderings of an
//! enriched transaction list.

use crate::enrich::EnrichedTransaction;
use crate::error::LedgerError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv",
            ExportFormat::Json => "application/json",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            other => Err(LedgerError::InvalidInput(format!(
                "unknown export format: {other}"
            ))),
        }
    }
}

/// Rendered export: the payload plus the metadata a caller needs to hand
/// the file to the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportResult {
    pub data: String,
    pub filename: String,
    pub mime_type: String,
}

const CSV_HEADER: &str =
    "id,direction,status,amount,fee,address,message,timestamp,confirmations,tags";

fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn render_csv(records: &[EnrichedTransaction]) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for tx in records {
        let rec = &tx.record;
        let row = [
            csv_escape(rec.id.as_str()),
            rec.direction.label().to_string(),
            tx.status_label.to_string(),
            tx.display_amount.clone(),
            rec.fee.display_coins(),
            csv_escape(&rec.address),
            csv_escape(rec.message.as_deref().unwrap_or("")),
            rec.timestamp.to_string(),
            rec.confirmations.to_string(),
            csv_escape(&tx.tags.join(";")),
        ];
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}

/// Render an export in the requested format. `exported_at_ms` feeds the
/// filename so repeated exports do not collide.
pub fn render(
    records: &[EnrichedTransaction],
    format: ExportFormat,
    exported_at_ms: u64,
) -> Result<ExportResult, LedgerError> {
    let data = match format {
        ExportFormat::Csv => render_csv(records),
        ExportFormat::Json => serde_json::to_string_pretty(records)
            .map_err(|e| LedgerError::Export(e.to_string()))?,
    };
    Ok(ExportResult {
        data,
        filename: format!("transactions-{exported_at_ms}.{}", format.extension()),
        mime_type: format.mime_type().to_string(),
    })
}
