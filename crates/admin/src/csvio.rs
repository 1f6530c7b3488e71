//! CSV export and import for the bulk editor.
//!
//! Plain comma-separated text with a header row; every field is quoted
//! on export, with embedded quotes doubled. Import is forgiving: a
//! malformed row is counted and skipped, never allowed to abort the
//! whole file.

use rust_decimal::Decimal;

use haberdash_core::ProductId;

use crate::platform::types::{ProductPatch, ProductRow};

/// Column order shared by export and import.
const HEADER: &str = "id,name,description,price,category,image_url,status";
const COLUMN_COUNT: usize = 7;

/// Render product rows as CSV, header first.
#[must_use]
pub fn export_products(rows: &[ProductRow]) -> String {
    let mut out = String::from(HEADER);
    out.push('\n');

    for row in rows {
        let status = serde_plain_status(row);
        let fields = [
            row.id.to_string(),
            row.name.clone(),
            row.description.clone().unwrap_or_default(),
            row.price.to_string(),
            row.category.clone().unwrap_or_default(),
            row.image_url.clone().unwrap_or_default(),
            status,
        ];

        let line: Vec<String> = fields.iter().map(|f| quote(f)).collect();
        out.push_str(&line.join(","));
        out.push('\n');
    }

    out
}

fn serde_plain_status(row: &ProductRow) -> String {
    // ProductStatus serializes as a quoted snake_case token.
    serde_json::to_string(&row.status)
        .map(|s| s.trim_matches('"').to_string())
        .unwrap_or_default()
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

/// One successfully parsed import row: a record id plus the fields the
/// file provides for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedRow {
    pub id: ProductId,
    pub patch: ProductPatch,
}

/// Result of parsing an import file.
#[derive(Debug, Clone, Default)]
pub struct ImportOutcome {
    pub rows: Vec<ImportedRow>,
    /// Rows dropped for bad quoting, wrong column count, or unparseable
    /// id/price values.
    pub skipped: usize,
}

/// Parse an import file in the export format.
///
/// The header row is skipped. Empty name/price/category/image fields
/// leave those fields unstaged; a row whose fields are all empty stages
/// nothing and counts as skipped.
#[must_use]
pub fn parse_import(csv: &str) -> ImportOutcome {
    let mut outcome = ImportOutcome::default();

    for line in csv.lines().skip(1) {
        if line.trim().is_empty() {
            continue;
        }

        match parse_row(line) {
            Some(row) => outcome.rows.push(row),
            None => outcome.skipped += 1,
        }
    }

    outcome
}

fn parse_row(line: &str) -> Option<ImportedRow> {
    let fields = split_record(line)?;
    if fields.len() != COLUMN_COUNT {
        return None;
    }

    let id: ProductId = fields.first()?.parse().ok()?;

    let name = fields.get(1)?.clone();
    let price_raw = fields.get(3)?.clone();
    let category = fields.get(4)?.clone();
    let image_url = fields.get(5)?.clone();

    let price = if price_raw.is_empty() {
        None
    } else {
        Some(price_raw.parse::<Decimal>().ok()?)
    };

    let patch = ProductPatch {
        price,
        category: non_empty(category),
        name: non_empty(name),
        image_url: non_empty(image_url),
    };

    if patch.is_empty() {
        return None;
    }

    Some(ImportedRow { id, patch })
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

/// Split one CSV record into unquoted fields.
///
/// Returns `None` when quoting is unbalanced or a quoted field is
/// followed by anything but a comma.
fn split_record(line: &str) -> Option<Vec<String>> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars().peekable();
    let mut in_quotes = false;

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    in_quotes = false;
                    // A closing quote must end the field.
                    match chars.peek() {
                        None => {}
                        Some(',') => {}
                        Some(_) => return None,
                    }
                }
            } else {
                current.push(c);
            }
        } else {
            match c {
                '"' if current.is_empty() => in_quotes = true,
                '"' => return None,
                ',' => fields.push(std::mem::take(&mut current)),
                _ => current.push(c),
            }
        }
    }

    if in_quotes {
        return None;
    }

    fields.push(current);
    Some(fields)
}
