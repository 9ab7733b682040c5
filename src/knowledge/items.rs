use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use tracing::{info, warn};

use super::KnowledgeError;

/// Columns expected in the item table, in order
pub const ITEM_COLUMNS: [&str; 8] = [
    "id",
    "name",
    "type",
    "material_name",
    "material_count",
    "level",
    "reinforce_name",
    "reinforce_count",
];

/// One row of the item data table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemRow {
    pub id: i64,
    pub name: String,
    pub item_type: String,
    pub material_name: String,
    pub material_count: u32,
    pub level: u32,
    pub reinforce_name: String,
    pub reinforce_count: u32,
}

impl ItemRow {
    #[inline]
    pub fn new(id: i64, name: impl Into<String>, item_type: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            item_type: item_type.into(),
            ..Self::default()
        }
    }

    #[inline]
    pub fn with_material(mut self, name: impl Into<String>, count: u32) -> Self {
        self.material_name = name.into();
        self.material_count = count;
        self
    }

    #[inline]
    pub fn with_reinforcement(mut self, level: u32, name: impl Into<String>, count: u32) -> Self {
        self.level = level;
        self.reinforce_name = name.into();
        self.reinforce_count = count;
        self
    }
}

#[inline]
pub fn read_item_table(path: &Path) -> Result<Vec<ItemRow>, KnowledgeError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(KnowledgeError::MissingSource(path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };

    let rows = parse_item_table(&content)?;
    info!("Read {} item rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Parse comma-separated item data with a header line.
///
/// Rows whose column count differs from the header, or whose numeric fields
/// do not parse, are skipped with a warning. Empty count fields read as zero.
#[inline]
pub fn parse_item_table(content: &str) -> Result<Vec<ItemRow>, KnowledgeError> {
    let mut lines = content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty());

    let Some((_, header_line)) = lines.next() else {
        warn!("Item table is empty");
        return Ok(Vec::new());
    };

    let headers: Vec<&str> = header_line
        .trim_start_matches('\u{feff}')
        .split(',')
        .map(str::trim)
        .collect();

    if headers.len() != ITEM_COLUMNS.len() {
        return Err(KnowledgeError::InvalidTable(format!(
            "expected {} columns ({}), found {}",
            ITEM_COLUMNS.len(),
            ITEM_COLUMNS.join(","),
            headers.len()
        )));
    }

    if let Some((found, expected)) = headers
        .iter()
        .zip(ITEM_COLUMNS)
        .find(|(found, expected)| !found.eq_ignore_ascii_case(expected))
    {
        return Err(KnowledgeError::InvalidTable(format!(
            "expected column '{}', found '{}'",
            expected, found
        )));
    }

    let mut rows = Vec::new();
    for (index, line) in lines {
        let line_number = index + 1;
        let values: Vec<&str> = line.split(',').map(str::trim).collect();

        if values.len() != headers.len() {
            warn!(
                "Line {}: expected {} columns, found {}; skipping",
                line_number,
                headers.len(),
                values.len()
            );
            continue;
        }

        match parse_row(&values) {
            Ok(row) => rows.push(row),
            Err(message) => warn!("Line {}: {}; skipping", line_number, message),
        }
    }

    Ok(rows)
}

fn parse_row(values: &[&str]) -> Result<ItemRow, String> {
    let id = values[0]
        .parse::<i64>()
        .map_err(|_| format!("invalid item id '{}'", values[0]))?;

    Ok(ItemRow {
        id,
        name: values[1].to_string(),
        item_type: values[2].to_string(),
        material_name: values[3].to_string(),
        material_count: parse_count(values[4], "material_count")?,
        level: parse_count(values[5], "level")?,
        reinforce_name: values[6].to_string(),
        reinforce_count: parse_count(values[7], "reinforce_count")?,
    })
}

fn parse_count(value: &str, column: &str) -> Result<u32, String> {
    if value.is_empty() {
        return Ok(0);
    }
    value
        .parse::<u32>()
        .map_err(|_| format!("invalid {} '{}'", column, value))
}
