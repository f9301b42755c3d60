//! Raw spreadsheet cell values.
//!
//! The workbook API returns cell values as untyped JSON. [`CellValue`] narrows
//! them to the three shapes the decoder cares about so every consumer has to
//! match explicitly instead of coercing.

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// A single cell as read from a table row.
///
/// # Examples
///
/// ```
/// use limit_pacer::CellValue;
///
/// let cells: Vec<CellValue> = serde_json::from_str(r#"["T-1", 45658, null, true]"#).unwrap();
/// assert_eq!(cells[0], CellValue::Text("T-1".to_string()));
/// assert_eq!(cells[1], CellValue::Number(45658.0));
/// assert_eq!(cells[2], CellValue::Empty);
/// assert_eq!(cells[3], CellValue::Text("TRUE".to_string()));
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    /// Text content, including booleans rendered the way the spreadsheet shows them.
    Text(String),
    /// Numeric content (dates arrive as day serials).
    Number(f64),
    /// Blank cell or JSON `null`.
    #[default]
    Empty,
}

/// An ordered row of cells.
pub type RawRow = Vec<CellValue>;

impl CellValue {
    /// Convenience constructor for text cells.
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Returns `true` for blank cells and whitespace-only text.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            Self::Number(_) => false,
        }
    }

    /// Renders the cell as the text the spreadsheet would display.
    ///
    /// Integral numbers render without a fractional part (`2` not `2.0`), so an
    /// id column typed as numbers still yields `"2"`.
    pub fn as_text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Number(n) => format_number(*n),
            Self::Empty => String::new(),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Text(s) => serializer.serialize_str(s),
            Self::Number(n) => serializer.serialize_f64(*n),
            Self::Empty => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for CellValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(CellValueVisitor)
    }
}

struct CellValueVisitor;

impl<'de> Visitor<'de> for CellValueVisitor {
    type Value = CellValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string, number, boolean or null cell value")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(CellValue::Text(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
        Ok(CellValue::Text(v))
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
        Ok(CellValue::Text(if v { "TRUE" } else { "FALSE" }.to_string()))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(CellValue::Number(v as f64))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(CellValue::Number(v as f64))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        Ok(CellValue::Number(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(CellValue::Empty)
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(CellValue::Empty)
    }
}

static EMPTY_CELL: CellValue = CellValue::Empty;

/// A row read from a remote table, with its table-relative position.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableRow {
    /// Zero-based position of the row inside the table body.
    pub index: usize,
    /// Cells in column order.
    pub cells: RawRow,
}

impl TableRow {
    /// Creates a row from its position and cells.
    pub fn new(index: usize, cells: RawRow) -> Self {
        Self { index, cells }
    }

    /// Returns the cell at `column`, or [`CellValue::Empty`] past the end.
    pub fn cell(&self, column: usize) -> &CellValue {
        self.cells.get(column).unwrap_or(&EMPTY_CELL)
    }
}
