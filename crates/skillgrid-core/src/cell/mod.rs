//! Cell-related types
//!
//! - [`Cell`] - one grid position: value, formula, display text and style
//! - [`CellValue`] - the scalar a cell holds
//! - [`CellAddress`] / [`CellRange`] - A1 addressing

mod address;
mod value;

pub use address::{CellAddress, CellRange};
pub use value::CellValue;

use crate::style::CellStyle;

/// Contents of one grid position
///
/// Every field is optional. A cell with neither a value nor a formula is
/// empty, whatever its display text or style says.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Cell {
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub value: Option<CellValue>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub formula: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub display_text: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub style: Option<CellStyle>,
}

impl Cell {
    /// The empty cell
    pub const EMPTY: Cell = Cell {
        value: None,
        formula: None,
        display_text: None,
        style: None,
    };

    /// A cell holding a plain value
    pub fn value<V: Into<CellValue>>(value: V) -> Self {
        Self {
            value: Some(value.into()),
            ..Self::default()
        }
    }

    /// A formula cell with its computed value
    pub fn formula<S: Into<String>, V: Into<CellValue>>(formula: S, value: V) -> Self {
        Self {
            value: Some(value.into()),
            formula: Some(formula.into()),
            ..Self::default()
        }
    }

    /// Set the display text
    pub fn with_display_text<S: Into<String>>(mut self, text: S) -> Self {
        self.display_text = Some(text.into());
        self
    }

    /// Set the style
    pub fn with_style(mut self, style: CellStyle) -> Self {
        self.style = Some(style);
        self
    }

    /// True when neither value nor formula is present
    pub fn is_empty(&self) -> bool {
        self.value.is_none() && self.formula.is_none()
    }

    /// Text shown to the candidate: display text, then value, then formula
    pub fn shown_text(&self) -> String {
        if let Some(text) = &self.display_text {
            return text.clone();
        }
        match (&self.value, &self.formula) {
            (Some(v), _) => v.to_string(),
            (None, Some(f)) => f.clone(),
            (None, None) => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emptiness_ignores_presentation() {
        assert!(Cell::EMPTY.is_empty());
        assert!(Cell::default().with_display_text("n/a").is_empty());
        assert!(!Cell::value(0).is_empty());
        assert!(!Cell {
            formula: Some("=A1".into()),
            ..Cell::default()
        }
        .is_empty());
    }

    #[test]
    fn test_shown_text_precedence() {
        assert_eq!(Cell::formula("=1+1", 2).shown_text(), "2");
        assert_eq!(Cell::value(0.5).with_display_text("50%").shown_text(), "50%");
        assert_eq!(Cell::EMPTY.shown_text(), "");
    }
}
