//! Typed cell styling
//!
//! Only the attributes a practical task can grade are modeled; anything else
//! a spreadsheet widget sends is dropped at the boundary.

mod color;

pub use color::Color;

/// Horizontal text alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum HorizontalAlignment {
    #[default]
    General,
    Left,
    Center,
    Right,
    Justify,
}

/// Formatting attributes of a cell
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CellStyle {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub font_size: Option<f64>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub font_color: Option<Color>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub fill_color: Option<Color>,
    pub horizontal_alignment: HorizontalAlignment,
    /// Excel-style number format code, e.g. `0.00%` or `$#,##0`
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub number_format: Option<String>,
}

impl CellStyle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn italic(mut self) -> Self {
        self.italic = true;
        self
    }

    pub fn with_fill(mut self, color: Color) -> Self {
        self.fill_color = Some(color);
        self
    }

    pub fn with_font_color(mut self, color: Color) -> Self {
        self.font_color = Some(color);
        self
    }

    pub fn with_alignment(mut self, alignment: HorizontalAlignment) -> Self {
        self.horizontal_alignment = alignment;
        self
    }

    pub fn with_number_format<S: Into<String>>(mut self, format: S) -> Self {
        self.number_format = Some(format.into());
        self
    }

    /// True when no attribute differs from the default look
    pub fn is_plain(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let style = CellStyle::new()
            .bold()
            .with_fill(Color::rgb(255, 255, 0))
            .with_number_format("0.0%");
        assert!(style.bold);
        assert!(!style.is_plain());
        assert!(CellStyle::new().is_plain());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_json_shape() {
        let style: CellStyle =
            serde_json::from_str(r##"{"bold":true,"fill_color":"#00FF00","horizontal_alignment":"center"}"##)
                .unwrap();
        assert_eq!(style.fill_color, Some(Color::rgb(0, 255, 0)));
        assert_eq!(style.horizontal_alignment, HorizontalAlignment::Center);
    }
}
