//! Property tests for formula analysis

use proptest::prelude::*;
use skillgrid_core::called_functions;
use skillgrid_formula::analyze;

proptest! {
    /// Arbitrary text never panics and non-formulas are always empty
    #[test]
    fn never_panics(text in "\\PC{0,40}") {
        let analysis = analyze(&text);
        if !text.starts_with('=') {
            prop_assert!(analysis.functions.is_empty());
            prop_assert!(analysis.references.is_empty());
            prop_assert!(!analysis.is_valid);
            prop_assert_eq!(analysis.complexity, 0);
        }
    }

    /// Wrapping a valid formula body in a known call keeps it valid
    #[test]
    fn nesting_preserves_validity(col in "[A-Z]{1,2}", row in 1u32..5000, depth in 1usize..6) {
        let reference = format!("{col}{row}");
        let mut body = reference.clone();
        for _ in 0..depth {
            body = format!("ABS({body})");
        }
        let analysis = analyze(&format!("={body}"));
        prop_assert!(analysis.is_valid);
        prop_assert_eq!(analysis.functions.len(), depth);
        prop_assert_eq!(analysis.complexity as usize, depth);
        prop_assert_eq!(analysis.references, vec![reference]);
    }

    /// The differ's call detection agrees with the analyzer
    #[test]
    fn called_functions_match_analysis(body in "[A-Za-z0-9_.$ ()\"',&!:]{0,30}") {
        let formula = format!("={body}");
        prop_assert_eq!(called_functions(&formula), analyze(&formula).functions);
    }

    /// Dropping the final parenthesis always invalidates a call
    #[test]
    fn missing_close_is_invalid(row in 1u32..100) {
        let formula = format!("=SUM(A{row}:B{row}");
        prop_assert!(!analyze(&formula).is_valid);
    }
}
