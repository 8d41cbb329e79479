//! Formula text analysis
//!
//! [`analyze`] never fails. Text that is not a formula yields an empty,
//! invalid analysis; malformed formulas still report whatever functions and
//! references could be extracted.

use skillgrid_core::CellAddress;

use crate::catalog;
use crate::lexer::{tokenize, Lexeme, Token};

/// What a formula calls and references
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FormulaAnalysis {
    /// Called functions, upper-cased, in call order with duplicates
    pub functions: Vec<String>,
    /// Cell references (`A1`) and ranges (`A1:B2`), upper-cased without `$`
    pub references: Vec<String>,
    /// Parentheses are balanced
    pub is_valid: bool,
    /// Sum of the catalog weights of every call
    pub complexity: u32,
}

impl FormulaAnalysis {
    /// Distinct functions in first-call order
    pub fn unique_functions(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for name in &self.functions {
            if !seen.contains(&name.as_str()) {
                seen.push(name);
            }
        }
        seen
    }

    /// True when the formula calls `name` (case-insensitive)
    pub fn calls(&self, name: &str) -> bool {
        self.functions.iter().any(|f| f.eq_ignore_ascii_case(name))
    }
}

/// Analyze a formula such as `=SUM(A1:A10)`
///
/// # Example
/// ```rust
/// use skillgrid_formula::analyze;
///
/// let analysis = analyze("=SUM(A1,B1)");
/// assert_eq!(analysis.functions, vec!["SUM"]);
/// assert_eq!(analysis.references, vec!["A1", "B1"]);
/// assert!(analysis.is_valid);
/// assert!(!analyze("=SUM(A1,B1").is_valid);
/// ```
pub fn analyze(formula: &str) -> FormulaAnalysis {
    let Some(body) = formula.strip_prefix('=') else {
        return FormulaAnalysis::default();
    };

    let lexemes = tokenize(body);
    let functions = functions(&lexemes);
    let complexity = functions.iter().map(|f| catalog::weight(f)).sum();

    FormulaAnalysis {
        references: references(&lexemes),
        is_valid: parentheses_balanced(&lexemes),
        functions,
        complexity,
    }
}

fn functions(lexemes: &[Lexeme]) -> Vec<String> {
    lexemes
        .windows(2)
        .filter_map(|pair| match (&pair[0].token, &pair[1].token) {
            (Token::Word(name), Token::LeftParen)
                if pair[0].touches(&pair[1]) && starts_uppercase(name) =>
            {
                Some(name.to_ascii_uppercase())
            }
            _ => None,
        })
        .collect()
}

fn starts_uppercase(word: &str) -> bool {
    word.chars().next().is_some_and(|c| c.is_ascii_uppercase())
}

fn references(lexemes: &[Lexeme]) -> Vec<String> {
    let mut refs = Vec::new();
    let mut i = 0;

    while i < lexemes.len() {
        let Some(start) = as_reference(lexemes, i) else {
            i += 1;
            continue;
        };

        // `A1:B2` is one range reference, kept in written corner order
        if matches!(lexemes.get(i + 1).map(|l| &l.token), Some(Token::Colon)) {
            if let Some(end) = as_reference(lexemes, i + 2) {
                refs.push(format!("{start}:{end}"));
                i += 3;
                continue;
            }
        }

        refs.push(start.to_a1_string());
        i += 1;
    }

    refs
}

/// The address at `lexemes[i]`, unless it is a sheet name or a call
fn as_reference(lexemes: &[Lexeme], i: usize) -> Option<CellAddress> {
    let Token::Word(word) = &lexemes.get(i)?.token else {
        return None;
    };
    match lexemes.get(i + 1).map(|l| &l.token) {
        Some(Token::Bang) | Some(Token::LeftParen) => return None,
        _ => {}
    }
    CellAddress::parse(word).ok()
}

fn parentheses_balanced(lexemes: &[Lexeme]) -> bool {
    let mut depth: i64 = 0;
    for lexeme in lexemes {
        match lexeme.token {
            Token::LeftParen => depth += 1,
            Token::RightParen => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_not_a_formula() {
        assert_eq!(analyze("SUM(A1)"), FormulaAnalysis::default());
        assert_eq!(analyze(""), FormulaAnalysis::default());
        assert_eq!(analyze("42"), FormulaAnalysis::default());
    }

    #[test]
    fn test_balanced_sum() {
        let analysis = analyze("=SUM(A1,B1)");
        assert_eq!(analysis.functions, vec!["SUM"]);
        assert_eq!(analysis.references, vec!["A1", "B1"]);
        assert!(analysis.is_valid);
        assert_eq!(analysis.complexity, 1);
    }

    #[test]
    fn test_unbalanced() {
        let analysis = analyze("=SUM(A1,B1");
        assert!(!analysis.is_valid);
        assert_eq!(analysis.functions, vec!["SUM"]);
        assert!(!analyze("=SUM(A1))+(").is_valid);
        assert!(!analyze("=)(").is_valid);
    }

    #[test]
    fn test_nested_lookup() {
        let analysis = analyze("=INDEX($B$2:$B$20,MATCH(E2,a2:a20,0))");
        assert_eq!(analysis.functions, vec!["INDEX", "MATCH"]);
        assert_eq!(analysis.references, vec!["B2:B20", "E2", "A2:A20"]);
        assert_eq!(analysis.complexity, 6);
        assert!(analysis.calls("match"));
    }

    #[test]
    fn test_duplicates_kept_in_order() {
        let analysis = analyze("=IF(SUM(A1:A3)>0,SUM(B1:B3),IFERROR(MYFN(C1),0))");
        assert_eq!(analysis.functions, vec!["IF", "SUM", "SUM", "IFERROR", "MYFN"]);
        assert_eq!(analysis.unique_functions(), vec!["IF", "SUM", "IFERROR", "MYFN"]);
        assert_eq!(analysis.complexity, 2 + 1 + 1 + 2 + 2);
    }

    #[test]
    fn test_function_rules() {
        // lower-case leading names and detached parentheses are not calls
        assert!(analyze("=sum(A1)").functions.is_empty());
        assert!(analyze("=SUM (A1)").functions.is_empty());
        // names that look like addresses are calls when followed by `(`
        let analysis = analyze("=LOG10(A1)");
        assert_eq!(analysis.functions, vec!["LOG10"]);
        assert_eq!(analysis.references, vec!["A1"]);
    }

    #[test]
    fn test_string_literals_are_ignored() {
        let analysis = analyze(r#"=IF(A1="VLOOKUP(B2)",")",C3)"#);
        assert_eq!(analysis.functions, vec!["IF"]);
        assert_eq!(analysis.references, vec!["A1", "C3"]);
        assert!(analysis.is_valid);
    }

    #[test]
    fn test_sheet_prefixes_are_dropped() {
        let analysis = analyze("=SUM(Raw!B2:B9)+'Q1 Data'!$C$4+Tab1!A1");
        assert_eq!(analysis.references, vec!["B2:B9", "C4", "A1"]);
    }

    #[test]
    fn test_non_references() {
        let analysis = analyze("=TRUE+1.5+B:B+A0");
        assert!(analysis.references.is_empty());
    }
}
