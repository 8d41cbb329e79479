//! Known spreadsheet functions with their complexity weights
//!
//! Weights grade how much skill a function signals: plain aggregates are 1,
//! logical and single-criteria conditionals 2, lookups and multi-criteria
//! aggregates 3, indirection and dynamic arrays 4, and function-building
//! constructs 5. Functions missing from the catalog weigh
//! [`UNKNOWN_FUNCTION_WEIGHT`].

use ahash::AHashMap;
use once_cell::sync::Lazy;

/// Weight assigned to functions not in the catalog
pub const UNKNOWN_FUNCTION_WEIGHT: u32 = 2;

/// Broad family a function belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FunctionCategory {
    Aggregate,
    Math,
    Logical,
    Conditional,
    Lookup,
    Text,
    Date,
    Statistical,
    Array,
    Reference,
    Lambda,
}

impl FunctionCategory {
    /// Categories that indicate analysing data rather than arithmetic
    pub fn is_analytical(self) -> bool {
        matches!(
            self,
            FunctionCategory::Lookup
                | FunctionCategory::Conditional
                | FunctionCategory::Statistical
                | FunctionCategory::Array
        )
    }
}

/// Catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionInfo {
    pub name: &'static str,
    pub category: FunctionCategory,
    pub weight: u32,
}

use FunctionCategory::*;

const FUNCTIONS: &[(&str, FunctionCategory, u32)] = &[
    // Basic aggregates and arithmetic
    ("SUM", Aggregate, 1),
    ("AVERAGE", Aggregate, 1),
    ("COUNT", Aggregate, 1),
    ("COUNTA", Aggregate, 1),
    ("COUNTBLANK", Aggregate, 1),
    ("MIN", Aggregate, 1),
    ("MAX", Aggregate, 1),
    ("PRODUCT", Aggregate, 1),
    ("ROUND", Math, 1),
    ("ROUNDUP", Math, 1),
    ("ROUNDDOWN", Math, 1),
    ("ABS", Math, 1),
    ("INT", Math, 1),
    ("MOD", Math, 1),
    ("POWER", Math, 1),
    ("SQRT", Math, 1),
    ("NOT", Logical, 1),
    ("CONCATENATE", Text, 1),
    ("CONCAT", Text, 1),
    ("LEN", Text, 1),
    ("UPPER", Text, 1),
    ("LOWER", Text, 1),
    ("PROPER", Text, 1),
    ("TRIM", Text, 1),
    ("LEFT", Text, 1),
    ("RIGHT", Text, 1),
    ("MID", Text, 1),
    ("TODAY", Date, 1),
    ("NOW", Date, 1),
    ("DATE", Date, 1),
    ("YEAR", Date, 1),
    ("MONTH", Date, 1),
    ("DAY", Date, 1),
    // Logical, single-criteria conditionals, formatting text
    ("IF", Logical, 2),
    ("IFS", Logical, 2),
    ("AND", Logical, 2),
    ("OR", Logical, 2),
    ("XOR", Logical, 2),
    ("IFERROR", Logical, 2),
    ("IFNA", Logical, 2),
    ("SWITCH", Logical, 2),
    ("SUMIF", Conditional, 2),
    ("COUNTIF", Conditional, 2),
    ("AVERAGEIF", Conditional, 2),
    ("TEXT", Text, 2),
    ("TEXTJOIN", Text, 2),
    ("SUBSTITUTE", Text, 2),
    ("FIND", Text, 2),
    ("SEARCH", Text, 2),
    ("DATEDIF", Date, 2),
    ("EOMONTH", Date, 2),
    ("EDATE", Date, 2),
    ("NETWORKDAYS", Date, 2),
    ("WEEKDAY", Date, 2),
    ("MEDIAN", Statistical, 2),
    ("MODE", Statistical, 2),
    ("STDEV", Statistical, 2),
    ("VAR", Statistical, 2),
    ("RANK", Statistical, 2),
    ("LARGE", Statistical, 2),
    ("SMALL", Statistical, 2),
    ("PERCENTILE", Statistical, 2),
    ("ROWS", Reference, 2),
    ("COLUMNS", Reference, 2),
    // Lookups and multi-criteria aggregates
    ("VLOOKUP", Lookup, 3),
    ("HLOOKUP", Lookup, 3),
    ("LOOKUP", Lookup, 3),
    ("INDEX", Lookup, 3),
    ("MATCH", Lookup, 3),
    ("XLOOKUP", Lookup, 3),
    ("XMATCH", Lookup, 3),
    ("CHOOSE", Lookup, 3),
    ("SUMIFS", Conditional, 3),
    ("COUNTIFS", Conditional, 3),
    ("AVERAGEIFS", Conditional, 3),
    ("MAXIFS", Conditional, 3),
    ("MINIFS", Conditional, 3),
    ("CORREL", Statistical, 3),
    ("FORECAST", Statistical, 3),
    // Indirection and dynamic arrays
    ("INDIRECT", Reference, 4),
    ("OFFSET", Reference, 4),
    ("SUMPRODUCT", Array, 4),
    ("MMULT", Array, 4),
    ("TRANSPOSE", Array, 4),
    ("SORT", Array, 4),
    ("SORTBY", Array, 4),
    ("UNIQUE", Array, 4),
    ("FILTER", Array, 4),
    ("SEQUENCE", Array, 4),
    // Function-building constructs
    ("LET", Lambda, 5),
    ("LAMBDA", Lambda, 5),
    ("MAP", Lambda, 5),
    ("REDUCE", Lambda, 5),
    ("BYROW", Lambda, 5),
    ("BYCOL", Lambda, 5),
    ("ARRAYFORMULA", Array, 5),
];

static CATALOG: Lazy<AHashMap<&'static str, FunctionInfo>> = Lazy::new(|| {
    FUNCTIONS
        .iter()
        .map(|&(name, category, weight)| {
            (
                name,
                FunctionInfo {
                    name,
                    category,
                    weight,
                },
            )
        })
        .collect()
});

/// Look up a function by name, case-insensitively
pub fn lookup(name: &str) -> Option<&'static FunctionInfo> {
    let upper = name.to_ascii_uppercase();
    CATALOG.get(upper.as_str())
}

/// Complexity weight of a function
pub fn weight(name: &str) -> u32 {
    lookup(name).map_or(UNKNOWN_FUNCTION_WEIGHT, |info| info.weight)
}

/// Category of a function, if known
pub fn category(name: &str) -> Option<FunctionCategory> {
    lookup(name).map(|info| info.category)
}

/// Number of catalogued functions
pub fn len() -> usize {
    CATALOG.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weights_by_tier() {
        assert_eq!(weight("SUM"), 1);
        assert_eq!(weight("if"), 2);
        assert_eq!(weight("VLOOKUP"), 3);
        assert_eq!(weight("INDIRECT"), 4);
        assert_eq!(weight("LAMBDA"), 5);
        assert_eq!(weight("MYCUSTOMFN"), UNKNOWN_FUNCTION_WEIGHT);
    }

    #[test]
    fn test_catalog_has_no_duplicates() {
        assert_eq!(len(), FUNCTIONS.len());
    }

    #[test]
    fn test_analytical_categories() {
        assert!(category("COUNTIFS").unwrap().is_analytical());
        assert!(category("XLOOKUP").unwrap().is_analytical());
        assert!(!category("SUM").unwrap().is_analytical());
        assert_eq!(category("NOPE"), None);
    }
}
