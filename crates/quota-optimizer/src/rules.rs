//! Ordered rule tables used to classify steps
//!
//! Every table is a list of `(label, keywords)` rules evaluated top to
//! bottom; the first rule whose keyword occurs in the text wins. Matching is
//! a case-insensitive substring test, so `"target"` matches `get`.

use regex::Regex;
use std::sync::LazyLock;

/// A labelled keyword rule
#[derive(Debug, Clone, Copy)]
pub struct KeywordRule<L> {
    pub label: L,
    pub keywords: &'static [&'static str],
}

impl<L: Copy> KeywordRule<L> {
    /// `text` must already be lowercase
    fn matches(&self, text: &str) -> bool {
        self.keywords.iter().any(|keyword| text.contains(keyword))
    }
}

/// First matching label in `rules`, if any
pub fn first_match<L: Copy>(rules: &[KeywordRule<L>], text: &str) -> Option<L> {
    let text = text.to_lowercase();
    rules.iter().find(|rule| rule.matches(&text)).map(|rule| rule.label)
}

// ============================================================================
// Functional categories (spec decomposition)
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionalCategory {
    Validation,
    Transformation,
    Analysis,
    Retrieval,
    Storage,
    Presentation,
}

impl FunctionalCategory {
    pub fn label(&self) -> &'static str {
        match self {
            FunctionalCategory::Validation => "Validation",
            FunctionalCategory::Transformation => "Transformation",
            FunctionalCategory::Analysis => "Analysis",
            FunctionalCategory::Retrieval => "Data Retrieval",
            FunctionalCategory::Storage => "Storage",
            FunctionalCategory::Presentation => "Presentation",
        }
    }
}

pub const FUNCTIONAL_CATEGORIES: &[KeywordRule<FunctionalCategory>] = &[
    KeywordRule { label: FunctionalCategory::Validation, keywords: &["validate", "check", "verify"] },
    KeywordRule { label: FunctionalCategory::Transformation, keywords: &["process", "transform", "convert"] },
    KeywordRule { label: FunctionalCategory::Analysis, keywords: &["analyze", "calculate", "compute"] },
    KeywordRule { label: FunctionalCategory::Retrieval, keywords: &["fetch", "retrieve", "query"] },
    KeywordRule { label: FunctionalCategory::Storage, keywords: &["store", "save", "persist"] },
    KeywordRule { label: FunctionalCategory::Presentation, keywords: &["format", "render", "display"] },
];

pub fn functional_category(description: &str) -> Option<FunctionalCategory> {
    first_match(FUNCTIONAL_CATEGORIES, description)
}

// ============================================================================
// Deterministic operations (cacheability)
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeterministicOperation {
    Retrieval,
    Computation,
    Validation,
}

pub const DETERMINISTIC_OPERATIONS: &[KeywordRule<DeterministicOperation>] = &[
    KeywordRule { label: DeterministicOperation::Retrieval, keywords: &["query", "fetch", "retrieve", "get"] },
    KeywordRule { label: DeterministicOperation::Computation, keywords: &["analyze", "process", "calculate"] },
    KeywordRule { label: DeterministicOperation::Validation, keywords: &["validate", "check", "verify"] },
];

pub fn deterministic_operation(description: &str) -> Option<DeterministicOperation> {
    first_match(DETERMINISTIC_OPERATIONS, description)
}

// ============================================================================
// Input shapes (batch keys)
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InputShape {
    Id,
    Data,
    Config,
    Param,
}

impl InputShape {
    pub fn label(&self) -> &'static str {
        match self {
            InputShape::Id => "ID",
            InputShape::Data => "DATA",
            InputShape::Config => "CONFIG",
            InputShape::Param => "PARAM",
        }
    }
}

pub const INPUT_SHAPES: &[KeywordRule<InputShape>] = &[
    KeywordRule { label: InputShape::Id, keywords: &["id"] },
    KeywordRule { label: InputShape::Data, keywords: &["data"] },
    KeywordRule { label: InputShape::Config, keywords: &["config"] },
];

pub fn classify_input(name: &str) -> InputShape {
    first_match(INPUT_SHAPES, name).unwrap_or(InputShape::Param)
}

/// Sorted, comma-joined shape labels of a step's inputs
pub fn input_pattern(inputs: &[String]) -> String {
    let mut labels: Vec<&str> = inputs.iter().map(|input| classify_input(input).label()).collect();
    labels.sort_unstable();
    labels.join(",")
}

// ============================================================================
// Description normalization
// ============================================================================

/// Applied in order: earlier rules must run before the digit rule eats
/// their digits.
static NORMALIZATION_RULES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        (
            Regex::new(r"\b[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}\b")
                .expect("uuid regex is valid"),
            "UUID",
        ),
        (
            Regex::new(r"[\w.+-]+@[\w-]+(?:\.[\w-]+)+").expect("email regex is valid"),
            "EMAIL",
        ),
        (Regex::new(r"\b[a-z]+_\d+\b").expect("item regex is valid"), "ITEM"),
        (Regex::new(r"\d+").expect("number regex is valid"), "N"),
    ]
});

/// Lowercased description with variable parts replaced by placeholders
pub fn operation_pattern(description: &str) -> String {
    NORMALIZATION_RULES
        .iter()
        .fold(description.trim().to_lowercase(), |text, (pattern, placeholder)| {
            pattern.replace_all(&text, *placeholder).into_owned()
        })
}
