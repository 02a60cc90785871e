use std::collections::HashMap;

use chrono::{DateTime, FixedOffset};

use crate::model::TestCase;

/// A named grouping of test cases and/or nested suites, corresponding to
/// one `testsuite` element. Nesting depth is unbounded.
///
/// The counters (`tests`, `assertions`, `errors`, `failures`, `skipped`)
/// are taken verbatim from the suite's XML attributes and are never
/// recomputed from its children; the model preserves what the report
/// declared.
#[derive(Debug, Clone, PartialEq)]
pub struct TestSuite {
    pub name: String,
    pub timestamp: Option<DateTime<FixedOffset>>,
    /// Execution time in seconds.
    pub duration: Option<f64>,
    pub tests: Option<usize>,
    pub assertions: Option<usize>,
    pub errors: Option<usize>,
    pub failures: Option<usize>,
    pub skipped: Option<usize>,
    pub properties: HashMap<String, String>,
    pub system_out: Option<String>,
    pub system_err: Option<String>,
    /// Child test cases in document order.
    pub test_cases: Vec<TestCase>,
    /// Nested suites in document order, kept separate from `test_cases`.
    pub nested_suites: Vec<TestSuite>,
}

impl TestSuite {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            timestamp: None,
            duration: None,
            tests: None,
            assertions: None,
            errors: None,
            failures: None,
            skipped: None,
            properties: HashMap::new(),
            system_out: None,
            system_err: None,
            test_cases: Vec::new(),
            nested_suites: Vec::new(),
        }
    }

    pub fn add_test_case(&mut self, test_case: TestCase) {
        self.test_cases.push(test_case);
    }

    pub fn add_nested_suite(&mut self, suite: TestSuite) {
        self.nested_suites.push(suite);
    }
}
