//! Streaming parser for JUnit-style XML test reports.
//!
//! [`parse`] walks a report with a single forward-only cursor over the
//! XML token stream and builds a tree of [`TestSuite`]s (arbitrarily
//! nested) and [`TestCase`]s, preserving execution metadata: durations,
//! assertion counts, declared suite counters, properties, and captured
//! output. The document is never materialized as a whole, so reports
//! with tens of thousands of cases parse with input-side memory bounded
//! by nesting depth.
//!
//! Required attributes (`name` on suites, `name` and `classname` on
//! cases) fail fast with [`ParseError::MissingAttribute`].
//! Well-formedness problems do not: they are accumulated over the whole
//! stream and surfaced once, as [`ParseError::Validation`], after
//! traversal ends.
//!
//! ```
//! use junit_xml_parser::{TestCaseStatus, parse};
//!
//! let xml = r#"
//!     <testsuite name="Main Suite" time="1.23">
//!         <testcase name="Test 1" classname="ExampleTest"/>
//!     </testsuite>
//! "#;
//!
//! let report = parse(xml.as_bytes()).unwrap();
//! assert_eq!(report.test_suites[0].name, "Main Suite");
//! assert_eq!(
//!     report.test_suites[0].test_cases[0].status,
//!     TestCaseStatus::Passed
//! );
//! ```

mod date_parser;
pub mod model;
pub mod parser;

pub use model::{Report, TestCase, TestCaseStatus, TestSuite};
pub use parser::{ParseError, XmlProblem, parse, parse_file};
