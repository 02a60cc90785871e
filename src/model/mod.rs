mod report;
mod suite;
mod test_case;

pub use report::Report;
pub use suite::TestSuite;
pub use test_case::{TestCase, TestCaseStatus};
