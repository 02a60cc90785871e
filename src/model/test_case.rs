use std::collections::HashMap;

/// Outcome of a single test case.
///
/// Failure messages live inside the `Failed` variant, so a case is failed
/// exactly when it carries at least one message. `Error` is part of the
/// reported vocabulary but is never produced by the parser; `<error>`
/// elements are not among the recognized children of `testcase`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TestCaseStatus {
    #[default]
    Passed,
    Failed {
        messages: Vec<String>,
    },
    Skipped,
    Error,
}

/// One individual test execution record, corresponding to one `testcase`
/// element.
///
/// A case is mutated only while its element is open; once its closing tag
/// has been processed it is owned by its parent [`TestSuite`] and no
/// longer touched.
///
/// [`TestSuite`]: crate::model::TestSuite
#[derive(Debug, Clone, PartialEq)]
pub struct TestCase {
    pub name: String,
    pub class_name: String,
    pub status: TestCaseStatus,
    /// Execution time in seconds.
    pub duration: Option<f64>,
    pub assertions: Option<usize>,
    pub properties: HashMap<String, String>,
    pub system_out: Option<String>,
    pub system_err: Option<String>,
}

impl TestCase {
    pub fn new(name: impl Into<String>, class_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            class_name: class_name.into(),
            status: TestCaseStatus::default(),
            duration: None,
            assertions: None,
            properties: HashMap::new(),
            system_out: None,
            system_err: None,
        }
    }

    pub fn mark_passed(&mut self) {
        self.status = TestCaseStatus::Passed;
    }

    /// Records one failure message. A case that already failed accumulates
    /// further messages in encounter order.
    pub fn mark_failed(&mut self, message: impl Into<String>) {
        match &mut self.status {
            TestCaseStatus::Failed { messages } => messages.push(message.into()),
            _ => {
                self.status = TestCaseStatus::Failed {
                    messages: vec![message.into()],
                }
            }
        }
    }

    /// Marks the case skipped, independent of any prior state.
    pub fn mark_skipped(&mut self) {
        self.status = TestCaseStatus::Skipped;
    }

    /// The recorded failure messages, empty unless the case is failed.
    pub fn failure_messages(&self) -> &[String] {
        match &self.status {
            TestCaseStatus::Failed { messages } => messages,
            _ => &[],
        }
    }
}
