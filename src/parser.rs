use std::{
    collections::HashMap,
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use quick_xml::{
    Reader,
    errors::{Error as XmlError, IllFormedError},
    escape::resolve_html5_entity,
    events::{BytesStart, Event},
};
use thiserror::Error;

use crate::model::{Report, TestCase, TestSuite};

const TAG_TEST_SUITE: &[u8] = b"testsuite";
const TAG_TEST_CASE: &[u8] = b"testcase";
const TAG_FAILURE: &[u8] = b"failure";
const TAG_SKIPPED: &[u8] = b"skipped";
const TAG_PROPERTIES: &[u8] = b"properties";
const TAG_PROPERTY: &[u8] = b"property";
const TAG_SYSTEM_OUT: &[u8] = b"system-out";
const TAG_SYSTEM_ERR: &[u8] = b"system-err";

const SUITE_REQUIRED_ATTRS: &[&str] = &["name"];
const CASE_REQUIRED_ATTRS: &[&str] = &["name", "classname"];

/// A single XML well-formedness problem recorded while reading the
/// stream, unrelated to the semantic attribute contract.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum XmlProblem {
    #[error("malformed XML at byte {position}: {message}")]
    Syntax { position: u64, message: String },
    #[error("element `{element}` is never closed")]
    UnclosedElement { element: String },
    #[error("document has no root element")]
    EmptyDocument,
}

#[derive(Error, Debug)]
pub enum ParseError {
    /// The input resource could not be opened. Raised by [`parse_file`]
    /// before any parsing starts.
    #[error("unable to open {path}")]
    NotFound {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A required attribute is absent or empty on a `testsuite` or
    /// `testcase` open tag. Raised at the point of discovery; no partial
    /// tree is returned.
    #[error("missing attribute `{attribute}` in {element}")]
    MissingAttribute { attribute: String, element: String },

    /// The document is not well-formed XML. Raised only after the whole
    /// stream has been consumed, with every problem found along the way.
    #[error("document is not well-formed XML ({} problem(s))", .problems.len())]
    Validation { problems: Vec<XmlProblem> },
}

/// Parse a JUnit XML report from a file on disk.
pub fn parse_file(path: impl AsRef<Path>) -> Result<Report, ParseError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| ParseError::NotFound {
        path: path.display().to_string(),
        source,
    })?;
    parse(BufReader::new(file))
}

/// Parse a JUnit XML report from a buffered reader.
///
/// Top-level `testsuite` elements become the report's suites, in document
/// order; a `testsuites` wrapper element, if present, is skipped over.
/// Well-formedness problems do not abort the traversal: the whole stream
/// is consumed first and the collected problems are surfaced as a single
/// [`ParseError::Validation`] at the end, so a truncated document still
/// yields a complete error report.
pub fn parse<R: BufRead>(input: R) -> Result<Report, ParseError> {
    let mut cursor = TokenCursor::new(input);
    let mut report = Report::default();

    loop {
        match cursor.advance() {
            Event::Start(e) if e.name().as_ref() == TAG_TEST_SUITE => {
                let suite = parse_suite(&mut cursor, &e)?;
                report.add_test_suite(suite);
            }
            Event::Empty(e) if e.name().as_ref() == TAG_TEST_SUITE => {
                report.add_test_suite(new_suite(&e)?);
            }
            Event::Eof => break,
            _ => (),
        }
    }

    let problems = cursor.into_problems();
    if !problems.is_empty() {
        return Err(ParseError::Validation { problems });
    }

    tracing::debug!(
        "parsed JUnit report with {} top-level suite(s)",
        report.test_suites.len()
    );
    Ok(report)
}

/// Parses one `testsuite` element, recursing for nested suites: one stack
/// frame per open suite, with the cursor shared down the recursion. If
/// the stream ends before the closing tag, the suite is returned as built
/// so far; reporting the truncation is the cursor's job.
fn parse_suite<R: BufRead>(
    cursor: &mut TokenCursor<R>,
    start: &BytesStart,
) -> Result<TestSuite, ParseError> {
    let mut suite = new_suite(start)?;

    loop {
        match cursor.advance() {
            Event::Start(e) => match e.name().as_ref() {
                TAG_TEST_SUITE => {
                    let nested = parse_suite(cursor, &e)?;
                    suite.add_nested_suite(nested);
                }
                TAG_TEST_CASE => {
                    let test_case = parse_case(cursor, &e, false)?;
                    suite.add_test_case(test_case);
                }
                TAG_PROPERTIES => suite.properties = parse_properties(cursor),
                TAG_SYSTEM_OUT => suite.system_out = read_text(cursor, TAG_SYSTEM_OUT, true),
                TAG_SYSTEM_ERR => suite.system_err = read_text(cursor, TAG_SYSTEM_ERR, true),
                _ => (),
            },
            Event::Empty(e) => match e.name().as_ref() {
                TAG_TEST_SUITE => suite.add_nested_suite(new_suite(&e)?),
                TAG_TEST_CASE => suite.add_test_case(parse_case(cursor, &e, true)?),
                _ => (),
            },
            Event::End(e) if e.name().as_ref() == TAG_TEST_SUITE => return Ok(suite),
            Event::Eof => return Ok(suite),
            _ => (),
        }
    }
}

fn new_suite(start: &BytesStart) -> Result<TestSuite, ParseError> {
    require_attributes(start, SUITE_REQUIRED_ATTRS)?;

    let mut suite = TestSuite::new(parse_attr::name(start).unwrap_or_default());
    suite.timestamp = parse_attr::timestamp(start);
    suite.duration = Some(parse_attr::time(start).unwrap_or_default());
    suite.tests = Some(parse_attr::count(start, "tests").unwrap_or_default());
    suite.assertions = Some(parse_attr::count(start, "assertions").unwrap_or_default());
    suite.errors = Some(parse_attr::count(start, "errors").unwrap_or_default());
    suite.failures = Some(parse_attr::count(start, "failures").unwrap_or_default());
    suite.skipped = Some(parse_attr::count(start, "skipped").unwrap_or_default());
    Ok(suite)
}

/// Parses one `testcase` element. A self-closing case returns immediately
/// with its default Passed status.
fn parse_case<R: BufRead>(
    cursor: &mut TokenCursor<R>,
    start: &BytesStart,
    self_closing: bool,
) -> Result<TestCase, ParseError> {
    require_attributes(start, CASE_REQUIRED_ATTRS)?;

    let mut test_case = TestCase::new(
        parse_attr::name(start).unwrap_or_default(),
        parse_attr::classname(start).unwrap_or_default(),
    );
    test_case.duration = Some(parse_attr::time(start).unwrap_or_default());
    test_case.assertions = Some(parse_attr::count(start, "assertions").unwrap_or_default());

    if self_closing {
        return Ok(test_case);
    }

    loop {
        match cursor.advance() {
            Event::Start(e) => match e.name().as_ref() {
                TAG_FAILURE => {
                    let message = read_text(cursor, TAG_FAILURE, false).unwrap_or_default();
                    test_case.mark_failed(message);
                }
                TAG_SKIPPED => test_case.mark_skipped(),
                TAG_PROPERTIES => test_case.properties = parse_properties(cursor),
                TAG_SYSTEM_OUT => test_case.system_out = read_text(cursor, TAG_SYSTEM_OUT, true),
                TAG_SYSTEM_ERR => test_case.system_err = read_text(cursor, TAG_SYSTEM_ERR, true),
                _ => (),
            },
            Event::Empty(e) => match e.name().as_ref() {
                TAG_FAILURE => test_case.mark_failed(String::new()),
                TAG_SKIPPED => test_case.mark_skipped(),
                _ => (),
            },
            Event::End(e) if e.name().as_ref() == TAG_TEST_CASE => return Ok(test_case),
            Event::Eof => return Ok(test_case),
            _ => (),
        }
    }
}

/// Collects `property` name/value pairs until the closing `properties`
/// tag. Properties missing either attribute are skipped silently.
fn parse_properties<R: BufRead>(cursor: &mut TokenCursor<R>) -> HashMap<String, String> {
    let mut properties = HashMap::new();

    loop {
        match cursor.advance() {
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == TAG_PROPERTY => {
                if let (Some(name), Some(value)) = (
                    parse_attr::string(&e, "name"),
                    parse_attr::string(&e, "value"),
                ) {
                    properties.insert(name, value);
                }
            }
            Event::End(e) if e.name().as_ref() == TAG_PROPERTIES => return properties,
            Event::Eof => return properties,
            _ => (),
        }
    }
}

/// Reads the text content of the element just opened, consuming events
/// through its end tag, and trims surrounding whitespace. Only the first
/// text or CDATA chunk is kept. `decode_entities` additionally resolves
/// HTML character entities; captured output streams get this treatment,
/// failure messages do not.
fn read_text<R: BufRead>(
    cursor: &mut TokenCursor<R>,
    tag: &[u8],
    decode_entities: bool,
) -> Option<String> {
    let mut value = None;

    loop {
        match cursor.advance() {
            Event::Text(e) => {
                if value.is_some() {
                    continue;
                }
                let unescaped = if decode_entities {
                    e.unescape_with(resolve_html5_entity)
                } else {
                    e.unescape()
                };
                match unescaped {
                    Ok(text) => value = Some(text.trim().to_string()),
                    Err(error) => cursor.report_syntax(error.to_string()),
                }
            }
            Event::CData(e) => {
                if value.is_none() {
                    value = Some(String::from_utf8_lossy(&e).trim().to_string());
                }
            }
            Event::End(e) if e.name().as_ref() == tag => return value,
            Event::Eof => return value,
            _ => (),
        }
    }
}

/// Confirms the required attributes are present and non-empty on the open
/// tag, checked in the caller-specified order, so an element missing
/// several reports the first.
fn require_attributes(e: &BytesStart, required: &[&str]) -> Result<(), ParseError> {
    for attribute in required {
        let present = parse_attr::string(e, attribute).is_some_and(|value| !value.is_empty());
        if !present {
            return Err(ParseError::MissingAttribute {
                attribute: (*attribute).to_string(),
                element: element_context(e),
            });
        }
    }
    Ok(())
}

/// Reconstructs the open tag as written, for error messages.
fn element_context(e: &BytesStart) -> String {
    format!("<{}>", String::from_utf8_lossy(e))
}

/// Forward-only cursor over the XML token stream, scoped to one `parse`
/// call.
///
/// The cursor owns the well-formedness accumulator: reader errors are
/// recorded rather than propagated so a damaged document can still be
/// read to the end, and the collected problems are checked exactly once
/// after the traversal loop. quick-xml reports a clean `Eof` even when
/// elements are still open, so the cursor keeps its own open-element
/// stack to catch truncation.
struct TokenCursor<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    problems: Vec<XmlProblem>,
    open_elements: Vec<String>,
    element_seen: bool,
    finished: bool,
}

impl<R: BufRead> TokenCursor<R> {
    fn new(input: R) -> Self {
        let mut reader = Reader::from_reader(input);
        reader.config_mut().trim_text(true);

        Self {
            reader,
            buf: Vec::new(),
            problems: Vec::new(),
            open_elements: Vec::new(),
            element_seen: false,
            finished: false,
        }
    }

    /// Next event, owned. Reader errors are recorded and skipped; if the
    /// reader cannot advance past one, the stream is treated as ended.
    fn advance(&mut self) -> Event<'static> {
        loop {
            self.buf.clear();
            let position = self.reader.buffer_position() as u64;
            match self.reader.read_event_into(&mut self.buf) {
                Ok(Event::Eof) => {
                    self.finish();
                    return Event::Eof;
                }
                Ok(event) => {
                    let event = event.into_owned();
                    self.track(&event);
                    return event;
                }
                Err(XmlError::IllFormed(IllFormedError::MissingEndTag(_))) => {
                    // the open-element stack already covers this one
                    self.finish();
                    return Event::Eof;
                }
                Err(error) => {
                    tracing::warn!("XML problem at byte {}: {}", position, error);
                    self.problems.push(XmlProblem::Syntax {
                        position,
                        message: error.to_string(),
                    });
                    if self.reader.buffer_position() as u64 == position {
                        self.finish();
                        return Event::Eof;
                    }
                }
            }
        }
    }

    fn track(&mut self, event: &Event) {
        match event {
            Event::Start(e) => {
                self.element_seen = true;
                self.open_elements
                    .push(String::from_utf8_lossy(e.name().as_ref()).into_owned());
            }
            Event::End(_) => {
                self.open_elements.pop();
            }
            Event::Empty(_) => self.element_seen = true,
            _ => (),
        }
    }

    fn report_syntax(&mut self, message: String) {
        let position = self.reader.buffer_position() as u64;
        tracing::warn!("XML problem at byte {}: {}", position, message);
        self.problems.push(XmlProblem::Syntax { position, message });
    }

    /// End-of-stream bookkeeping, run once: a document without a root
    /// element and any still-open elements are both well-formedness
    /// problems.
    fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;

        if !self.element_seen {
            self.problems.push(XmlProblem::EmptyDocument);
        }
        for element in self.open_elements.drain(..).rev() {
            self.problems.push(XmlProblem::UnclosedElement { element });
        }
    }

    fn into_problems(self) -> Vec<XmlProblem> {
        self.problems
    }
}

mod parse_attr {
    use chrono::{DateTime, FixedOffset};
    use quick_xml::events::BytesStart;
    use std::str::FromStr;

    use crate::date_parser;

    pub fn name(e: &BytesStart) -> Option<String> {
        string(e, "name")
    }

    pub fn classname(e: &BytesStart) -> Option<String> {
        string(e, "classname")
    }

    pub fn time(e: &BytesStart) -> Option<f64> {
        numeric(e, "time").filter(|seconds| *seconds >= 0.0)
    }

    pub fn count(e: &BytesStart, attr_name: &str) -> Option<usize> {
        numeric(e, attr_name)
    }

    pub fn timestamp(e: &BytesStart) -> Option<DateTime<FixedOffset>> {
        string(e, "timestamp").and_then(|value| date_parser::parse_timestamp(&value))
    }

    pub fn string(e: &BytesStart, attr_name: &str) -> Option<String> {
        e.try_get_attribute(attr_name)
            .ok()
            .flatten()
            .and_then(|attr| attr.unescape_value().ok())
            .map(|value| value.into_owned())
    }

    fn numeric<T: FromStr>(e: &BytesStart, attr_name: &str) -> Option<T> {
        string(e, attr_name).and_then(|value| value.parse::<T>().ok())
    }
}
