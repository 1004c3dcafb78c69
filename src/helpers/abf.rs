//! Reader for `.abf` batch files.
//!
//! A batch file holds one or more credential blocks, each followed by the
//! timesheet rows to submit for that account:
//!
//! ```text
//! % comment lines start with a percent sign
//! START ENTRY;
//! USERNAME;john.doe;
//! PASSWORD;FooBar18;
//! START TIMESHEET;
//! 2019;8;19;558;1;
//! 2019;8;19;13619;7;
//! END TIMESHEET;
//! END ENTRY;
//! ```
//!
//! Lines outside a block that are not `START ENTRY` are skipped. Inside a
//! block every marker must appear exactly where the grammar expects it.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::{debug, error, info, warn};

use crate::error::AbfError;
use crate::models::abf::{BatchEntry, TimesheetRow};

pub const DEFAULT_MAX_TIMESHEET_ROWS: usize = 1000;

const COMMENT_PREFIX: char = '%';
const FIELD_SEPARATOR: char = ';';

const START_ENTRY: &str = "START ENTRY";
const USERNAME: &str = "USERNAME";
const PASSWORD: &str = "PASSWORD";
const START_TIMESHEET: &str = "START TIMESHEET";
const END_TIMESHEET: &str = "END TIMESHEET";
const END_ENTRY: &str = "END ENTRY";

const ROW_FIELDS: [&str; 5] = ["year", "month", "day", "task_id", "hours"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserOptions {
    pub max_timesheet_rows_per_entry: usize,
    /// When false, a block whose `END TIMESHEET` is not followed by
    /// `END ENTRY` is dropped with a warning instead of failing the parse.
    pub strict_end_entry: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            max_timesheet_rows_per_entry: DEFAULT_MAX_TIMESHEET_ROWS,
            strict_end_entry: true,
        }
    }
}

/// Batch file reader holding the open file until [`AbfParser::close`].
///
/// [`AbfParser::read`] consumes the file in one forward pass. A second call
/// returns no entries; reopen the file to parse it again.
#[derive(Debug)]
pub struct AbfParser {
    path: PathBuf,
    reader: Option<BufReader<File>>,
    options: ParserOptions,
}

impl AbfParser {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, AbfError> {
        let path = path.as_ref().to_path_buf();
        info!("Opening batch file: {}", path.display());

        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) => {
                error!("Failed to open batch file {}: {}", path.display(), e);
                return Err(AbfError::FileOpen { path, source: e });
            }
        };

        let metadata = match file.metadata() {
            Ok(metadata) => metadata,
            Err(e) => {
                error!("Failed to stat batch file {}: {}", path.display(), e);
                return Err(AbfError::FileOpen { path, source: e });
            }
        };

        if metadata.is_dir() {
            error!("Batch file path is a directory: {}", path.display());
            return Err(AbfError::FileOpen {
                path,
                source: io::Error::new(io::ErrorKind::InvalidInput, "path is a directory"),
            });
        }

        Ok(Self {
            path,
            reader: Some(BufReader::new(file)),
            options: ParserOptions::default(),
        })
    }

    pub fn with_options(mut self, options: ParserOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_max_timesheet_rows(mut self, max: usize) -> Self {
        self.options.max_timesheet_rows_per_entry = max;
        self
    }

    pub fn options(&self) -> ParserOptions {
        self.options
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_closed(&self) -> bool {
        self.reader.is_none()
    }

    /// Reads the rest of the file and returns every complete entry in file order.
    pub fn read(&mut self) -> Result<Vec<BatchEntry>, AbfError> {
        let Some(reader) = self.reader.as_mut() else {
            error!("Read attempted on closed batch file: {}", self.path.display());
            return Err(AbfError::UseAfterClose {
                path: self.path.clone(),
            });
        };

        let mut text = String::new();
        if let Err(e) = reader.read_to_string(&mut text) {
            error!("Failed to read batch file {}: {}", self.path.display(), e);
            return Err(AbfError::Read {
                path: self.path.clone(),
                source: e,
            });
        }

        info!(
            "Parsing batch file {} ({} bytes)",
            self.path.display(),
            text.len()
        );

        match parse_str(&text, self.options) {
            Ok(entries) => {
                info!(
                    "Parsed {} entries from {}",
                    entries.len(),
                    self.path.display()
                );
                Ok(entries)
            }
            Err(e) => {
                error!("Failed to parse batch file {}: {}", self.path.display(), e);
                Err(e)
            }
        }
    }

    /// Releases the file handle. Safe to call more than once.
    pub fn close(&mut self) {
        if self.reader.take().is_some() {
            info!("Closed batch file: {}", self.path.display());
        }
    }
}

/// Parses batch file text that is already in memory.
pub fn parse_str(text: &str, options: ParserOptions) -> Result<Vec<BatchEntry>, AbfError> {
    let mut cursor = Cursor::new(text);
    let mut entries = Vec::new();

    while let Some(line) = cursor.next_line() {
        if line.marker() != START_ENTRY {
            debug!("Skipping line {} outside of an entry", line.number);
            continue;
        }

        if let Some(entry) = parse_entry(&mut cursor, &options)? {
            debug!("Parsed entry {}", entry);
            entries.push(entry);
        }
    }

    Ok(entries)
}

struct Line<'a> {
    number: usize,
    fields: Vec<&'a str>,
}

impl<'a> Line<'a> {
    fn marker(&self) -> &'a str {
        self.fields.first().copied().unwrap_or_default()
    }

    fn field(&self, index: usize) -> Option<&'a str> {
        self.fields.get(index).copied()
    }
}

/// Forward-only cursor over the non-comment lines of a file.
struct Cursor<'a> {
    lines: Vec<Line<'a>>,
    pos: usize,
    /// Reported for errors hit at end of input.
    end_line: usize,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        let mut end_line = 1;
        let lines = text
            .lines()
            .enumerate()
            .inspect(|(index, _)| end_line = index + 2)
            .filter(|(_, line)| !line.starts_with(COMMENT_PREFIX))
            .map(|(index, line)| Line {
                number: index + 1,
                fields: line.split(FIELD_SEPARATOR).collect(),
            })
            .collect();

        Self {
            lines,
            pos: 0,
            end_line,
        }
    }

    fn next_line(&mut self) -> Option<&Line<'a>> {
        let line = self.lines.get(self.pos)?;
        self.pos += 1;
        Some(line)
    }

    fn expect_marker(&mut self, marker: &str, previous: &str) -> Result<&Line<'a>, AbfError> {
        let end_line = self.end_line;
        match self.next_line() {
            Some(line) if line.marker() == marker => Ok(line),
            Some(line) => Err(AbfError::malformed(
                line.number,
                format!("expected {marker} after {previous}"),
            )),
            None => Err(AbfError::malformed(
                end_line,
                format!("expected {marker} after {previous}, found end of input"),
            )),
        }
    }
}

fn parse_entry(
    cursor: &mut Cursor<'_>,
    options: &ParserOptions,
) -> Result<Option<BatchEntry>, AbfError> {
    let line = cursor.expect_marker(USERNAME, START_ENTRY)?;
    let username = match line.field(1) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => return Err(AbfError::malformed(line.number, "missing value for USERNAME")),
    };

    let line = cursor.expect_marker(PASSWORD, USERNAME)?;
    let password = line
        .field(1)
        .ok_or_else(|| AbfError::malformed(line.number, "missing value for PASSWORD"))?
        .to_string();

    cursor.expect_marker(START_TIMESHEET, PASSWORD)?;
    let timesheet_rows = parse_timesheet(cursor, options.max_timesheet_rows_per_entry)?;

    let end_line = cursor.end_line;
    let (number, closed) = match cursor.next_line() {
        Some(line) => (line.number, line.marker() == END_ENTRY),
        None => (end_line, false),
    };

    if closed {
        return Ok(Some(BatchEntry {
            username,
            password,
            timesheet_rows,
        }));
    }

    if options.strict_end_entry {
        return Err(AbfError::malformed(
            number,
            "expected END ENTRY after END TIMESHEET",
        ));
    }

    warn!(
        "Dropping entry for {} with {} rows: END ENTRY missing at line {}",
        username,
        timesheet_rows.len(),
        number
    );
    Ok(None)
}

fn parse_timesheet(cursor: &mut Cursor<'_>, limit: usize) -> Result<Vec<TimesheetRow>, AbfError> {
    let mut rows = Vec::new();

    loop {
        let end_line = cursor.end_line;
        let Some(line) = cursor.next_line() else {
            return Err(AbfError::RowLimitExceeded {
                line: end_line,
                limit,
            });
        };

        if line.marker() == END_TIMESHEET {
            return Ok(rows);
        }

        if rows.len() >= limit {
            return Err(AbfError::RowLimitExceeded {
                line: line.number,
                limit,
            });
        }

        rows.push(parse_row(line)?);
    }
}

fn parse_row(line: &Line<'_>) -> Result<TimesheetRow, AbfError> {
    Ok(TimesheetRow {
        year: numeric_field(line, 0)?,
        month: numeric_field(line, 1)?,
        day: numeric_field(line, 2)?,
        task_id: numeric_field(line, 3)?,
        hours: numeric_field(line, 4)?,
    })
}

fn numeric_field<T: FromStr>(line: &Line<'_>, index: usize) -> Result<T, AbfError> {
    let field = ROW_FIELDS[index];
    let raw = line.field(index).unwrap_or_default();

    raw.trim().parse().map_err(|_| AbfError::NumericField {
        line: line.number,
        field,
        value: raw.to_string(),
    })
}
