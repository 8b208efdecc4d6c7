// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Alternatives query report parsing.
//!
//! The alternatives management executable describes a group through its
//! query verb. The output is a line oriented report with a fixed field order:
//!
//! ```text
//! Name: pager
//! Link: /usr/bin/pager
//! Slaves:
//!  pager.1.gz /usr/share/man/man1/pager.1.gz
//! Status: auto
//! Best: /usr/bin/less
//! Value: /usr/bin/less
//!
//! Alternative: /usr/bin/less
//! Priority: 77
//! Slaves:
//!  pager.1.gz /usr/share/man/man1/less.1.gz
//! ```
//!
//! The header block is always present. Each candidate comes afterwards in
//! its own block separated by a blank line. Both `Slaves:` blocks are
//! optional. Slave entries start with exactly one space, followed by the
//! slave name, one space, and the rest of the line as the path.
//!
//! # Parser Design
//!
//! Parsing is driven by a finite state machine over [`ParserState`]. Each
//! transition either consumes the current line, or hands the same line over
//! to the next state without consuming it. Only the optional blocks ever
//! decline a line, and they always hand it to a state further along the
//! report. Thus every line gets consumed after at most two hand overs.

use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter, Result as FmtResult},
    num::ParseIntError,
    str::FromStr,
};
use tracing::trace;

/// Structured form of one alternatives group.
///
/// Immutable once parsed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GroupReport {
    name: String,
    primary_link: String,
    slave_names: Vec<String>,
    slave_links: Vec<String>,
    status: String,
    best_value: String,
    current_value: String,
    best_index: Option<usize>,
    current_index: Option<usize>,
    candidates: Vec<Candidate>,
}

impl GroupReport {
    /// Name of the group.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Location the group provides.
    pub fn primary_link(&self) -> &str {
        &self.primary_link
    }

    /// Names of secondary links, index aligned with [`Self::slave_links`].
    pub fn slave_names(&self) -> &[String] {
        &self.slave_names
    }

    /// Locations of secondary links, index aligned with [`Self::slave_names`].
    pub fn slave_links(&self) -> &[String] {
        &self.slave_links
    }

    /// Iterate over `(name, link)` pairs of secondary links.
    pub fn slaves(&self) -> impl Iterator<Item = (&str, &str)> {
        self.slave_names
            .iter()
            .map(String::as_str)
            .zip(self.slave_links.iter().map(String::as_str))
    }

    /// Selection status, usually "auto" or "manual".
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Check if a candidate was pinned by the user.
    pub fn is_manual(&self) -> bool {
        self.status == "manual"
    }

    /// Value that would win automatic selection.
    pub fn best_value(&self) -> &str {
        &self.best_value
    }

    /// Value currently selected, may be "none".
    pub fn current_value(&self) -> &str {
        &self.current_value
    }

    /// Position of best value among candidates.
    pub fn best_index(&self) -> Option<usize> {
        self.best_index
    }

    /// Position of current value among candidates.
    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    /// Candidates in report order.
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }
}

impl FromStr for GroupReport {
    type Err = ParseError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        parse(data.lines())
    }
}

impl Display for GroupReport {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        writeln!(fmt, "Name: {}", self.name)?;
        writeln!(fmt, "Link: {}", self.primary_link)?;
        if !self.slave_names.is_empty() {
            writeln!(fmt, "Slaves:")?;
            for (name, link) in self.slaves() {
                writeln!(fmt, " {name} {link}")?;
            }
        }
        writeln!(fmt, "Status: {}", self.status)?;
        writeln!(fmt, "Best: {}", self.best_value)?;
        writeln!(fmt, "Value: {}", self.current_value)?;

        for candidate in &self.candidates {
            writeln!(fmt)?;
            writeln!(fmt, "Alternative: {}", candidate.value)?;
            writeln!(fmt, "Priority: {}", candidate.priority)?;
            if !candidate.secondary_values.is_empty() {
                writeln!(fmt, "Slaves:")?;
                for (index, value) in &candidate.secondary_values {
                    writeln!(fmt, " {} {value}", self.slave_names[*index])?;
                }
            }
        }

        Ok(())
    }
}

/// One concrete provider of a group.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Candidate {
    value: String,
    priority: u32,
    secondary_values: BTreeMap<usize, String>,
}

impl Candidate {
    /// Path of the provider.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Priority used for automatic selection.
    pub fn priority(&self) -> u32 {
        self.priority
    }

    /// Secondary value for slave at target index, if the report gave one.
    pub fn secondary_value(&self, slave_index: usize) -> Option<&str> {
        self.secondary_values.get(&slave_index).map(String::as_str)
    }

    /// Sparse mapping of slave index to secondary value.
    pub fn secondary_values(&self) -> &BTreeMap<usize, String> {
        &self.secondary_values
    }
}

/// States of the report parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    Name,
    Link,
    MaybeSlavesHeader,
    SlaveEntry,
    Status,
    Best,
    Value,
    MaybeAltStart,
    AltValue,
    AltPriority,
    MaybeAltSlavesHeader,
    MaybeAltSlaveEntry,
}

impl ParserState {
    /// Check if input may end while in this state.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::MaybeAltStart | Self::MaybeAltSlavesHeader | Self::MaybeAltSlaveEntry
        )
    }
}

impl Display for ParserState {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            Self::Name => "NAME",
            Self::Link => "LINK",
            Self::MaybeSlavesHeader => "MAYBE_SLAVES_HEADER",
            Self::SlaveEntry => "SLAVE_ENTRY",
            Self::Status => "STATUS",
            Self::Best => "BEST",
            Self::Value => "VALUE",
            Self::MaybeAltStart => "MAYBE_ALT_START",
            Self::AltValue => "ALT_VALUE",
            Self::AltPriority => "ALT_PRIORITY",
            Self::MaybeAltSlavesHeader => "MAYBE_ALT_SLAVES_HEADER",
            Self::MaybeAltSlaveEntry => "MAYBE_ALT_SLAVE_ENTRY",
        };
        fmt.write_str(name)
    }
}

/// Outcome of feeding one line to one state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Transition {
    next: ParserState,
    consumed: bool,
}

impl Transition {
    fn consume(next: ParserState) -> Self {
        Self { next, consumed: true }
    }

    fn redispatch(next: ParserState) -> Self {
        Self { next, consumed: false }
    }
}

/// Parse query report into a [`GroupReport`].
///
/// # Errors
///
/// - Return [`ParseError::MalformedField`] if a required field is missing or
///   mislabeled.
/// - Return [`ParseError::MissingSeparator`] if alternative blocks are not
///   separated by a blank line.
/// - Return [`ParseError::MalformedPriority`] if a priority is not a
///   non-negative integer.
/// - Return [`ParseError::DuplicateSlave`] if a slave name repeats.
/// - Return [`ParseError::UnexpectedEof`] if input ends mid report.
pub fn parse(lines: impl IntoIterator<Item = impl AsRef<str>>) -> Result<GroupReport> {
    let mut report = GroupReport::default();
    let mut state = ParserState::Name;

    for (index, line) in lines.into_iter().enumerate() {
        let line = line.as_ref();
        let number = index + 1;
        loop {
            let transition = step(state, number, line, &mut report)?;
            trace!("line {number} {state} -> {}", transition.next);
            state = transition.next;
            if transition.consumed {
                break;
            }
        }
    }

    if !state.is_terminal() {
        return Err(ParseError::UnexpectedEof { state });
    }

    Ok(report)
}

fn step(
    state: ParserState,
    number: usize,
    line: &str,
    report: &mut GroupReport,
) -> Result<Transition> {
    use ParserState::*;

    let transition = match state {
        Name => {
            report.name = field(line, "Name", number)?;
            Transition::consume(Link)
        }
        Link => {
            report.primary_link = field(line, "Link", number)?;
            Transition::consume(MaybeSlavesHeader)
        }
        MaybeSlavesHeader => match line {
            "Slaves:" => Transition::consume(SlaveEntry),
            _ => Transition::redispatch(Status),
        },
        SlaveEntry => match slave_entry(line) {
            Some((name, link)) => {
                if report.slave_names.iter().any(|known| known == name) {
                    return Err(ParseError::DuplicateSlave {
                        number,
                        name: name.into(),
                    });
                }
                report.slave_names.push(name.into());
                report.slave_links.push(link.into());
                Transition::consume(SlaveEntry)
            }
            None => Transition::redispatch(Status),
        },
        Status => {
            report.status = field(line, "Status", number)?;
            Transition::consume(Best)
        }
        Best => {
            report.best_value = field(line, "Best", number)?;
            Transition::consume(Value)
        }
        Value => {
            report.current_value = field(line, "Value", number)?;
            Transition::consume(MaybeAltStart)
        }
        MaybeAltStart => {
            if !line.is_empty() {
                return Err(ParseError::MissingSeparator {
                    number,
                    line: line.into(),
                });
            }
            Transition::consume(AltValue)
        }
        AltValue => {
            let value = field(line, "Alternative", number)?;
            let index = report.candidates.len();
            if value == report.best_value {
                report.best_index = Some(index);
            }
            if value == report.current_value {
                report.current_index = Some(index);
            }
            report.candidates.push(Candidate {
                value,
                ..Default::default()
            });
            Transition::consume(AltPriority)
        }
        AltPriority => {
            let raw = field(line, "Priority", number)?;
            let malformed = |source| ParseError::MalformedPriority {
                source,
                number,
                value: raw.clone(),
            };
            // INVARIANT: Digits only, no sign.
            if !raw.bytes().all(|byte| byte.is_ascii_digit()) {
                return Err(malformed(None));
            }
            let priority = raw.parse::<u32>().map_err(|err| malformed(Some(err)))?;
            // INVARIANT: ALT_VALUE always pushed a candidate before we get here.
            if let Some(candidate) = report.candidates.last_mut() {
                candidate.priority = priority;
            }
            Transition::consume(MaybeAltSlavesHeader)
        }
        MaybeAltSlavesHeader => match line {
            "Slaves:" => Transition::consume(MaybeAltSlaveEntry),
            _ => Transition::redispatch(MaybeAltStart),
        },
        MaybeAltSlaveEntry => match slave_entry(line) {
            Some((name, value)) => {
                let slave = report.slave_names.iter().position(|known| known == name);
                if let (Some(slave), Some(candidate)) = (slave, report.candidates.last_mut()) {
                    candidate.secondary_values.insert(slave, value.into());
                }
                Transition::consume(MaybeAltSlaveEntry)
            }
            None => Transition::redispatch(MaybeAltStart),
        },
    };

    Ok(transition)
}

fn field(line: &str, label: &'static str, number: usize) -> Result<String> {
    line.strip_prefix(label)
        .and_then(|rest| rest.strip_prefix(": "))
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
        .ok_or_else(|| ParseError::MalformedField {
            field: label,
            number,
            line: line.into(),
        })
}

fn slave_entry(line: &str) -> Option<(&str, &str)> {
    let (name, link) = line.strip_prefix(' ')?.split_once(' ')?;
    if name.is_empty() || link.is_empty() {
        return None;
    }

    Some((name, link))
}

/// Report parsing error types.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Required field is missing or mislabeled.
    #[error("malformed {field} field at line {number}: {line:?}")]
    MalformedField {
        field: &'static str,
        number: usize,
        line: String,
    },

    /// Alternative blocks must be separated by a blank line.
    #[error("expected blank separator at line {number}: {line:?}")]
    MissingSeparator { number: usize, line: String },

    /// Priority is not a non-negative integer.
    #[error("malformed Priority field at line {number}: {value:?}")]
    MalformedPriority {
        #[source]
        source: Option<ParseIntError>,
        number: usize,
        value: String,
    },

    /// Slave name listed twice in the header block.
    #[error("duplicate slave {name:?} at line {number}")]
    DuplicateSlave { number: usize, name: String },

    /// Input ended before the report was complete.
    #[error("unexpected end of input in state {state}")]
    UnexpectedEof { state: ParserState },
}

/// Friendly result alias :3
pub type Result<T, E = ParseError> = std::result::Result<T, E>;
