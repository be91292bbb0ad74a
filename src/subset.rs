//! Parser for the per-axis subset grammar.
//!
//! Each repeated `subset` parameter carries one clause:
//!
//! ```text
//! clause := axis_name ["," srid] "(" min ["," max] ")"
//! ```
//!
//! e.g. `x(10,20)`, `t(5)`, `Long,4326(-54,-50)`. The parser is an explicit
//! character-driven state machine that reports the offending character position on
//! malformed input. It knows nothing about any array's dimensions; classification and
//! validation of the resulting clips happen in the query planner.

use hashbrown::HashSet;

use crate::error::GeosliceError;

/// A client-requested restriction on one array axis.
///
/// An absent `max` means the clip selects the single point `min`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AxisClip {
    /// Axis name as written by the client
    pub name: String,
    /// Optional reference system for the bounds
    pub srid: Option<String>,
    /// Lower bound, verbatim
    pub min: String,
    /// Optional upper bound, verbatim
    pub max: Option<String>,
}

/// Scanner states, in the order the grammar visits them.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum State {
    /// Accumulating the axis name, terminated by `(` or `,`
    Name,
    /// Accumulating the srid token, terminated by `(`
    Srid,
    /// Accumulating the lower bound, terminated by `,` or `)`
    Min,
    /// Accumulating the upper bound, terminated by `)`
    Max,
    /// Clause complete; any further input is an error
    Done,
}

/// Parse a single subset clause.
///
/// # Arguments
///
/// * `clause`: One raw `subset` parameter value
pub fn parse_clause(clause: &str) -> Result<AxisClip, GeosliceError> {
    let fail = |position: usize, reason: &'static str| GeosliceError::SubsetSyntax {
        clause: clause.to_string(),
        position,
        reason,
    };

    let mut state = State::Name;
    let mut name = String::new();
    let mut srid = String::new();
    let mut min = String::new();
    let mut max = String::new();
    let mut has_srid = false;
    let mut has_max = false;

    for (position, c) in clause.char_indices() {
        match state {
            State::Name => match c {
                '(' => {
                    if name.is_empty() {
                        return Err(fail(position, "axis name is empty"));
                    }
                    state = State::Min;
                }
                ',' => {
                    if name.is_empty() {
                        return Err(fail(position, "axis name is empty"));
                    }
                    has_srid = true;
                    state = State::Srid;
                }
                _ => name.push(c),
            },
            State::Srid => match c {
                '(' => {
                    if srid.is_empty() {
                        return Err(fail(position, "srid is empty"));
                    }
                    state = State::Min;
                }
                ',' => return Err(fail(position, "unexpected `,` in srid")),
                _ => srid.push(c),
            },
            State::Min => match c {
                ',' => {
                    if min.is_empty() {
                        return Err(fail(position, "lower bound is empty"));
                    }
                    has_max = true;
                    state = State::Max;
                }
                ')' => {
                    if min.is_empty() {
                        return Err(fail(position, "lower bound is empty"));
                    }
                    state = State::Done;
                }
                _ => min.push(c),
            },
            State::Max => match c {
                ')' => {
                    if max.is_empty() {
                        return Err(fail(position, "upper bound is empty"));
                    }
                    state = State::Done;
                }
                ',' => return Err(fail(position, "unexpected `,` in upper bound")),
                _ => max.push(c),
            },
            State::Done => return Err(fail(position, "unexpected input after `)`")),
        }
    }

    if state != State::Done {
        return Err(fail(clause.len(), "unexpected end of input"));
    }

    Ok(AxisClip {
        name,
        srid: has_srid.then_some(srid),
        min,
        max: has_max.then_some(max),
    })
}

/// Parse all subset clauses of one request.
///
/// Fails on the first malformed clause, or if any axis name appears twice.
///
/// # Arguments
///
/// * `clauses`: The raw repeated `subset` parameter values, in request order
pub fn parse_request(clauses: &[String]) -> Result<Vec<AxisClip>, GeosliceError> {
    let mut clips = Vec::with_capacity(clauses.len());
    let mut seen = HashSet::with_capacity(clauses.len());
    for clause in clauses {
        let clip = parse_clause(clause)?;
        if !seen.insert(clip.name.clone()) {
            return Err(GeosliceError::DuplicateAxis { axis: clip.name });
        }
        clips.push(clip);
    }
    Ok(clips)
}
