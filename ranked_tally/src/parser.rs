//! Parser for the comma-delimited ranked-ballot dataset format.
//!
//! The format is line-oriented: a candidate-count header, one line per
//! candidate, one metadata line, then one line per distinct ballot pattern.
//! Parsing is all-or-nothing: any malformed line fails the whole dataset and
//! no partial [`Election`] is returned.

use log::{debug, warn};

use std::error::Error;
use std::fmt::Display;

use crate::model::{Ballot, Candidate, Election, ElectionMeta};

/// Errors raised while parsing a dataset.
///
/// Line numbers are 1-based over the whole input, the header being line 1.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum ParseError {
    /// The input had no lines at all.
    EmptyInput,
    /// The header line is not a valid candidate count.
    InvalidHeader { line: String },
    /// A candidate line is missing its comma or its number is not an integer.
    MalformedCandidate { lineno: usize, line: String },
    /// A candidate line is numbered out of file order.
    CandidateOutOfOrder {
        lineno: usize,
        expected: u32,
        found: u32,
    },
    /// The metadata line does not hold exactly three integers.
    MalformedMetadata { lineno: usize, line: String },
    /// A ballot line has a non-positive weight, a non-integer preference
    /// token, or an unterminated indifference group.
    MalformedBallot { lineno: usize, line: String },
    /// The input ended before the candidate and metadata lines were consumed.
    TruncatedInput { expected: usize, found: usize },
}

impl Error for ParseError {}

impl Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::EmptyInput => write!(f, "the dataset is empty"),
            ParseError::InvalidHeader { line } => {
                write!(f, "invalid candidate count header: {:?}", line)
            }
            ParseError::MalformedCandidate { lineno, line } => {
                write!(f, "malformed candidate line {}: {:?}", lineno, line)
            }
            ParseError::CandidateOutOfOrder {
                lineno,
                expected,
                found,
            } => write!(
                f,
                "candidate line {} is numbered {} where {} was expected",
                lineno, found, expected
            ),
            ParseError::MalformedMetadata { lineno, line } => {
                write!(f, "malformed metadata line {}: {:?}", lineno, line)
            }
            ParseError::MalformedBallot { lineno, line } => {
                write!(f, "malformed ballot line {}: {:?}", lineno, line)
            }
            ParseError::TruncatedInput { expected, found } => write!(
                f,
                "the dataset ended after {} lines where at least {} were expected",
                found, expected
            ),
        }
    }
}

/// Parses a dataset from an ordered stream of text lines.
///
/// The caller owns the acquisition of the underlying source; this function
/// only consumes lines.
pub fn parse_lines<I, S>(lines: I) -> Result<Election, ParseError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut lines = lines.into_iter();

    let header = lines.next().ok_or(ParseError::EmptyInput)?;
    let header = header.as_ref();
    let num_candidates: usize = header
        .trim()
        .parse()
        .map_err(|_| ParseError::InvalidHeader {
            line: header.to_string(),
        })?;

    let mut candidates: Vec<Candidate> = Vec::with_capacity(num_candidates);
    for expected in 1..=num_candidates {
        let lineno = expected + 1;
        let line = lines.next().ok_or(ParseError::TruncatedInput {
            expected: num_candidates + 2,
            found: lineno - 1,
        })?;
        candidates.push(parse_candidate_line(line.as_ref(), lineno, expected as u32)?);
    }

    let meta_lineno = num_candidates + 2;
    let meta_line = lines.next().ok_or(ParseError::TruncatedInput {
        expected: meta_lineno,
        found: meta_lineno - 1,
    })?;
    let meta = parse_meta_line(meta_line.as_ref(), meta_lineno)?;

    let mut ballots: Vec<Ballot> = Vec::new();
    for (offset, line) in lines.enumerate() {
        let line = line.as_ref();
        // Trailing or stray blank lines carry no ballot.
        if line.trim().is_empty() {
            continue;
        }
        ballots.push(parse_ballot_line(line, meta_lineno + 1 + offset)?);
    }

    debug!(
        "parse_lines: {} candidates, {} ballot patterns",
        candidates.len(),
        ballots.len()
    );
    check_declared_meta(&meta, &ballots);

    Ok(Election {
        candidates,
        ballots,
        meta,
    })
}

/// Parses a whole dataset held in memory.
pub fn parse_str(input: &str) -> Result<Election, ParseError> {
    parse_lines(input.lines())
}

fn parse_candidate_line(line: &str, lineno: usize, expected: u32) -> Result<Candidate, ParseError> {
    let malformed = || ParseError::MalformedCandidate {
        lineno,
        line: line.to_string(),
    };
    let (number, name) = line.split_once(',').ok_or_else(malformed)?;
    let number: u32 = number.trim().parse().map_err(|_| malformed())?;
    if number != expected {
        return Err(ParseError::CandidateOutOfOrder {
            lineno,
            expected,
            found: number,
        });
    }
    Ok(Candidate {
        number,
        name: name.trim().to_string(),
    })
}

fn parse_meta_line(line: &str, lineno: usize) -> Result<ElectionMeta, ParseError> {
    let malformed = || ParseError::MalformedMetadata {
        lineno,
        line: line.to_string(),
    };
    let fields: Vec<u64> = line
        .split(',')
        .map(|field| field.trim().parse::<u64>())
        .collect::<Result<_, _>>()
        .map_err(|_| malformed())?;
    match fields.as_slice() {
        &[voter_count, total_vote_weight, unique_ballot_patterns] => Ok(ElectionMeta {
            voter_count,
            total_vote_weight,
            unique_ballot_patterns,
        }),
        _ => Err(malformed()),
    }
}

fn parse_ballot_line(line: &str, lineno: usize) -> Result<Ballot, ParseError> {
    let malformed = || ParseError::MalformedBallot {
        lineno,
        line: line.trim().to_string(),
    };
    let (weight, preferences) = line.trim().split_once(',').ok_or_else(malformed)?;
    let weight: u64 = weight.trim().parse().map_err(|_| malformed())?;
    if weight == 0 {
        return Err(malformed());
    }
    let preferences = parse_preferences(preferences).ok_or_else(malformed)?;
    Ok(Ballot {
        weight,
        preferences,
    })
}

/// Splits a raw preference list into candidate numbers, discarding every
/// token that belongs to a `{}` indifference group.
///
/// The scan is structural: each comma-delimited segment either opens a
/// group, closes one, sits inside one, or is a plain number. A group left
/// open at the end of the line makes the whole list invalid.
fn parse_preferences(raw: &str) -> Option<Vec<u32>> {
    let mut preferences: Vec<u32> = Vec::new();
    let mut in_group = false;
    for token in raw.split(',') {
        let token = token.trim();
        if in_group {
            if token.ends_with('}') {
                in_group = false;
            }
            continue;
        }
        if let Some(rest) = token.strip_prefix('{') {
            in_group = !rest.ends_with('}');
            continue;
        }
        preferences.push(token.parse::<u32>().ok()?);
    }
    if in_group {
        return None;
    }
    Some(preferences)
}

// The declared figures are informational. Disagreements are worth a trace
// but must not reject a dataset that tallies fine without them.
fn check_declared_meta(meta: &ElectionMeta, ballots: &[Ballot]) {
    let total_weight: u64 = ballots.iter().map(|b| b.weight).sum();
    if total_weight != meta.total_vote_weight {
        warn!(
            "declared total vote weight {} differs from the summed ballot weights {}",
            meta.total_vote_weight, total_weight
        );
    }
    let patterns = ballots.len() as u64;
    if patterns != meta.unique_ballot_patterns {
        warn!(
            "declared unique ballot pattern count {} differs from the {} parsed patterns",
            meta.unique_ballot_patterns, patterns
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "3
1,Alice
2,Bob
3,Clara
12,12,4
5,1,2,3
3,2,{1,3}
2,3
2,2,1
";

    #[test]
    fn parses_well_formed_dataset() {
        let election = parse_str(SAMPLE).unwrap();
        assert_eq!(election.num_candidates(), 3);
        let names: Vec<&str> = election
            .candidates
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["Alice", "Bob", "Clara"]);
        assert_eq!(
            election.meta,
            ElectionMeta {
                voter_count: 12,
                total_vote_weight: 12,
                unique_ballot_patterns: 4,
            }
        );
        assert_eq!(election.ballots.len(), 4);
        assert_eq!(election.ballots[0].weight, 5);
        assert_eq!(election.ballots[0].preferences, vec![1, 2, 3]);
    }

    #[test]
    fn candidate_numbers_are_dense() {
        let election = parse_str(SAMPLE).unwrap();
        for (idx, candidate) in election.candidates.iter().enumerate() {
            assert_eq!(candidate.number as usize, idx + 1);
        }
    }

    #[test]
    fn preferences_stay_in_range_after_stripping() {
        let election = parse_str(SAMPLE).unwrap();
        let num_candidates = election.num_candidates() as u32;
        for ballot in &election.ballots {
            for &preference in &ballot.preferences {
                assert!((1..=num_candidates).contains(&preference));
            }
        }
    }

    #[test]
    fn strips_indifference_group_with_leading_number() {
        assert_eq!(parse_preferences("1,{2,3},4"), Some(vec![1, 4]));
    }

    #[test]
    fn strips_leading_indifference_group() {
        assert_eq!(parse_preferences("{1,2},3"), Some(vec![3]));
    }

    #[test]
    fn strips_single_candidate_group() {
        assert_eq!(parse_preferences("1,{2},3"), Some(vec![1, 3]));
    }

    #[test]
    fn group_only_ballot_keeps_no_preferences() {
        let election = parse_str(SAMPLE).unwrap();
        assert_eq!(election.ballots[1].preferences, vec![2]);

        let input = "2\n1,Anna\n2,Luis\n1,1,1\n1,{1,2}\n";
        let election = parse_str(input).unwrap();
        assert_eq!(election.ballots[0].preferences, Vec::<u32>::new());
    }

    #[test]
    fn unterminated_group_is_malformed() {
        let input = "2\n1,Anna\n2,Luis\n1,1,1\n1,1,{2\n";
        let err = parse_str(input).unwrap_err();
        assert!(matches!(err, ParseError::MalformedBallot { lineno: 5, .. }));
    }

    #[test]
    fn rejects_invalid_header() {
        let err = parse_str("three\n").unwrap_err();
        assert!(matches!(err, ParseError::InvalidHeader { .. }));
    }

    #[test]
    fn rejects_empty_input() {
        assert_eq!(parse_str("").unwrap_err(), ParseError::EmptyInput);
    }

    #[test]
    fn rejects_candidate_line_without_comma() {
        let input = "2\n1 Anna\n2,Luis\n1,1,1\n";
        let err = parse_str(input).unwrap_err();
        assert!(matches!(
            err,
            ParseError::MalformedCandidate { lineno: 2, .. }
        ));
    }

    #[test]
    fn rejects_misnumbered_candidate_line() {
        let input = "2\n1,Anna\n3,Luis\n1,1,1\n";
        let err = parse_str(input).unwrap_err();
        assert_eq!(
            err,
            ParseError::CandidateOutOfOrder {
                lineno: 3,
                expected: 2,
                found: 3,
            }
        );
    }

    #[test]
    fn rejects_short_metadata_line() {
        let input = "1\n1,Anna\n4,4\n";
        let err = parse_str(input).unwrap_err();
        assert!(matches!(err, ParseError::MalformedMetadata { lineno: 3, .. }));
    }

    #[test]
    fn rejects_zero_ballot_weight() {
        let input = "1\n1,Anna\n1,1,1\n0,1\n";
        let err = parse_str(input).unwrap_err();
        assert!(matches!(err, ParseError::MalformedBallot { lineno: 4, .. }));
    }

    #[test]
    fn rejects_non_integer_preference_token() {
        let input = "2\n1,Anna\n2,Luis\n1,1,1\n1,1,x\n";
        let err = parse_str(input).unwrap_err();
        assert!(matches!(err, ParseError::MalformedBallot { lineno: 5, .. }));
    }

    #[test]
    fn rejects_ballot_line_without_preference_list() {
        let input = "1\n1,Anna\n1,1,1\n3\n";
        let err = parse_str(input).unwrap_err();
        assert!(matches!(err, ParseError::MalformedBallot { lineno: 4, .. }));
    }

    #[test]
    fn rejects_truncated_candidate_section() {
        let err = parse_str("3\n1,Anna\n").unwrap_err();
        assert_eq!(
            err,
            ParseError::TruncatedInput {
                expected: 5,
                found: 2,
            }
        );
    }

    #[test]
    fn rejects_missing_metadata_line() {
        let err = parse_str("1\n1,Anna\n").unwrap_err();
        assert_eq!(
            err,
            ParseError::TruncatedInput {
                expected: 3,
                found: 2,
            }
        );
    }

    #[test]
    fn trims_candidate_names_and_tolerates_blank_tail() {
        let input = "1\n1,  Anna Smith  \n2,2,1\n2,1\n\n\n";
        let election = parse_str(input).unwrap();
        assert_eq!(election.candidates[0].name, "Anna Smith");
        assert_eq!(election.ballots.len(), 1);
    }

    #[test]
    fn keeps_out_of_range_preferences() {
        // Bounds are enforced at tally time, not at parse time.
        let input = "2\n1,Anna\n2,Luis\n1,1,1\n1,1,7\n";
        let election = parse_str(input).unwrap();
        assert_eq!(election.ballots[0].preferences, vec![1, 7]);
    }
}
