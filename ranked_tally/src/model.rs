// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;

/// A registered candidate.
///
/// Candidate numbers are 1-based and dense: the candidate with number `k`
/// sits at index `k - 1` of the election's candidate list.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct Candidate {
    pub number: u32,
    pub name: String,
}

impl Display for Candidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.number)
    }
}

/// One distinct ballot pattern: an ordered ranking and the number of voters
/// who cast exactly that ranking.
///
/// A preference list contains each candidate number at most once and may be
/// shorter than the candidate count. Candidates absent from the list are
/// unranked.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Ballot {
    pub weight: u64,
    pub preferences: Vec<u32>,
}

/// The metadata line of a dataset, as declared by its producer.
///
/// These figures are informational only: the tally engines never re-derive
/// or enforce them.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct ElectionMeta {
    pub voter_count: u64,
    pub total_vote_weight: u64,
    pub unique_ballot_patterns: u64,
}

/// A fully parsed election: candidates, weighted ballot patterns and the
/// declared metadata.
///
/// An `Election` is constructed once by the parser and treated as immutable
/// afterwards; every tally function reads it through a shared reference.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Election {
    pub candidates: Vec<Candidate>,
    pub ballots: Vec<Ballot>,
    pub meta: ElectionMeta,
}

impl Election {
    pub fn num_candidates(&self) -> usize {
        self.candidates.len()
    }
}

// ******** Output data structures *********

/// The outcome of one voting rule over one election.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct TallyOutcome {
    /// Per-candidate scores, in ascending candidate-number order.
    pub tally: Vec<(Candidate, u64)>,
    pub winner: Candidate,
    pub max_score: u64,
}

/// One elimination round of the instant-runoff rule.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RunoffRound {
    pub round: u32,
    /// Scores of the candidates still active in this round, in ascending
    /// candidate-number order.
    pub tally: Vec<(Candidate, u64)>,
    pub eliminated: Candidate,
}

/// The outcome of the instant-runoff rule, with its elimination trace.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RunoffOutcome {
    pub outcome: TallyOutcome,
    pub rounds: Vec<RunoffRound>,
}

/// Errors that prevent a tally from completing.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum TallyError {
    /// The election has no candidates or no ballots.
    EmptyElection,
    /// No candidate attained a positive score.
    NoWinner,
}

impl Error for TallyError {}

impl Display for TallyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TallyError::EmptyElection => write!(f, "the election has no candidates or no ballots"),
            TallyError::NoWinner => write!(f, "no candidate attained a positive score"),
        }
    }
}
