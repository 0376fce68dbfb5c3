//! Tally engines for ranked-ballot elections.
//!
//! Four independent voting rules over one immutable [`Election`]: plurality,
//! instant-runoff, Borda count and approval. Each rule is a pure read-only
//! query: it allocates its own score table, never mutates the election, and
//! can run in any order relative to the others.

mod model;
mod parser;

use log::{debug, info};

use std::ops::{Add, AddAssign};

pub use crate::model::*;
pub use crate::parser::{parse_lines, parse_str, ParseError};

// **** Private structures ****

type RoundId = u32;

#[derive(Eq, PartialEq, Debug, Clone, Copy, PartialOrd, Ord, Hash)]
struct Score(u64);

impl Score {
    const EMPTY: Score = Score(0);
}

impl std::iter::Sum for Score {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        Score(iter.map(|s| s.0).sum())
    }
}

impl AddAssign for Score {
    fn add_assign(&mut self, rhs: Score) {
        self.0 += rhs.0;
    }
}

impl Add for Score {
    type Output = Score;
    fn add(self: Score, rhs: Score) -> Score {
        Score(self.0 + rhs.0)
    }
}

/// Maps a 1-based candidate number to an index into the score table.
///
/// Numbers outside `1..=num_candidates` resolve to nothing: corrupt
/// preference entries are skipped during tallying instead of failing a run.
fn candidate_slot(number: u32, num_candidates: usize) -> Option<usize> {
    let idx = (number as usize).checked_sub(1)?;
    (idx < num_candidates).then_some(idx)
}

fn new_score_table(election: &Election) -> Result<Vec<Score>, TallyError> {
    if election.candidates.is_empty() || election.ballots.is_empty() {
        return Err(TallyError::EmptyElection);
    }
    Ok(vec![Score::EMPTY; election.num_candidates()])
}

// The winner is the first candidate, in ascending candidate-number order,
// holding the maximum score. The scan is strict: a candidate with no votes
// at all cannot win.
fn into_outcome(election: &Election, scores: Vec<Score>) -> Result<TallyOutcome, TallyError> {
    let mut max_score = Score::EMPTY;
    let mut winner: Option<usize> = None;
    for (idx, &score) in scores.iter().enumerate() {
        if score > max_score {
            max_score = score;
            winner = Some(idx);
        }
    }
    let winner = winner.ok_or(TallyError::NoWinner)?;
    let tally: Vec<(Candidate, u64)> = election
        .candidates
        .iter()
        .zip(scores.iter())
        .map(|(candidate, score)| (candidate.clone(), score.0))
        .collect();
    Ok(TallyOutcome {
        tally,
        winner: election.candidates[winner].clone(),
        max_score: max_score.0,
    })
}

/// Runs the plurality rule: each ballot's full weight goes to its first
/// preference.
///
/// Ballots with an empty preference list contribute to no candidate.
pub fn run_plurality(election: &Election) -> Result<TallyOutcome, TallyError> {
    info!(
        "run_plurality: {} ballot patterns over {} candidates",
        election.ballots.len(),
        election.num_candidates()
    );
    let mut scores = new_score_table(election)?;
    for ballot in &election.ballots {
        if let Some(&first) = ballot.preferences.first() {
            if let Some(idx) = candidate_slot(first, scores.len()) {
                scores[idx] += Score(ballot.weight);
            }
        }
    }
    debug!("run_plurality: scores: {:?}", scores);
    into_outcome(election, scores)
}

/// Runs the Borda count.
///
/// A ballot awards `weight * (n - position)` points to the candidate ranked
/// at `position` (0-based, `n` candidates in total) and the last-place floor
/// of `weight * 1` to every candidate it leaves unranked.
pub fn run_borda(election: &Election) -> Result<TallyOutcome, TallyError> {
    info!(
        "run_borda: {} ballot patterns over {} candidates",
        election.ballots.len(),
        election.num_candidates()
    );
    let mut scores = new_score_table(election)?;
    let num_candidates = scores.len() as u64;
    for ballot in &election.ballots {
        let mut ranked = vec![false; scores.len()];
        for (position, &preference) in ballot.preferences.iter().enumerate() {
            if let Some(idx) = candidate_slot(preference, scores.len()) {
                scores[idx] += Score(ballot.weight * num_candidates.saturating_sub(position as u64));
                ranked[idx] = true;
            }
        }
        for (idx, &seen) in ranked.iter().enumerate() {
            if !seen {
                scores[idx] += Score(ballot.weight);
            }
        }
    }
    debug!("run_borda: scores: {:?}", scores);
    into_outcome(election, scores)
}

/// Runs approval voting: every candidate a ballot ranks anywhere is credited
/// the ballot's full weight.
pub fn run_approval(election: &Election) -> Result<TallyOutcome, TallyError> {
    info!(
        "run_approval: {} ballot patterns over {} candidates",
        election.ballots.len(),
        election.num_candidates()
    );
    let mut scores = new_score_table(election)?;
    for ballot in &election.ballots {
        for &preference in &ballot.preferences {
            if let Some(idx) = candidate_slot(preference, scores.len()) {
                scores[idx] += Score(ballot.weight);
            }
        }
    }
    debug!("run_approval: scores: {:?}", scores);
    into_outcome(election, scores)
}

/// Runs the instant-runoff rule.
///
/// Starting from the full candidate set, each round credits every ballot's
/// weight to its first still-active preference and eliminates the active
/// candidate with the strictly lowest round score, the lowest candidate
/// number going first among ties. The rule always performs exactly
/// `num_candidates - 1` elimination rounds; the last active candidate wins
/// with the score it held in the final round it participated in.
pub fn run_instant_runoff(election: &Election) -> Result<RunoffOutcome, TallyError> {
    info!(
        "run_instant_runoff: {} ballot patterns over {} candidates",
        election.ballots.len(),
        election.num_candidates()
    );
    if election.candidates.is_empty() || election.ballots.is_empty() {
        return Err(TallyError::EmptyElection);
    }
    let num_candidates = election.num_candidates();

    // Working elimination set, local to this run. The election's own
    // candidate list is never touched.
    let mut active = vec![true; num_candidates];
    // Every candidate's score in the last round it was part of. A sole
    // candidate sees no elimination round, so its tally is taken directly.
    let mut last_scores = if num_candidates == 1 {
        top_choice_tally(election, &active)
    } else {
        vec![Score::EMPTY; num_candidates]
    };
    let mut rounds: Vec<RunoffRound> = Vec::with_capacity(num_candidates.saturating_sub(1));

    for round in 1..num_candidates {
        let scores = top_choice_tally(election, &active);
        for idx in 0..num_candidates {
            if active[idx] {
                last_scores[idx] = scores[idx];
            }
        }

        let mut min_score = Score(u64::MAX);
        let mut loser = 0;
        for idx in 0..num_candidates {
            if active[idx] && scores[idx] < min_score {
                min_score = scores[idx];
                loser = idx;
            }
        }

        let tally: Vec<(Candidate, u64)> = election
            .candidates
            .iter()
            .enumerate()
            .filter(|(idx, _)| active[*idx])
            .map(|(idx, candidate)| (candidate.clone(), scores[idx].0))
            .collect();
        info!(
            "run_instant_runoff: round {}: eliminating {} with {} votes",
            round, election.candidates[loser], min_score.0
        );
        rounds.push(RunoffRound {
            round: round as RoundId,
            tally,
            eliminated: election.candidates[loser].clone(),
        });
        active[loser] = false;
    }

    let winner_idx = active
        .iter()
        .position(|&still_active| still_active)
        .ok_or(TallyError::NoWinner)?;
    let tally: Vec<(Candidate, u64)> = election
        .candidates
        .iter()
        .zip(last_scores.iter())
        .map(|(candidate, score)| (candidate.clone(), score.0))
        .collect();
    let outcome = TallyOutcome {
        tally,
        winner: election.candidates[winner_idx].clone(),
        max_score: last_scores[winner_idx].0,
    };
    Ok(RunoffOutcome { outcome, rounds })
}

// One instant-runoff counting pass: each ballot's weight goes to its first
// preference that is still active. Exhausted ballots contribute nothing.
fn top_choice_tally(election: &Election, active: &[bool]) -> Vec<Score> {
    let mut scores = vec![Score::EMPTY; active.len()];
    for ballot in &election.ballots {
        for &preference in &ballot.preferences {
            if let Some(idx) = candidate_slot(preference, active.len()) {
                if active[idx] {
                    scores[idx] += Score(ballot.weight);
                    break;
                }
            }
        }
    }
    scores
}
