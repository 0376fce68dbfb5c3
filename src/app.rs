use log::{info, warn};

use ranked_tally::*;
use snafu::{prelude::*, Snafu};

use std::fs;

use serde::Serialize;
use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;

#[derive(Debug, Snafu)]
pub enum AppError {
    #[snafu(display("Error reading election data {path}"))]
    ReadingInput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing election data {path}"))]
    ParsingInput { source: ParseError, path: String },
    #[snafu(display(
        "Unknown voting rule {name}: expected one of plurality, irv, borda, approval"
    ))]
    UnknownRule { name: String },
    #[snafu(display("The {rule} tally did not complete"))]
    Tallying {
        source: TallyError,
        rule: &'static str,
    },
    #[snafu(display("Error writing the summary to {path}"))]
    WritingSummary {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display(""))]
    RenderingSummary { source: serde_json::Error },
    #[snafu(display("Error reading reference summary {path}"))]
    ReadingReference {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display(""))]
    ParsingReference { source: serde_json::Error },
    #[snafu(display("The tabulated summary differs from the reference summary"))]
    ReferenceMismatch {},
}

pub type AppResult<T> = Result<T, AppError>;

/// The voting rules the program can tabulate.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum VotingRule {
    Plurality,
    InstantRunoff,
    Borda,
    Approval,
}

impl VotingRule {
    pub const ALL: [VotingRule; 4] = [
        VotingRule::Plurality,
        VotingRule::InstantRunoff,
        VotingRule::Borda,
        VotingRule::Approval,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            VotingRule::Plurality => "plurality",
            VotingRule::InstantRunoff => "irv",
            VotingRule::Borda => "borda",
            VotingRule::Approval => "approval",
        }
    }

    fn from_name(name: &str) -> AppResult<VotingRule> {
        match name {
            "plurality" => Ok(VotingRule::Plurality),
            "irv" => Ok(VotingRule::InstantRunoff),
            "borda" => Ok(VotingRule::Borda),
            "approval" => Ok(VotingRule::Approval),
            _ => UnknownRuleSnafu { name }.fail(),
        }
    }
}

fn resolve_rules(requested: &Option<Vec<String>>) -> AppResult<Vec<VotingRule>> {
    match requested {
        None => Ok(VotingRule::ALL.to_vec()),
        Some(names) => names
            .iter()
            .map(|name| VotingRule::from_name(name.trim()))
            .collect(),
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
struct SummaryHeader {
    input: String,
    #[serde(rename = "numCandidates")]
    num_candidates: usize,
    #[serde(rename = "ballotPatterns")]
    ballot_patterns: usize,
    #[serde(rename = "declaredVoters")]
    declared_voters: u64,
}

fn tally_to_json(tally: &[(Candidate, u64)]) -> JSValue {
    let mut map: JSMap<String, JSValue> = JSMap::new();
    for (candidate, score) in tally {
        map.insert(candidate.name.clone(), json!(score.to_string()));
    }
    JSValue::Object(map)
}

fn outcome_to_json(rule: VotingRule, outcome: &TallyOutcome) -> JSValue {
    json!({
        "rule": rule.name(),
        "tally": tally_to_json(&outcome.tally),
        "winner": outcome.winner.name,
        "maxScore": outcome.max_score.to_string(),
    })
}

fn runoff_to_json(result: &RunoffOutcome) -> JSValue {
    let rounds: Vec<JSValue> = result
        .rounds
        .iter()
        .map(|round| {
            json!({
                "round": round.round,
                "tally": tally_to_json(&round.tally),
                "eliminated": round.eliminated.name,
            })
        })
        .collect();
    json!({
        "rule": VotingRule::InstantRunoff.name(),
        "tally": tally_to_json(&result.outcome.tally),
        "winner": result.outcome.winner.name,
        "maxScore": result.outcome.max_score.to_string(),
        "rounds": rounds,
    })
}

fn run_rule(election: &Election, rule: VotingRule) -> AppResult<JSValue> {
    let js = match rule {
        VotingRule::Plurality => {
            let outcome = run_plurality(election).context(TallyingSnafu { rule: "plurality" })?;
            println!(
                "plurality: {} wins with {} votes",
                outcome.winner, outcome.max_score
            );
            outcome_to_json(rule, &outcome)
        }
        VotingRule::InstantRunoff => {
            let result = run_instant_runoff(election).context(TallyingSnafu { rule: "irv" })?;
            println!(
                "irv: {} wins with {} votes after {} elimination rounds",
                result.outcome.winner,
                result.outcome.max_score,
                result.rounds.len()
            );
            runoff_to_json(&result)
        }
        VotingRule::Borda => {
            let outcome = run_borda(election).context(TallyingSnafu { rule: "borda" })?;
            println!(
                "borda: {} wins with a count of {}",
                outcome.winner, outcome.max_score
            );
            outcome_to_json(rule, &outcome)
        }
        VotingRule::Approval => {
            let outcome = run_approval(election).context(TallyingSnafu { rule: "approval" })?;
            println!(
                "approval: {} wins, approved with a weight of {}",
                outcome.winner, outcome.max_score
            );
            outcome_to_json(rule, &outcome)
        }
    };
    Ok(js)
}

fn build_summary(header: &SummaryHeader, results: &[JSValue]) -> JSValue {
    json!({
        "config": header,
        "results": results,
    })
}

fn check_reference(path: &str, pretty: &str) -> AppResult<()> {
    let contents = fs::read_to_string(path).context(ReadingReferenceSnafu {
        path: path.to_string(),
    })?;
    let reference: JSValue =
        serde_json::from_str(contents.as_str()).context(ParsingReferenceSnafu {})?;
    let pretty_reference =
        serde_json::to_string_pretty(&reference).context(RenderingSummarySnafu {})?;
    if pretty_reference != pretty {
        warn!("Found differences with the reference summary");
        print_diff(pretty_reference.as_str(), pretty, "\n");
        return ReferenceMismatchSnafu {}.fail();
    }
    info!("The tabulated summary matches the reference summary");
    Ok(())
}

pub fn run_tabulation(args: &Args) -> AppResult<()> {
    let path = args.input.clone();
    let contents = fs::read_to_string(&path).context(ReadingInputSnafu { path: path.clone() })?;
    let election = parse_str(&contents).context(ParsingInputSnafu { path: path.clone() })?;
    info!(
        "run_tabulation: parsed {} candidates and {} ballot patterns from {}",
        election.num_candidates(),
        election.ballots.len(),
        path
    );

    let rules = resolve_rules(&args.rules)?;
    let mut results: Vec<JSValue> = Vec::new();
    for rule in rules {
        results.push(run_rule(&election, rule)?);
    }

    let header = SummaryHeader {
        input: path,
        num_candidates: election.num_candidates(),
        ballot_patterns: election.ballots.len(),
        declared_voters: election.meta.voter_count,
    };
    let summary = build_summary(&header, &results);
    let pretty = serde_json::to_string_pretty(&summary).context(RenderingSummarySnafu {})?;

    match args.out.as_deref() {
        Some("stdout") => println!("{}", pretty),
        Some(out_path) => fs::write(out_path, &pretty).context(WritingSummarySnafu {
            path: out_path.to_string(),
        })?,
        None => {}
    }

    if let Some(reference_path) = &args.reference {
        check_reference(reference_path, &pretty)?;
    }

    Ok(())
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
    fn resolves_rule_names() {
        assert_eq!(resolve_rules(&None).unwrap(), VotingRule::ALL.to_vec());
        let picked =
            resolve_rules(&Some(vec!["borda".to_string(), "irv".to_string()])).unwrap();
        assert_eq!(picked, vec![VotingRule::Borda, VotingRule::InstantRunoff]);
        assert!(matches!(
            resolve_rules(&Some(vec!["star".to_string()])),
            Err(AppError::UnknownRule { .. })
        ));
    }

    #[test]
    fn summarizes_all_rules_over_a_dataset() {
        let election = parse_str(SAMPLE).unwrap();
        let results: Vec<JSValue> = VotingRule::ALL
            .iter()
            .map(|&rule| run_rule(&election, rule).unwrap())
            .collect();

        // Plurality: Alice and Bob tie at 5 and the lower number wins.
        assert_eq!(results[0]["winner"], json!("Alice"));
        assert_eq!(results[0]["maxScore"], json!("5"));
        // Instant-runoff: Clara then Alice are eliminated.
        assert_eq!(results[1]["winner"], json!("Bob"));
        assert_eq!(results[1]["rounds"].as_array().unwrap().len(), 2);
        assert_eq!(results[1]["rounds"][0]["eliminated"], json!("Clara"));
        // Borda and approval both favour Bob.
        assert_eq!(results[2]["winner"], json!("Bob"));
        assert_eq!(results[2]["maxScore"], json!("27"));
        assert_eq!(results[3]["winner"], json!("Bob"));
        assert_eq!(results[3]["maxScore"], json!("10"));
    }

    #[test]
    fn summary_nests_config_and_results() {
        let election = parse_str(SAMPLE).unwrap();
        let header = SummaryHeader {
            input: "sample.toi".to_string(),
            num_candidates: election.num_candidates(),
            ballot_patterns: election.ballots.len(),
            declared_voters: election.meta.voter_count,
        };
        let results = vec![run_rule(&election, VotingRule::Plurality).unwrap()];
        let js = build_summary(&header, &results);
        assert_eq!(js["config"]["numCandidates"], json!(3));
        assert_eq!(js["config"]["declaredVoters"], json!(12));
        assert_eq!(js["results"][0]["rule"], json!("plurality"));
        assert_eq!(js["results"][0]["tally"]["Clara"], json!("2"));
    }
}
