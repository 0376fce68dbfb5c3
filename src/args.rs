use clap::Parser;

/// This is a ranked-ballot tabulation program.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path) The election data file, in the comma-delimited ranked-ballot
    /// format: a candidate count header, one line per candidate, a metadata line,
    /// then one weighted ballot pattern per line.
    #[clap(short, long, value_parser)]
    pub input: String,

    /// (list of comma-separated rule names) The voting rules to tabulate, in the
    /// given order. Accepted names: plurality, irv, borda, approval. All four run
    /// when this option is not specified.
    #[clap(long, value_parser, use_value_delimiter = true)]
    pub rules: Option<Vec<String>>,

    /// (file path, 'stdout' or empty) If specified, the summary of the tabulated
    /// outcomes will be written in JSON format to the given location.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) A reference file containing a tabulation summary in JSON
    /// format. If provided, preftally will check that its own summary matches the
    /// reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// If passed as an argument, will turn on verbose logging to the standard
    /// output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
