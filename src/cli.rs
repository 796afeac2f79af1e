use std::path::PathBuf;

use clap::Parser;

/// Top-level CLI definition for ndl.
#[derive(Parser, Debug)]
#[command(name = "ndl")]
#[command(about = "Find a needle in a source tree using git grep, grep, and xargs", long_about = None)]
pub struct Cli {
    /// Words to search for; joined with single spaces.
    #[arg(required_unless_present = "reformat_grep_output")]
    pub query: Vec<String>,

    /// Restrict results to these languages (repeatable or comma separated).
    #[arg(short = 'l', long = "lang", value_delimiter = ',')]
    pub langs: Vec<String>,

    /// Rendering helper to run at the end of the pipeline; defaults to this executable.
    #[arg(long)]
    pub renderer: Option<PathBuf>,

    /// Print the planned pipeline as JSON instead of running it.
    #[arg(long, default_value_t = false)]
    pub explain: bool,

    /// Do not print the pipeline description on stderr.
    #[arg(long, default_value_t = false)]
    pub no_header: bool,

    /// Act as the renderer: reformat raw grep lines from stdin.
    #[arg(long, value_name = "QUERY", hide = true, allow_hyphen_values = true)]
    pub reformat_grep_output: Option<String>,
}
