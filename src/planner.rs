use std::num::NonZeroUsize;

use serde::Serialize;
use tracing::debug;

use crate::environment::Environment;
use crate::pipeline::{CommandLine, StageRole};
use crate::query::Query;

/// Paths handed to each matcher invocation by the dispatcher.
pub const BATCH_SIZE: usize = 1000;

/// Program used to fan paths out to parallel matchers.
pub const DISPATCHER: &str = "xargs";

/// Shape of the pipeline chosen for a query.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanKind {
    /// `git grep` enumerates and matches in one stage.
    VersionedGrep,
    /// Haystack producer, optional language filter, then parallel matchers.
    Generic,
}

/// Commands to run ahead of the renderer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub kind: PlanKind,
    pub commands: Vec<CommandLine>,
}

pub fn choose(env: &dyn Environment) -> PlanKind {
    if !env.is_native_indexer_available()
        && !env.wants_specific_languages()
        && env.is_in_versioned_tree()
    {
        PlanKind::VersionedGrep
    } else {
        PlanKind::Generic
    }
}

pub fn plan(query: &Query, env: &dyn Environment) -> Plan {
    let kind = choose(env);
    let commands = match kind {
        PlanKind::VersionedGrep => vec![versioned_grep(query.needle())],
        PlanKind::Generic => {
            let mut commands = vec![query.haystack_command()];
            if env.wants_specific_languages() {
                commands.push(language_filter(&env.langs_as_regex()));
            }
            commands.push(fanout(cpu_count(), query.needle_command()));
            commands
        }
    };
    debug!(target: "ndl::planner", ?kind, stages = commands.len(), "planned query");
    Plan { kind, commands }
}

fn versioned_grep(needle: &str) -> CommandLine {
    CommandLine::new(
        StageRole::Matcher,
        "git",
        [
            "grep",
            "--untracked",
            "-I", // skip binary files
            "-H", // filename on every match
            "-n", // line number on every match
            "-e",
            needle,
        ],
    )
}

fn language_filter(regex: &str) -> CommandLine {
    CommandLine::new(StageRole::Filter, "grep", ["-z", "-Z", "-E", "-e", regex])
}

/// Dispatcher reading NUL-delimited paths in batches and running `matcher`
/// on each batch, `parallelism` at a time.
pub fn fanout(parallelism: usize, matcher: Vec<String>) -> CommandLine {
    let parallelism = usize::max(1, parallelism);
    let args = [
        "-0".to_string(),
        "-n".to_string(),
        BATCH_SIZE.to_string(),
        "-P".to_string(),
        parallelism.to_string(),
    ];
    CommandLine::new(
        StageRole::Dispatcher,
        DISPATCHER,
        args.into_iter().chain(matcher),
    )
}

pub fn cpu_count() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}
