use std::io;

use serde::Serialize;
use tracing::info;

use crate::environment::Environment;
use crate::error::PipelineError;
use crate::pipeline::{CommandLine, Pipeline, RunReport};
use crate::planner::{self, PlanKind};
use crate::query::Query;

/// Plan the query, then run the pipeline with the header on stderr.
pub async fn execute(query: &Query, env: &dyn Environment) -> Result<RunReport, PipelineError> {
    let pipeline = build(query, env)?;
    let mut stderr = io::stderr();
    let report = pipeline.run(env, &mut stderr).await?;
    info!(
        target: "ndl::search",
        needle = query.needle(),
        stages = report.stages.len(),
        "search finished"
    );
    Ok(report)
}

/// The full pipeline for a query, renderer included.
pub fn build(query: &Query, env: &dyn Environment) -> Result<Pipeline, PipelineError> {
    let plan = planner::plan(query, env);
    Pipeline::with_renderer(plan.commands, env.renderer_path(), query.rendered())
}

/// What `--explain` prints.
#[derive(Debug, Serialize)]
pub struct Explanation {
    pub needle: String,
    pub plan: PlanKind,
    pub header: String,
    pub stages: Vec<CommandLine>,
}

pub fn explain(query: &Query, env: &dyn Environment) -> Result<Explanation, PipelineError> {
    let pipeline = build(query, env)?;
    Ok(Explanation {
        needle: query.needle().to_string(),
        plan: planner::choose(env),
        header: pipeline.header(),
        stages: pipeline.commands().to_vec(),
    })
}
