use std::fmt;
use std::io::{self, Write};
use std::path::Path;
use std::process::Stdio;

use serde::Serialize;
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::environment::Environment;
use crate::error::PipelineError;

/// Exit status of `xargs` when at least one invocation exited 1-125. Grep
/// exits 1 on a batch without matches, so this is expected.
pub const BENIGN_DISPATCHER_EXIT: i32 = 123;

/// Flag asking the renderer to reformat raw grep lines.
pub const REFORMAT_FLAG: &str = "--reformat-grep-output";

/// What a stage contributes to the pipeline. Exit codes are read per role.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageRole {
    Producer,
    Filter,
    Dispatcher,
    Matcher,
    Renderer,
}

/// A program and its arguments, not yet running.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CommandLine {
    pub role: StageRole,
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    pub fn new<P, I, A>(role: StageRole, program: P, args: I) -> Self
    where
        P: Into<String>,
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        Self {
            role,
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// The terminal stage: `<renderer> --reformat-grep-output <query>`.
    pub fn renderer(path: &Path, query: &str) -> Self {
        Self::new(
            StageRole::Renderer,
            path.display().to_string(),
            [REFORMAT_FLAG, query],
        )
    }

    fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd.stderr(Stdio::inherit());
        cmd
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// How one stage's termination is read.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageOutcome {
    Success,
    /// Dispatcher exit 123: some batch had no matches.
    NoMatch,
    Failed,
}

/// Interpret an exit code for a stage. `None` means the stage was killed by
/// a signal.
pub fn classify(role: StageRole, code: Option<i32>) -> StageOutcome {
    match code {
        Some(0) => StageOutcome::Success,
        Some(BENIGN_DISPATCHER_EXIT) if role == StageRole::Dispatcher => StageOutcome::NoMatch,
        _ => StageOutcome::Failed,
    }
}

/// A stage that did not finish successfully.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StageFailure {
    pub index: usize,
    pub program: String,
    pub code: Option<i32>,
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(
                f,
                "stage {} '{}' exited with status {code}",
                self.index, self.program
            ),
            None => write!(
                f,
                "stage {} '{}' was terminated by a signal",
                self.index, self.program
            ),
        }
    }
}

/// Termination of one stage, in the order stages were awaited.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StageReport {
    pub index: usize,
    pub program: String,
    pub role: StageRole,
    pub code: Option<i32>,
    pub outcome: StageOutcome,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub stages: Vec<StageReport>,
}

impl RunReport {
    /// Stage indices in the order they were awaited.
    pub fn await_order(&self) -> Vec<usize> {
        self.stages.iter().map(|stage| stage.index).collect()
    }
}

/// An ordered chain of commands whose last member is the renderer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pipeline {
    commands: Vec<CommandLine>,
}

impl Pipeline {
    /// Wrap a full command chain. At least a producer and a terminal stage
    /// are required.
    pub fn new(commands: Vec<CommandLine>) -> Result<Self, PipelineError> {
        if commands.len() < 2 {
            return Err(PipelineError::TooShort(commands.len()));
        }
        Ok(Self { commands })
    }

    /// Append the renderer to planned commands.
    pub fn with_renderer(
        mut commands: Vec<CommandLine>,
        renderer: &Path,
        query: &str,
    ) -> Result<Self, PipelineError> {
        commands.push(CommandLine::renderer(renderer, query));
        Self::new(commands)
    }

    pub fn commands(&self) -> &[CommandLine] {
        &self.commands
    }

    /// `cmd0 args… | cmd1 args… | …`
    pub fn header(&self) -> String {
        self.commands
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" | ")
    }

    /// Start every stage, then wait for all of them, renderer first.
    ///
    /// The header is written to `sink` before anything starts. The renderer
    /// writes to our stdout and every stage shares our stderr.
    pub async fn run(
        &self,
        env: &dyn Environment,
        sink: &mut (dyn Write + Send),
    ) -> Result<RunReport, PipelineError> {
        let mut stages = self.materialize()?;

        if let Err(err) = env.write_header(sink, &self.header()) {
            warn!(target: "ndl::pipeline", error = %err, "failed to write pipeline header");
        }

        if let Err(err) = start_all(&mut stages) {
            abandon(&mut stages).await;
            return Err(err);
        }

        await_all(&mut stages).await
    }

    /// Build one pending process per command, wired stdout to stdin. Pipe
    /// ends live inside the pending commands, so any early return closes
    /// them.
    fn materialize(&self) -> Result<Vec<Stage<'_>>, PipelineError> {
        let last = self.commands.len() - 1;
        let mut stages = Vec::with_capacity(self.commands.len());
        let mut upstream: Option<io::PipeReader> = None;

        for (index, line) in self.commands.iter().enumerate() {
            let mut cmd = line.to_command();
            match upstream.take() {
                Some(reader) => cmd.stdin(reader),
                None => cmd.stdin(Stdio::null()),
            };

            if index == last {
                cmd.stdout(Stdio::inherit());
            } else {
                let (reader, writer) = io::pipe().map_err(PipelineError::PipeSetup)?;
                cmd.stdout(writer);
                upstream = Some(reader);
            }

            stages.push(Stage {
                index,
                line,
                state: StageState::Pending(cmd),
            });
        }

        Ok(stages)
    }
}

struct Stage<'a> {
    index: usize,
    line: &'a CommandLine,
    state: StageState,
}

enum StageState {
    Pending(Command),
    Running(Child),
    Done,
}

impl Stage<'_> {
    fn start(&mut self) -> Result<(), PipelineError> {
        let mut cmd = match std::mem::replace(&mut self.state, StageState::Done) {
            StageState::Pending(cmd) => cmd,
            StageState::Running(_) | StageState::Done => {
                panic!("pipeline stage {} started twice", self.index)
            }
        };

        let spawned = cmd.spawn();
        // Our copies of this stage's pipe ends must close now or the
        // neighbours never see EOF.
        drop(cmd);

        match spawned {
            Ok(child) => {
                debug!(
                    target: "ndl::pipeline",
                    stage = self.index,
                    program = %self.line.program,
                    pid = ?child.id(),
                    "stage started"
                );
                self.state = StageState::Running(child);
                Ok(())
            }
            Err(source) if source.kind() == io::ErrorKind::NotFound => {
                Err(PipelineError::MissingTool {
                    program: self.line.program.clone(),
                    source,
                })
            }
            Err(source) => Err(PipelineError::Spawn {
                program: self.line.program.clone(),
                source,
            }),
        }
    }
}

fn start_all(stages: &mut [Stage<'_>]) -> Result<(), PipelineError> {
    for stage in stages.iter_mut() {
        stage.start()?;
    }
    Ok(())
}

/// Tear down after a failed start: close unstarted pipes, kill and reap the
/// stages already running.
async fn abandon(stages: &mut [Stage<'_>]) {
    for stage in stages.iter_mut() {
        if matches!(stage.state, StageState::Pending(_)) {
            stage.state = StageState::Done;
        }
    }

    for stage in stages.iter_mut().rev() {
        let StageState::Running(mut child) = std::mem::replace(&mut stage.state, StageState::Done)
        else {
            continue;
        };
        if let Err(err) = child.start_kill() {
            debug!(target: "ndl::pipeline", stage = stage.index, error = %err, "kill failed");
        }
        if let Err(err) = child.wait().await {
            warn!(
                target: "ndl::pipeline",
                stage = stage.index,
                error = %err,
                "failed to reap abandoned stage"
            );
        }
    }
}

/// Wait for every running stage from last to first, so readers drain
/// before their producers are reaped.
async fn await_all(stages: &mut [Stage<'_>]) -> Result<RunReport, PipelineError> {
    let mut report = RunReport::default();
    let mut failures = Vec::new();
    let mut wait_error = None;

    for stage in stages.iter_mut().rev() {
        let StageState::Running(mut child) = std::mem::replace(&mut stage.state, StageState::Done)
        else {
            continue;
        };

        let status = match child.wait().await {
            Ok(status) => status,
            Err(source) => {
                wait_error.get_or_insert(PipelineError::Wait {
                    program: stage.line.program.clone(),
                    source,
                });
                continue;
            }
        };

        let code = status.code();
        let outcome = classify(stage.line.role, code);
        match outcome {
            StageOutcome::Success => {}
            StageOutcome::NoMatch => debug!(
                target: "ndl::pipeline",
                stage = stage.index,
                "dispatcher reported batches without matches"
            ),
            StageOutcome::Failed => {
                debug!(
                    target: "ndl::pipeline",
                    stage = stage.index,
                    program = %stage.line.program,
                    %status,
                    "stage failed"
                );
                failures.push(StageFailure {
                    index: stage.index,
                    program: stage.line.program.clone(),
                    code,
                });
            }
        }

        report.stages.push(StageReport {
            index: stage.index,
            program: stage.line.program.clone(),
            role: stage.line.role,
            code,
            outcome,
        });
    }

    if let Some(err) = wait_error {
        return Err(err);
    }
    if !failures.is_empty() {
        return Err(PipelineError::StagesFailed(failures));
    }
    Ok(report)
}
