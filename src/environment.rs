use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::languages::LanguageSet;

/// Name of the platform file indexer consulted for haystacks.
pub const NATIVE_INDEXER: &str = "mdfind";

/// Capability questions the planner asks about the host.
///
/// Answers must not change during one invocation.
pub trait Environment: Send + Sync {
    fn is_native_indexer_available(&self) -> bool;

    fn wants_specific_languages(&self) -> bool;

    fn is_in_versioned_tree(&self) -> bool;

    /// POSIX extended regex matching file names of the requested languages.
    /// Only meaningful when [`Environment::wants_specific_languages`] holds.
    fn langs_as_regex(&self) -> String;

    /// Absolute path of the rendering helper.
    fn renderer_path(&self) -> &Path;

    /// Write the one-line pipeline description to a diagnostic sink.
    fn write_header(&self, sink: &mut (dyn Write + Send), text: &str) -> io::Result<()> {
        writeln!(sink, "{text}")
    }
}

/// Inputs to [`HostEnvironment::probe`].
#[derive(Clone, Debug, Default)]
pub struct ProbeConfig {
    pub languages: LanguageSet,
    /// Renderer override; the running executable is used when absent.
    pub renderer: Option<PathBuf>,
    /// Directory to probe; defaults to the current working directory.
    pub cwd: Option<PathBuf>,
    pub show_header: bool,
}

/// Probed answers for the machine we are running on.
#[derive(Clone, Debug)]
pub struct HostEnvironment {
    cwd: PathBuf,
    indexer: Option<PathBuf>,
    in_versioned_tree: bool,
    languages: LanguageSet,
    renderer: PathBuf,
    show_header: bool,
}

impl HostEnvironment {
    pub async fn probe(config: ProbeConfig) -> Result<Self> {
        let cwd = match config.cwd {
            Some(dir) => dir,
            None => std::env::current_dir().context("failed to resolve current directory")?,
        };
        let cwd = cwd
            .canonicalize()
            .with_context(|| format!("failed to canonicalize {}", cwd.display()))?;

        let renderer = match config.renderer {
            Some(path) if path.is_absolute() => path,
            Some(path) => cwd.join(path),
            None => std::env::current_exe().context("failed to locate the running executable")?,
        };

        // Both paths end up as command-line text; refuse ones that would be mangled.
        cwd.to_str().with_context(|| {
            format!("working directory {} is not valid UTF-8", cwd.display())
        })?;
        renderer.to_str().with_context(|| {
            format!("renderer path {} is not valid UTF-8", renderer.display())
        })?;

        let indexer = which::which(NATIVE_INDEXER).ok();
        let in_versioned_tree = probe_versioned_tree(&cwd).await;

        debug!(
            target: "ndl::environment",
            indexer = ?indexer,
            in_versioned_tree,
            languages = ?config.languages.names(),
            renderer = %renderer.display(),
            "probed host environment"
        );

        Ok(Self {
            cwd,
            indexer,
            in_versioned_tree,
            languages: config.languages,
            renderer,
            show_header: config.show_header,
        })
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }
}

impl Environment for HostEnvironment {
    fn is_native_indexer_available(&self) -> bool {
        self.indexer.is_some()
    }

    fn wants_specific_languages(&self) -> bool {
        !self.languages.is_empty()
    }

    fn is_in_versioned_tree(&self) -> bool {
        self.in_versioned_tree
    }

    fn langs_as_regex(&self) -> String {
        self.languages.as_regex()
    }

    fn renderer_path(&self) -> &Path {
        &self.renderer
    }

    fn write_header(&self, sink: &mut (dyn Write + Send), text: &str) -> io::Result<()> {
        if !self.show_header {
            return Ok(());
        }
        writeln!(sink, "{text}")?;
        sink.flush()
    }
}

async fn probe_versioned_tree(cwd: &Path) -> bool {
    let output = Command::new("git")
        .arg("rev-parse")
        .arg("--is-inside-work-tree")
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .await;

    match output {
        Ok(output) => {
            output.status.success() && String::from_utf8_lossy(&output.stdout).trim() == "true"
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!(target: "ndl::environment", "git not installed; assuming unversioned tree");
            false
        }
        Err(err) => {
            warn!(target: "ndl::environment", error = %err, "failed to run git rev-parse");
            false
        }
    }
}
