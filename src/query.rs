use std::path::PathBuf;

use anyhow::{Result, bail};

use crate::environment::{Environment, HostEnvironment, NATIVE_INDEXER};
use crate::pipeline::{CommandLine, StageRole};

/// Where candidate paths come from. Every variant emits NUL-delimited paths.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Haystack {
    /// Ask the platform indexer for files whose content mentions the needle.
    Indexed { root: PathBuf },
    /// Walk the working directory, skipping `.git`.
    Walk,
    /// An explicit producer command.
    Command(CommandLine),
}

impl Haystack {
    pub fn for_host(env: &HostEnvironment) -> Self {
        if env.is_native_indexer_available() {
            Haystack::Indexed {
                root: env.cwd().to_path_buf(),
            }
        } else {
            Haystack::Walk
        }
    }

    fn command(&self, needle: &str) -> CommandLine {
        match self {
            Haystack::Indexed { root } => CommandLine::new(
                StageRole::Producer,
                NATIVE_INDEXER,
                [
                    "-0".to_string(),
                    "-onlyin".to_string(),
                    root.display().to_string(),
                    format!("kMDItemTextContent == \"{}\"", escape_indexer_literal(needle)),
                ],
            ),
            Haystack::Walk => CommandLine::new(
                StageRole::Producer,
                "find",
                [".", "-type", "f", "-not", "-path", "*/.git/*", "-print0"],
            ),
            Haystack::Command(line) => line.clone(),
        }
    }
}

/// A parsed search request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Query {
    needle: String,
    rendered: String,
    haystack: Haystack,
}

impl Query {
    pub fn new(needle: impl Into<String>, haystack: Haystack) -> Result<Self> {
        let needle = needle.into();
        if needle.is_empty() {
            bail!("the search needle must not be empty");
        }
        if needle.contains('\0') {
            bail!("the search needle must not contain NUL bytes");
        }
        Ok(Self {
            rendered: needle.clone(),
            needle,
            haystack,
        })
    }

    /// Join command-line words into a single needle.
    pub fn from_words<S: AsRef<str>>(words: &[S], haystack: Haystack) -> Result<Self> {
        let joined = words
            .iter()
            .map(|word| word.as_ref())
            .collect::<Vec<_>>()
            .join(" ");
        Self::new(joined, haystack)
    }

    pub fn needle(&self) -> &str {
        &self.needle
    }

    /// The query as handed to the renderer.
    pub fn rendered(&self) -> &str {
        &self.rendered
    }

    /// Producer of NUL-delimited candidate paths.
    pub fn haystack_command(&self) -> CommandLine {
        self.haystack.command(&self.needle)
    }

    /// Matcher argv. Paths arrive as trailing arguments; output is
    /// `path\0lineno:text` per match.
    pub fn needle_command(&self) -> Vec<String> {
        ["grep", "-Z", "-H", "-n", "-e"]
            .into_iter()
            .map(String::from)
            .chain(std::iter::once(self.needle.clone()))
            .collect()
    }
}

fn escape_indexer_literal(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for ch in needle.chars() {
        if ch == '"' || ch == '\\' {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
