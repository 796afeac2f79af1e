#![allow(dead_code)]

use std::path::{Path, PathBuf};

use ndl::environment::Environment;
use ndl::languages::LanguageSet;
use ndl::pipeline::{CommandLine, StageRole};

/// Environment with fixed answers.
#[derive(Clone, Debug)]
pub struct FakeEnvironment {
    pub indexer: bool,
    pub in_tree: bool,
    pub languages: LanguageSet,
    pub renderer: PathBuf,
}

impl FakeEnvironment {
    pub fn new(indexer: bool, in_tree: bool, languages: &[&str]) -> Self {
        Self {
            indexer,
            in_tree,
            languages: LanguageSet::parse(languages).expect("known languages"),
            renderer: PathBuf::from("/opt/ndl/bin/ndl"),
        }
    }
}

impl Environment for FakeEnvironment {
    fn is_native_indexer_available(&self) -> bool {
        self.indexer
    }

    fn wants_specific_languages(&self) -> bool {
        !self.languages.is_empty()
    }

    fn is_in_versioned_tree(&self) -> bool {
        self.in_tree
    }

    fn langs_as_regex(&self) -> String {
        self.languages.as_regex()
    }

    fn renderer_path(&self) -> &Path {
        &self.renderer
    }
}

pub fn sh(role: StageRole, script: &str) -> CommandLine {
    CommandLine::new(role, "sh", ["-c", script])
}

/// Terminal stage copying its stdin into `out`.
pub fn capture_into(out: &Path) -> CommandLine {
    CommandLine::new(
        StageRole::Renderer,
        "sh",
        [
            "-c".to_string(),
            "cat > \"$1\"".to_string(),
            "sh".to_string(),
            out.display().to_string(),
        ],
    )
}
