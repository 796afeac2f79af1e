use anyhow::{Result, bail};

const LANGUAGES: &[(&str, &[&str])] = &[
    ("c", &["c", "h"]),
    ("cpp", &["cc", "cpp", "cxx", "hh", "hpp", "hxx"]),
    ("csharp", &["cs"]),
    ("go", &["go"]),
    ("java", &["java"]),
    ("javascript", &["js", "jsx", "mjs"]),
    ("kotlin", &["kt", "kts"]),
    ("perl", &["pl", "pm"]),
    ("python", &["py"]),
    ("ruby", &["rb"]),
    ("rust", &["rs"]),
    ("shell", &["sh", "bash"]),
    ("swift", &["swift"]),
    ("typescript", &["ts", "tsx"]),
];

fn canonical_name(language: &str) -> String {
    let lowered = language.trim().to_ascii_lowercase();
    let name = match lowered.as_str() {
        "c++" | "cxx" => "cpp",
        "cs" | "c#" => "csharp",
        "golang" => "go",
        "js" => "javascript",
        "kt" => "kotlin",
        "pl" => "perl",
        "py" => "python",
        "rb" => "ruby",
        "rs" => "rust",
        "sh" | "bash" => "shell",
        "ts" => "typescript",
        other => other,
    };
    name.to_string()
}

/// File extensions associated with a language name or one of its aliases.
pub fn language_to_extensions(language: &str) -> Option<&'static [&'static str]> {
    let name = canonical_name(language);
    LANGUAGES
        .iter()
        .find(|(known, _)| *known == name)
        .map(|(_, extensions)| *extensions)
}

/// Names accepted by [`LanguageSet::parse`], excluding aliases.
pub fn known_languages() -> impl Iterator<Item = &'static str> {
    LANGUAGES.iter().map(|(name, _)| *name)
}

/// The languages a search is restricted to. Empty means unrestricted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LanguageSet {
    names: Vec<String>,
    extensions: Vec<&'static str>,
}

impl LanguageSet {
    pub fn parse<S: AsRef<str>>(languages: &[S]) -> Result<Self> {
        let mut set = LanguageSet::default();
        for language in languages {
            let language = language.as_ref();
            if language.trim().is_empty() {
                continue;
            }
            let Some(extensions) = language_to_extensions(language) else {
                let known: Vec<&str> = known_languages().collect();
                bail!(
                    "unknown language '{language}'; expected one of: {}",
                    known.join(", ")
                );
            };
            let name = canonical_name(language);
            if set.names.contains(&name) {
                continue;
            }
            set.names.push(name);
            for ext in extensions {
                if !set.extensions.contains(ext) {
                    set.extensions.push(ext);
                }
            }
        }
        Ok(set)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// POSIX extended regex matching paths whose extension belongs to the
    /// set, e.g. `\.(go|rs)$`.
    pub fn as_regex(&self) -> String {
        format!(r"\.({})$", self.extensions.join("|"))
    }
}
