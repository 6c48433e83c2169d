//! System prompt templates
//!
//! Templates are plain Markdown files under `prompts/`, embedded at build
//! time. A deployment can override any of them by dropping a file with the
//! same name into `PROMPTS_DIR`.

use crate::mode::TutorMode;
use rust_embed::Embed;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Embed)]
#[folder = "prompts"]
struct BuiltinPrompts;

/// Language a grammar-correction command works on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GrammarLanguage {
    Khmer,
    English,
    Chinese,
}

/// Everything a template can be looked up by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptKey {
    /// Chat/translate path, chosen through mode resolution
    Tutor(TutorMode),
    /// `/kmgrammar`, `/enggrammar`, `/cngrammar`
    Grammar(GrammarLanguage),
    /// `/explain`
    Explain,
    /// Instruction sent to the vision model along with a screenshot
    Ocr,
}

impl PromptKey {
    pub const ALL: [PromptKey; 10] = [
        PromptKey::Tutor(TutorMode::KhmerLearner),
        PromptKey::Tutor(TutorMode::Foreigner),
        PromptKey::Tutor(TutorMode::KoreanLearner),
        PromptKey::Tutor(TutorMode::JapaneseLearner),
        PromptKey::Tutor(TutorMode::FilipinoLearner),
        PromptKey::Grammar(GrammarLanguage::Khmer),
        PromptKey::Grammar(GrammarLanguage::English),
        PromptKey::Grammar(GrammarLanguage::Chinese),
        PromptKey::Explain,
        PromptKey::Ocr,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            PromptKey::Tutor(TutorMode::KhmerLearner) => "khmer_learner.md",
            PromptKey::Tutor(TutorMode::Foreigner) => "foreigner.md",
            PromptKey::Tutor(TutorMode::KoreanLearner) => "korean_learner.md",
            PromptKey::Tutor(TutorMode::JapaneseLearner) => "japanese_learner.md",
            PromptKey::Tutor(TutorMode::FilipinoLearner) => "filipino_learner.md",
            PromptKey::Grammar(GrammarLanguage::Khmer) => "grammar_khmer.md",
            PromptKey::Grammar(GrammarLanguage::English) => "grammar_english.md",
            PromptKey::Grammar(GrammarLanguage::Chinese) => "grammar_chinese.md",
            PromptKey::Explain => "explain.md",
            PromptKey::Ocr => "ocr.md",
        }
    }
}

#[derive(Error, Debug)]
pub enum PromptError {
    #[error("Prompt template {0} is missing")]
    Missing(&'static str),
    #[error("Prompt template {0} is empty")]
    Empty(&'static str),
    #[error("Prompt template {0} is not valid UTF-8")]
    NotUtf8(&'static str),
    #[error("Failed to read prompt override {path}: {source}")]
    Override {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Immutable table of every template, validated once at startup
#[derive(Debug, Clone)]
pub struct PromptCatalog {
    templates: HashMap<PromptKey, String>,
}

impl PromptCatalog {
    /// Load the embedded templates, then apply any overrides from `override_dir`
    pub fn load(override_dir: Option<&Path>) -> Result<Self, PromptError> {
        let mut templates = HashMap::new();

        for key in PromptKey::ALL {
            let name = key.file_name();
            let text = match override_dir.map(|dir| dir.join(name)) {
                Some(path) if path.is_file() => {
                    tracing::info!(path = %path.display(), "Using prompt override");
                    std::fs::read_to_string(&path)
                        .map_err(|source| PromptError::Override { path, source })?
                }
                _ => {
                    let file = BuiltinPrompts::get(name).ok_or(PromptError::Missing(name))?;
                    String::from_utf8(file.data.into_owned())
                        .map_err(|_| PromptError::NotUtf8(name))?
                }
            };

            let text = text.trim().to_string();
            if text.is_empty() {
                return Err(PromptError::Empty(name));
            }
            templates.insert(key, text);
        }

        Ok(Self { templates })
    }

    /// Templates shipped with the binary
    #[allow(dead_code)] // Used in tests
    pub fn builtin() -> Result<Self, PromptError> {
        Self::load(None)
    }

    /// Template for `key`.
    ///
    /// `load` refuses to build a catalog with a missing key, so the fallback
    /// to an empty string is never taken.
    pub fn select(&self, key: PromptKey) -> &str {
        self.templates.get(&key).map_or("", String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_builtin_has_every_template() {
        let catalog = PromptCatalog::builtin().unwrap();
        for key in PromptKey::ALL {
            assert!(!catalog.select(key).is_empty(), "{key:?} is empty");
        }
    }

    #[test]
    fn test_templates_match_their_purpose() {
        let catalog = PromptCatalog::builtin().unwrap();
        assert!(catalog
            .select(PromptKey::Tutor(TutorMode::Foreigner))
            .contains("Khmer Language & Cultural Guide"));
        assert!(catalog
            .select(PromptKey::Tutor(TutorMode::KoreanLearner))
            .contains("Hangul"));
        assert!(catalog
            .select(PromptKey::Grammar(GrammarLanguage::Chinese))
            .contains("Pinyin"));
        assert!(catalog.select(PromptKey::Ocr).starts_with("Extract ALL readable text"));
    }

    #[test]
    fn test_override_dir_replaces_single_template() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("explain.md"), "  Explain like I'm five.\n").unwrap();

        let catalog = PromptCatalog::load(Some(dir.path())).unwrap();

        assert_eq!(catalog.select(PromptKey::Explain), "Explain like I'm five.");
        assert!(catalog
            .select(PromptKey::Tutor(TutorMode::KhmerLearner))
            .contains("Multi-Language Tutor"));
    }

    #[test]
    fn test_empty_override_is_rejected() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("ocr.md"), "   \n").unwrap();

        let err = PromptCatalog::load(Some(dir.path())).unwrap_err();
        assert!(matches!(err, PromptError::Empty("ocr.md")));
    }

    #[test]
    fn test_file_names_are_unique() {
        let names: std::collections::HashSet<_> =
            PromptKey::ALL.iter().map(|k| k.file_name()).collect();
        assert_eq!(names.len(), PromptKey::ALL.len());
    }
}
