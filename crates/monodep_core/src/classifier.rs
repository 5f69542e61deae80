//! Development vs production classification of source files.
//!
//! Classification is a path heuristic: an ordered list of rules is evaluated
//! against the package-relative path and the first match marks the file as
//! [`FileKind::Dev`]. Files matching no rule are [`FileKind::Prod`].

use log::trace;
use std::path::Path;

use crate::types::FileKind;

/// A package-relative path normalised to `/` separators.
pub struct ClassifiedPath<'a> {
    pub path: &'a str,
    pub file_name: &'a str,
}

impl ClassifiedPath<'_> {
    fn dir_segments(&self) -> impl Iterator<Item = &str> {
        let dir = self.path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
        dir.split('/').filter(|s| !s.is_empty())
    }
}

pub struct ClassifierRule {
    pub name: &'static str,
    pub matches: fn(&ClassifiedPath) -> bool,
}

const TEST_DIR_SEGMENTS: &[&str] = &[
    "test",
    "tests",
    "__tests__",
    "spec",
    "__mocks__",
    "mocks",
    "e2e",
    "cypress",
    "playwright",
    ".storybook",
    "stories",
];

const SETUP_FILE_STEMS: &[&str] = &["jest.setup", "vitest.setup", "setupTests", "test-setup"];

fn is_test_file(p: &ClassifiedPath) -> bool {
    let name = p.file_name;
    name.contains(".test.") || name.contains(".spec.") || name.contains("_test.")
}

fn is_story_file(p: &ClassifiedPath) -> bool {
    p.file_name.contains(".stories.") || p.file_name.contains(".story.")
}

fn is_in_test_dir(p: &ClassifiedPath) -> bool {
    p.dir_segments().any(|seg| TEST_DIR_SEGMENTS.contains(&seg))
}

fn is_tooling_file(p: &ClassifiedPath) -> bool {
    let name = p.file_name;
    if name.contains(".config.") {
        return true;
    }
    // .eslintrc.js, .prettierrc.cjs, .babelrc.js
    if name.starts_with('.') && name.contains("rc.") {
        return true;
    }
    let stem = name.split('.').next().unwrap_or(name);
    SETUP_FILE_STEMS.iter().any(|s| name.starts_with(&format!("{s}.")) || stem == *s)
}

/// Ordered, short-circuit list of dev-file rules.
pub struct DevFileClassifier {
    rules: Vec<ClassifierRule>,
}

impl Default for DevFileClassifier {
    fn default() -> Self {
        Self::new(vec![
            ClassifierRule { name: "test-file", matches: is_test_file },
            ClassifierRule { name: "story-file", matches: is_story_file },
            ClassifierRule { name: "test-directory", matches: is_in_test_dir },
            ClassifierRule { name: "tooling-file", matches: is_tooling_file },
        ])
    }
}

impl DevFileClassifier {
    pub fn new(rules: Vec<ClassifierRule>) -> Self {
        Self { rules }
    }

    /// Classifies `rel_path`, a path relative to the package directory.
    pub fn classify(&self, rel_path: &Path) -> FileKind {
        let normalized = rel_path.to_string_lossy().replace('\\', "/");
        let file_name = normalized.rsplit('/').next().unwrap_or(&normalized);
        let candidate = ClassifiedPath { path: &normalized, file_name };

        match self.rules.iter().find(|rule| (rule.matches)(&candidate)) {
            Some(rule) => {
                trace!("{} classified as dev by rule '{}'", normalized, rule.name);
                FileKind::Dev
            }
            None => FileKind::Prod,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(path: &str) -> FileKind {
        DevFileClassifier::default().classify(Path::new(path))
    }

    #[test]
    fn test_prod_files() {
        assert_eq!(classify("src/index.ts"), FileKind::Prod);
        assert_eq!(classify("src/components/Button.tsx"), FileKind::Prod);
        assert_eq!(classify("lib/contest.js"), FileKind::Prod);
        assert_eq!(classify("src/latest/index.ts"), FileKind::Prod);
    }

    #[test]
    fn test_test_and_spec_suffixes() {
        assert_eq!(classify("src/index.test.ts"), FileKind::Dev);
        assert_eq!(classify("src/index.spec.tsx"), FileKind::Dev);
        assert_eq!(classify("src/util_test.js"), FileKind::Dev);
    }

    #[test]
    fn test_story_files() {
        assert_eq!(classify("src/Button.stories.tsx"), FileKind::Dev);
    }

    #[test]
    fn test_test_directories() {
        assert_eq!(classify("src/__tests__/helper.ts"), FileKind::Dev);
        assert_eq!(classify("test/setup.js"), FileKind::Dev);
        assert_eq!(classify("e2e/login.ts"), FileKind::Dev);
        assert_eq!(classify(".storybook/main.ts"), FileKind::Dev);
    }

    #[test]
    fn test_tooling_files() {
        assert_eq!(classify("vite.config.ts"), FileKind::Dev);
        assert_eq!(classify(".eslintrc.js"), FileKind::Dev);
        assert_eq!(classify("jest.setup.ts"), FileKind::Dev);
        assert_eq!(classify("src/setupTests.ts"), FileKind::Dev);
    }

    #[test]
    fn test_windows_separators_are_normalized() {
        assert_eq!(classify("src\\__tests__\\helper.ts"), FileKind::Dev);
        assert_eq!(classify("src\\index.ts"), FileKind::Prod);
    }

    #[test]
    fn test_custom_rules_replace_defaults() {
        fn scripts(p: &ClassifiedPath) -> bool {
            p.path.starts_with("scripts/")
        }
        let classifier =
            DevFileClassifier::new(vec![ClassifierRule { name: "scripts", matches: scripts }]);
        assert_eq!(classifier.classify(Path::new("scripts/release.js")), FileKind::Dev);
        assert_eq!(classifier.classify(Path::new("src/index.test.ts")), FileKind::Prod);
    }
}
