use serde::Serialize;
use std::path::PathBuf;

/// Whether a source file contributes to production or development usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Prod,
    Dev,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub kind: FileKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImportKind {
    Value,
    TypeOnly,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImportRecord {
    pub specifier: String,
    pub kind: ImportKind,
}

/// An `import()` or `require()` whose argument is not a literal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DynamicCandidate {
    /// 1-based line of the call
    pub line: usize,
    /// Source text of the argument expression, verbatim
    pub expression: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileImports {
    pub imports: Vec<ImportRecord>,
    pub dynamic: Vec<DynamicCandidate>,
}

impl FileImports {
    pub fn is_empty(&self) -> bool {
        self.imports.is_empty() && self.dynamic.is_empty()
    }

    pub fn value_specifiers(&self) -> impl Iterator<Item = &str> {
        self.imports.iter().filter(|i| i.kind == ImportKind::Value).map(|i| i.specifier.as_str())
    }

    pub fn type_specifiers(&self) -> impl Iterator<Item = &str> {
        self.imports
            .iter()
            .filter(|i| i.kind == ImportKind::TypeOnly)
            .map(|i| i.specifier.as_str())
    }
}

/// The four ways a dependency can be declared in a manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DependencyKind {
    Runtime,
    Dev,
    Peer,
    Optional,
}

impl DependencyKind {
    pub const ALL: [DependencyKind; 4] =
        [DependencyKind::Runtime, DependencyKind::Dev, DependencyKind::Peer, DependencyKind::Optional];

    /// The manifest field this kind is declared under
    pub fn field(self) -> &'static str {
        match self {
            DependencyKind::Runtime => "dependencies",
            DependencyKind::Dev => "devDependencies",
            DependencyKind::Peer => "peerDependencies",
            DependencyKind::Optional => "optionalDependencies",
        }
    }
}
