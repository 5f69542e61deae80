use anyhow::{Context, Result};
use dashmap::DashMap;
use log::{debug, trace};
use oxc_allocator::Allocator;
use oxc_ast::ast::*;
use oxc_ast_visit::{Visit, walk};
use oxc_parser::{Parser as OxcParser, ParserReturn};
use oxc_span::{GetSpan, SourceType};
use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
};

use crate::types::{DynamicCandidate, FileImports, ImportKind, ImportRecord};

/// Reads `file` and extracts its imports, memoised in `cache`.
///
/// A read failure is an error; content that fails to parse yields empty
/// imports.
pub fn imports_for(file: &Path, cache: &DashMap<PathBuf, FileImports>) -> Result<FileImports> {
    if let Some(v) = cache.get(file) {
        trace!("Cache hit for imports: {}", file.display());
        return Ok(v.clone());
    }
    trace!("Parsing file for imports: {}", file.display());
    let src =
        fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))?;

    let imports = extract_imports(file, &src);
    debug!(
        "Found {} imports and {} dynamic candidates in {}",
        imports.imports.len(),
        imports.dynamic.len(),
        file.display()
    );
    cache.insert(file.to_path_buf(), imports.clone());
    Ok(imports)
}

/// Extracts value imports, type-only imports and dynamic candidates from `src`.
/// `path` only selects the source type.
pub fn extract_imports(path: &Path, src: &str) -> FileImports {
    let st = source_type_for(path);
    let allocator = Allocator::default();
    let ParserReturn { program, errors, panicked, .. } =
        OxcParser::new(&allocator, src, st).parse();

    if panicked || !errors.is_empty() {
        debug!("Could not parse {} ({} errors), ignoring its imports", path.display(), errors.len());
        return FileImports::default();
    }

    let mut collector = ImportCollector {
        src,
        declaration_file: is_declaration_file(path),
        values: BTreeSet::new(),
        types: BTreeSet::new(),
        dynamic: Vec::new(),
    };
    collector.visit_program(&program);
    collector.finish()
}

struct ImportCollector<'s> {
    src: &'s str,
    declaration_file: bool,
    values: BTreeSet<String>,
    types: BTreeSet<String>,
    dynamic: Vec<DynamicCandidate>,
}

impl ImportCollector<'_> {
    fn add(&mut self, specifier: &str, kind: ImportKind) {
        let kind = if self.declaration_file { ImportKind::TypeOnly } else { kind };
        trace!("Found {:?} import: '{}'", kind, specifier);
        match kind {
            ImportKind::Value => self.values.insert(specifier.to_string()),
            ImportKind::TypeOnly => self.types.insert(specifier.to_string()),
        };
    }

    fn add_dynamic(&mut self, call_start: u32, argument: &Expression) {
        let span = argument.span();
        let expression = self
            .src
            .get(span.start as usize..span.end as usize)
            .unwrap_or_default()
            .to_string();
        let line = line_of(self.src, call_start);
        trace!("Found dynamic candidate at line {}: {}", line, expression);
        self.dynamic.push(DynamicCandidate { line, expression });
    }

    /// Handles the argument of `import()` / `require()`.
    fn add_call_argument(&mut self, call_start: u32, argument: &Expression) {
        match literal_value(argument) {
            Some(specifier) => self.add(&specifier, ImportKind::Value),
            None => self.add_dynamic(call_start, argument),
        }
    }

    fn finish(self) -> FileImports {
        let imports = self
            .values
            .into_iter()
            .map(|specifier| ImportRecord { specifier, kind: ImportKind::Value })
            .chain(
                self.types
                    .into_iter()
                    .map(|specifier| ImportRecord { specifier, kind: ImportKind::TypeOnly }),
            )
            .collect();
        FileImports { imports, dynamic: self.dynamic }
    }
}

impl<'a> Visit<'a> for ImportCollector<'_> {
    fn visit_import_declaration(&mut self, decl: &ImportDeclaration<'a>) {
        let kind = if decl.import_kind.is_type() {
            ImportKind::TypeOnly
        } else {
            match &decl.specifiers {
                // import 'side-effect' and import {} from 'x'
                None => ImportKind::Value,
                Some(specifiers) if specifiers.is_empty() => ImportKind::Value,
                Some(specifiers) => {
                    let has_runtime_binding = specifiers.iter().any(|spec| match spec {
                        ImportDeclarationSpecifier::ImportSpecifier(s) => !s.import_kind.is_type(),
                        ImportDeclarationSpecifier::ImportDefaultSpecifier(_) => true,
                        ImportDeclarationSpecifier::ImportNamespaceSpecifier(_) => true,
                    });
                    if has_runtime_binding { ImportKind::Value } else { ImportKind::TypeOnly }
                }
            }
        };
        self.add(decl.source.value.as_str(), kind);
    }

    fn visit_export_named_declaration(&mut self, decl: &ExportNamedDeclaration<'a>) {
        if let Some(source) = &decl.source {
            let all_type_only = !decl.specifiers.is_empty()
                && decl.specifiers.iter().all(|s| s.export_kind.is_type());
            let kind = if decl.export_kind.is_type() || all_type_only {
                ImportKind::TypeOnly
            } else {
                ImportKind::Value
            };
            self.add(source.value.as_str(), kind);
        }
        walk::walk_export_named_declaration(self, decl);
    }

    fn visit_export_all_declaration(&mut self, decl: &ExportAllDeclaration<'a>) {
        let kind =
            if decl.export_kind.is_type() { ImportKind::TypeOnly } else { ImportKind::Value };
        self.add(decl.source.value.as_str(), kind);
    }

    fn visit_ts_import_equals_declaration(&mut self, decl: &TSImportEqualsDeclaration<'a>) {
        if let TSModuleReference::ExternalModuleReference(ext) = &decl.module_reference {
            let kind =
                if decl.import_kind.is_type() { ImportKind::TypeOnly } else { ImportKind::Value };
            self.add(ext.expression.value.as_str(), kind);
        }
    }

    fn visit_import_expression(&mut self, expr: &ImportExpression<'a>) {
        self.add_call_argument(expr.span.start, &expr.source);
        walk::walk_import_expression(self, expr);
    }

    fn visit_call_expression(&mut self, expr: &CallExpression<'a>) {
        if let Expression::Identifier(callee) = &expr.callee
            && callee.name.as_str() == "require"
            && let Some(first) = expr.arguments.first()
        {
            match first.as_expression() {
                Some(arg) => self.add_call_argument(expr.span.start, arg),
                // require(...args)
                None => {
                    let span = first.span();
                    let expression = self
                        .src
                        .get(span.start as usize..span.end as usize)
                        .unwrap_or_default()
                        .to_string();
                    let line = line_of(self.src, expr.span.start);
                    self.dynamic.push(DynamicCandidate { line, expression });
                }
            }
        }
        walk::walk_call_expression(self, expr);
    }
}

/// The string value of a literal argument: string literals and template
/// literals without substitutions.
fn literal_value(expr: &Expression) -> Option<String> {
    match expr {
        Expression::StringLiteral(sl) => Some(sl.value.to_string()),
        Expression::TemplateLiteral(tl) if tl.expressions.is_empty() && tl.quasis.len() == 1 => {
            tl.quasis[0].value.cooked.as_ref().map(|c| c.to_string())
        }
        Expression::ParenthesizedExpression(pe) => literal_value(&pe.expression),
        _ => None,
    }
}

/// 1-based line containing byte `offset`.
fn line_of(src: &str, offset: u32) -> usize {
    let end = (offset as usize).min(src.len());
    src.as_bytes()[..end].iter().filter(|b| **b == b'\n').count() + 1
}

fn is_declaration_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|name| name.ends_with(".d.ts") || name.ends_with(".d.mts") || name.ends_with(".d.cts"))
        .unwrap_or(false)
}

fn source_type_for(path: &Path) -> SourceType {
    let ext = path.extension().and_then(|e| e.to_str());
    let typescript = matches!(ext, Some("ts") | Some("tsx") | Some("mts") | Some("cts"));

    // JSX is accepted in every JavaScript flavour; TypeScript only allows it in .tsx
    SourceType::default()
        .with_typescript(typescript)
        .with_jsx(if typescript { ext == Some("tsx") } else { true })
        .with_module(true)
}
