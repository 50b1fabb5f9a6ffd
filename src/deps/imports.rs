//! Import scanning for Python sources.
use std::collections::BTreeSet;
use std::path::Path;

use tree_sitter::{Node, Parser};

use crate::error::ScanError;

/// Extracts top-level package names from Python import statements.
///
/// Holds a reusable [`tree_sitter::Parser`]; parsers are not `Sync`, so
/// parallel scans create one scanner per worker.
pub struct ImportScanner {
    parser: Parser,
}

impl std::fmt::Debug for ImportScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImportScanner").finish_non_exhaustive()
    }
}

impl ImportScanner {
    /// Create a scanner with the Python grammar loaded.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Grammar`] if the grammar is incompatible with the
    /// linked tree-sitter runtime.
    pub fn new() -> Result<Self, ScanError> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .map_err(|e| ScanError::Grammar(e.to_string()))?;
        Ok(Self { parser })
    }

    /// Read and scan the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Io`] if the file cannot be read and
    /// [`ScanError::Parse`] if it is not valid Python.
    pub fn scan_file(&mut self, path: &Path) -> Result<BTreeSet<String>, ScanError> {
        let bytes = std::fs::read(path).map_err(|source| ScanError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let content = String::from_utf8_lossy(&bytes);
        self.scan_source(&content, path)
    }

    /// Scan Python source text. `path` is only used for error messages.
    ///
    /// Every import in the module is considered, including those nested in
    /// functions or conditionals. Relative imports are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Parse`] with the first offending line if the
    /// source contains syntax errors.
    pub fn scan_source(&mut self, source: &str, path: &Path) -> Result<BTreeSet<String>, ScanError> {
        let parse_error = |line| ScanError::Parse {
            path: path.to_path_buf(),
            line,
        };
        let tree = self.parser.parse(source, None).ok_or_else(|| parse_error(1))?;
        let root = tree.root_node();
        if root.has_error() {
            return Err(parse_error(first_error_line(root)));
        }

        let bytes = source.as_bytes();
        let mut packages = BTreeSet::new();
        let mut cursor = root.walk();
        let mut stack = vec![root];

        while let Some(node) = stack.pop() {
            match node.kind() {
                "import_statement" => {
                    let mut names = node.walk();
                    for name in node.children_by_field_name("name", &mut names) {
                        let dotted = if name.kind() == "aliased_import" {
                            name.child_by_field_name("name")
                        } else {
                            Some(name)
                        };
                        if let Some(pkg) = dotted.and_then(|n| top_level(n, bytes)) {
                            packages.insert(pkg);
                        }
                    }
                }
                "import_from_statement" => {
                    if let Some(module) = node.child_by_field_name("module_name")
                        && module.kind() == "dotted_name"
                        && let Some(pkg) = top_level(module, bytes)
                    {
                        packages.insert(pkg);
                    }
                }
                "future_import_statement" => {
                    packages.insert("__future__".to_string());
                }
                _ => {
                    for child in node.children(&mut cursor) {
                        stack.push(child);
                    }
                }
            }
        }

        Ok(packages)
    }
}

/// First segment of a dotted module name: `os.path` → `os`.
fn top_level(node: Node<'_>, source: &[u8]) -> Option<String> {
    let text = node.utf8_text(source).ok()?;
    let first = text.split('.').next()?.trim();
    (!first.is_empty()).then(|| first.to_string())
}

/// One-based line of the first error or missing node under `root`.
fn first_error_line(root: Node<'_>) -> usize {
    let mut cursor = root.walk();
    let mut stack = vec![root];
    let mut first: Option<usize> = None;

    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            let row = node.start_position().row;
            first = Some(first.map_or(row, |f| f.min(row)));
            continue;
        }
        if node.has_error() {
            for child in node.children(&mut cursor) {
                stack.push(child);
            }
        }
    }

    first.unwrap_or(0) + 1
}
