//! Program discovery and deserialization.
//!
//! A program file is the JSON form of a [`Program`], either bare or wrapped
//! together with the source texts its spans point into:
//!
//! ```json
//! { "sources": [{ "path": "Main.ttcn", "text": "module Main { ... }" }],
//!   "program": { "modules": [...], "definitions": [...] } }
//! ```
//!
//! Source `i` of the list is registered as file id `i`.

use crate::error::{LoadError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use ttcn_ast::foundation::SourceMap;
use ttcn_ast::Program;
use walkdir::WalkDir;

/// Extension of program files picked up from directories.
pub const PROGRAM_EXTENSION: &str = "json";

/// A loaded and bound program with the sources of its spans.
#[derive(Debug, Clone)]
pub struct LoadedProgram {
    pub path: PathBuf,
    pub program: Program,
    pub sources: SourceMap,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ProgramFile {
    WithSources {
        #[serde(default)]
        sources: Vec<SourceEntry>,
        program: Program,
    },
    Bare(Program),
}

#[derive(Debug, Deserialize)]
struct SourceEntry {
    path: PathBuf,
    text: String,
}

/// Load one program file and bind its parent links.
///
/// # Panics
/// Panics if the arenas are inconsistent (an id out of range, or a node
/// reachable twice or not at all). Program files are produced by the
/// parser and are trusted to be well formed.
pub fn load_program(path: &Path) -> Result<LoadedProgram> {
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let file: ProgramFile = serde_json::from_str(&text).map_err(|source| LoadError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let mut sources = SourceMap::new();
    let mut program = match file {
        ProgramFile::WithSources {
            sources: entries,
            program,
        } => {
            for entry in entries {
                sources.add_file(entry.path, entry.text);
            }
            program
        }
        ProgramFile::Bare(program) => program,
    };
    if program.modules.is_empty() {
        return Err(LoadError::EmptyInput(path.to_path_buf()));
    }
    program.bind_parents();
    tracing::debug!(
        path = %path.display(),
        modules = program.modules.len(),
        definitions = program.definitions.len(),
        "program loaded"
    );

    Ok(LoadedProgram {
        path: path.to_path_buf(),
        program,
        sources,
    })
}

/// Program files under `path`, sorted. A file path is returned as is.
pub fn discover(path: &Path) -> Result<Vec<PathBuf>> {
    if !path.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(path) {
        let entry = entry.map_err(|source| LoadError::Walk {
            path: path.to_path_buf(),
            source,
        })?;
        let candidate = entry.path();
        if entry.file_type().is_file()
            && candidate.extension().is_some_and(|e| e == PROGRAM_EXTENSION)
        {
            files.push(candidate.to_path_buf());
        }
    }
    files.sort();
    if files.is_empty() {
        return Err(LoadError::EmptyInput(path.to_path_buf()));
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;
    use ttcn_ast::ast::{Builtin, Expr, TypeExpr};
    use ttcn_ast::ProgramBuilder;

    fn sample_json() -> String {
        let mut b = ProgramBuilder::new();
        let m = b.module("Main");
        b.constant(m, "c", TypeExpr::Builtin(Builtin::Integer), Expr::int(1));
        serde_json::to_string(&b.finish()).unwrap()
    }

    #[test]
    fn test_load_bare_program() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("main.json");
        fs::write(&path, sample_json()).unwrap();

        let loaded = load_program(&path).unwrap();
        assert!(loaded.program.is_bound());
        assert_eq!(loaded.program.modules.len(), 1);
        assert_eq!(loaded.sources.file_count(), 0);
    }

    #[test]
    fn test_load_program_with_sources() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("main.json");
        let text = format!(
            r#"{{"sources":[{{"path":"Main.ttcn","text":"module Main {{}}"}}],"program":{}}}"#,
            sample_json()
        );
        fs::write(&path, text).unwrap();

        let loaded = load_program(&path).unwrap();
        assert_eq!(loaded.sources.file_count(), 1);
    }

    #[test]
    fn test_load_rejects_invalid_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(load_program(&path), Err(LoadError::Json { .. })));
    }

    #[test]
    fn test_load_rejects_program_without_modules() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.json");
        fs::write(&path, "{}").unwrap();

        assert!(matches!(load_program(&path), Err(LoadError::EmptyInput(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = load_program(&dir.path().join("missing.json"));
        assert!(matches!(result, Err(LoadError::Io { .. })));
    }

    #[test]
    fn test_discover_sorted_json_files() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("b.json"), "{}").unwrap();
        fs::write(dir.path().join("nested/a.json"), "{}").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();

        let files = discover(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(names, vec![PathBuf::from("b.json"), PathBuf::from("nested/a.json")]);
    }

    #[test]
    fn test_discover_empty_directory() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(discover(dir.path()), Err(LoadError::EmptyInput(_))));
    }
}
