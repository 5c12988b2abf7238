//! Command-line interface for refscope.
//!
//! This module handles argument parsing, file enumeration and output
//! formatting only. Resolution is done by [`crate::resolve`].

use crate::error::{RefError, Result};
use crate::position::SourcePosition;
use clap::Parser;
use ropey::Rope;
use serde::Serialize;
use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Refscope: find every reference to a Go declaration.
#[derive(Parser, Debug)]
#[command(name = "refscope")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// File containing the identifier.
    #[arg(short, long)]
    pub file: PathBuf,

    /// Byte offset of the identifier in FILE.
    #[arg(short, long)]
    pub offset: usize,

    /// Search PATH recursively.
    #[arg(short = 'R', long)]
    pub recursive: bool,

    /// Print the matched source line under each position.
    #[arg(short, long)]
    pub verbose: bool,

    /// Enable debug logging (honours RUST_LOG).
    #[arg(long)]
    pub debug: bool,

    /// Import search root; repeatable. Defaults to the `src` directory of
    /// every GOPATH entry.
    #[arg(long = "root", value_name = "DIR")]
    pub roots: Vec<PathBuf>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Directory to search.
    pub path: PathBuf,
}

/// How matches are printed.
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// `file:line:column`, one per line.
    Text,
    /// JSON array of match objects.
    Json,
}

/// Parse command-line arguments.
pub fn parse_args() -> Cli {
    Cli::parse()
}

/// Import search roots: the explicit ones, or `<entry>/src` for each entry
/// of a GOPATH-style list.
pub fn search_roots(explicit: &[PathBuf], gopath: Option<&OsStr>) -> Vec<PathBuf> {
    if !explicit.is_empty() {
        return explicit.to_vec();
    }
    gopath
        .map(|list| {
            std::env::split_paths(list)
                .filter(|entry| !entry.as_os_str().is_empty())
                .map(|entry| entry.join("src"))
                .collect()
        })
        .unwrap_or_default()
}

/// Resolve symlinks and make a path absolute.
pub fn canonical(path: &Path) -> Result<PathBuf> {
    std::fs::canonicalize(path).map_err(|e| RefError::io(path, e))
}

/// Go source files in `dir`, sorted. Files whose name starts with `.` are
/// left out.
pub fn go_files(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    let base = dir
        .to_str()
        .ok_or_else(|| RefError::Other(format!("Invalid UTF-8 in path: {:?}", dir)))?;
    let suffix = if recursive { "**/*.go" } else { "*.go" };
    let pattern = format!(
        "{}/{}",
        glob::Pattern::escape(base.trim_end_matches('/')),
        suffix
    );

    let mut files = Vec::new();
    for entry in glob::glob(&pattern)? {
        let path = entry.map_err(|e| {
            let path = e.path().to_path_buf();
            RefError::io(path, e.into_error())
        })?;
        let hidden = path
            .file_name()
            .and_then(|n| n.to_str())
            .map_or(true, |n| n.starts_with('.'));
        if path.is_file() && !hidden {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// One printed match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchRecord {
    /// File, relative to the working directory when under it.
    pub file: String,
    /// 1-based line.
    pub line: usize,
    /// 1-based column.
    pub column: usize,
    /// Byte offset.
    pub offset: usize,
    /// Source line of the match, in verbose mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Source lines of reported files, read once per file.
#[derive(Debug, Default)]
struct SourceLines {
    files: HashMap<PathBuf, Rope>,
}

impl SourceLines {
    fn line(&mut self, path: &Path, line: usize) -> Result<String> {
        if !self.files.contains_key(path) {
            let text = std::fs::read_to_string(path).map_err(|e| RefError::io(path, e))?;
            self.files.insert(path.to_path_buf(), Rope::from_str(&text));
        }
        let Some(rope) = self.files.get(path) else {
            return Ok(String::new());
        };
        if line == 0 || line > rope.len_lines() {
            return Ok(String::new());
        }
        Ok(rope
            .line(line - 1)
            .to_string()
            .trim_end_matches(['\n', '\r'])
            .to_string())
    }
}

/// Path as shown to the user.
pub fn display_path(path: &Path, cwd: Option<&Path>) -> String {
    cwd.and_then(|cwd| path.strip_prefix(cwd).ok())
        .unwrap_or(path)
        .display()
        .to_string()
}

/// Turn reported positions into printable records.
pub fn records(
    positions: &[SourcePosition],
    verbose: bool,
    cwd: Option<&Path>,
) -> Result<Vec<MatchRecord>> {
    let mut lines = SourceLines::default();
    positions
        .iter()
        .map(|position| {
            let text = if verbose {
                Some(lines.line(&position.filename, position.line)?)
            } else {
                None
            };
            Ok(MatchRecord {
                file: display_path(&position.filename, cwd),
                line: position.line,
                column: position.column,
                offset: position.offset,
                text,
            })
        })
        .collect()
}

/// Render records in the requested format.
pub fn render(records: &[MatchRecord], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(records)? + "\n"),
        OutputFormat::Text => {
            let mut out = String::new();
            for record in records {
                out.push_str(&format!("{}:{}:{}\n", record.file, record.line, record.column));
                if let Some(text) = &record.text {
                    out.push_str(text);
                    out.push('\n');
                }
            }
            Ok(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_explicit_roots_win_over_gopath() {
        let explicit = vec![PathBuf::from("/work/src")];
        let roots = search_roots(&explicit, Some(OsStr::new("/go")));
        assert_eq!(roots, explicit);
    }

    #[test]
    fn test_gopath_entries_get_src_suffix() {
        let list = std::env::join_paths(["/go", "/home/me/go"]).unwrap();
        let roots = search_roots(&[], Some(&list));
        assert_eq!(
            roots,
            vec![PathBuf::from("/go/src"), PathBuf::from("/home/me/go/src")]
        );
        assert!(search_roots(&[], None).is_empty());
    }

    #[test]
    fn test_go_files_skip_hidden_and_other_files() {
        let tmp = TempDir::new().unwrap();
        for name in ["b.go", "a.go", ".hidden.go", "notes.txt", "sub/c.go"] {
            let path = tmp.path().join(name);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, "package a\n").unwrap();
        }

        let flat = go_files(tmp.path(), false).unwrap();
        assert_eq!(flat, vec![tmp.path().join("a.go"), tmp.path().join("b.go")]);

        let deep = go_files(tmp.path(), true).unwrap();
        assert_eq!(deep.len(), 3);
        assert!(deep.contains(&tmp.path().join("sub/c.go")));
    }

    #[test]
    fn test_text_output_is_relative_and_verbose() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("a.go");
        std::fs::write(&file, "package a\n\nvar x = 1\n").unwrap();
        let rope = Rope::from_str("package a\n\nvar x = 1\n");
        let position = SourcePosition::from_offset(&file, &rope, 15);

        let plain = records(std::slice::from_ref(&position), false, Some(tmp.path())).unwrap();
        assert_eq!(render(&plain, OutputFormat::Text).unwrap(), "a.go:3:5\n");

        let verbose = records(&[position], true, Some(tmp.path())).unwrap();
        assert_eq!(
            render(&verbose, OutputFormat::Text).unwrap(),
            "a.go:3:5\nvar x = 1\n"
        );
    }

    #[test]
    fn test_json_output_has_fields() {
        let record = MatchRecord {
            file: "a.go".to_string(),
            line: 3,
            column: 5,
            offset: 15,
            text: None,
        };
        let out = render(&[record], OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value[0]["file"], "a.go");
        assert_eq!(value[0]["line"], 3);
        assert_eq!(value[0]["column"], 5);
        assert_eq!(value[0]["offset"], 15);
        assert!(value[0].get("text").is_none());
    }
}
