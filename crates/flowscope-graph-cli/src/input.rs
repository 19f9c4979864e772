//! Input handling for analysis results from files or stdin.

use anyhow::{Context, Result};
use flowscope_graph::{AnalyzeResult, ResolvedSchemaMetadata};
use std::io::{self, Read};
use std::path::PathBuf;

/// Read analysis results from files or stdin.
///
/// If no files are provided, reads from stdin. Results from several files are
/// concatenated into one; statements without a source name are attributed to
/// the file they came from.
pub fn read_input(files: &[PathBuf]) -> Result<AnalyzeResult> {
    let results = if files.is_empty() {
        vec![read_from_stdin()?]
    } else {
        read_from_files(files)?
    };
    Ok(combine(results))
}

/// Read a result from stdin
fn read_from_stdin() -> Result<AnalyzeResult> {
    let mut content = String::new();
    io::stdin()
        .read_to_string(&mut content)
        .context("Failed to read from stdin")?;
    parse_result(&content, "<stdin>")
}

/// Read results from multiple files
fn read_from_files(files: &[PathBuf]) -> Result<Vec<AnalyzeResult>> {
    files
        .iter()
        .map(|path| {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read file: {}", path.display()))?;
            let name = path.display().to_string();
            let mut result = parse_result(&content, &name)?;
            for stmt in &mut result.statements {
                stmt.source_name.get_or_insert_with(|| name.clone());
            }
            Ok(result)
        })
        .collect()
}

fn parse_result(content: &str, name: &str) -> Result<AnalyzeResult> {
    serde_json::from_str(content)
        .with_context(|| format!("Failed to parse analysis result from {name}"))
}

fn combine(results: Vec<AnalyzeResult>) -> AnalyzeResult {
    let mut combined = AnalyzeResult::default();
    for result in results {
        combined.statements.extend(result.statements);
        combined.issues.extend(result.issues);
        if let Some(schema) = result.resolved_schema {
            combined
                .resolved_schema
                .get_or_insert_with(ResolvedSchemaMetadata::default)
                .tables
                .extend(schema.tables);
        }
        if combined.global_lineage.is_none() {
            combined.global_lineage = result.global_lineage;
        }
    }
    combined
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const RESULT: &str = r#"{
        "statements": [{
            "statementIndex": 0,
            "statementType": "SELECT",
            "nodes": [{ "id": "t", "type": "table", "label": "users" }],
            "edges": []
        }],
        "resolvedSchema": { "tables": [{ "name": "users", "columns": [] }] }
    }"#;

    #[test]
    fn test_read_single_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{RESULT}").unwrap();

        let result = read_input(&[file.path().to_path_buf()]).unwrap();
        assert_eq!(result.statements.len(), 1);
        assert_eq!(
            result.statements[0].source_name.as_deref(),
            Some(file.path().display().to_string().as_str())
        );
    }

    #[test]
    fn test_read_multiple_files() {
        let mut file1 = NamedTempFile::new().unwrap();
        let mut file2 = NamedTempFile::new().unwrap();
        write!(file1, "{RESULT}").unwrap();
        write!(file2, "{RESULT}").unwrap();

        let result =
            read_input(&[file1.path().to_path_buf(), file2.path().to_path_buf()]).unwrap();
        assert_eq!(result.statements.len(), 2);
        assert_eq!(result.resolved_schema.unwrap().tables.len(), 2);
    }

    #[test]
    fn test_read_missing_file() {
        let result = read_from_files(&[PathBuf::from("/nonexistent/result.json")]);
        assert!(result.is_err());
    }

    #[test]
    fn test_read_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "SELECT * FROM users").unwrap();

        let err = read_input(&[file.path().to_path_buf()]).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse analysis result"));
    }
}
