//! Minimal CLI: compile a schema, then lint it or check documents against it.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;

use crate::compile::convert;
use crate::runtime::Validator;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// compile a JSON Schema into a validator and optionally run documents through it
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// compile the schema and report construction errors, if any
    Compile(CompileArgs),
    /// compile the schema and validate JSON documents against it
    Check(CheckArgs),
}

#[derive(Args, Debug)]
struct CompileArgs {
    /// path to the JSON Schema document
    #[arg(long, short)]
    schema: PathBuf,
}

#[derive(Args, Debug)]
struct CheckArgs {
    /// path to the JSON Schema document
    #[arg(long, short)]
    schema: PathBuf,

    /// treat each input as newline-delimited JSON (one document per line)
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// one or more inputs; literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> Result<()> {
        match &self.cmd {
            Command::Compile(target) => {
                let _validator = load_schema(&target.schema)?;
                println!("{} {}", "ok".green().bold(), target.schema.display());
                Ok(())
            }
            Command::Check(target) => {
                let validator = load_schema(&target.schema)?;
                let mut checked = 0usize;
                let mut failed = 0usize;

                for source_path in resolve_file_path_patterns(&target.input)? {
                    let source = std::fs::read_to_string(&source_path).with_context(|| {
                        format!("failed to read input file {}", source_path.display())
                    })?;
                    if target.ndjson {
                        for (line_no, line) in source.lines().enumerate() {
                            if line.trim().is_empty() {
                                continue;
                            }
                            let doc = parse_json_with_path(line).with_context(|| {
                                format!("{}:{}", source_path.display(), line_no + 1)
                            })?;
                            let label = format!("{}:{}", source_path.display(), line_no + 1);
                            checked += 1;
                            failed += usize::from(!report_one(&validator, &label, &doc));
                        }
                    } else {
                        let doc = parse_json_with_path(&source)
                            .with_context(|| source_path.display().to_string())?;
                        let label = source_path.display().to_string();
                        checked += 1;
                        failed += usize::from(!report_one(&validator, &label, &doc));
                    }
                }

                if failed > 0 {
                    bail!("{failed} of {checked} documents failed validation");
                }
                println!("{checked} documents conform");
                Ok(())
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn load_schema(path: &Path) -> Result<Validator> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read schema file {}", path.display()))?;
    let schema = parse_json_with_path(&source)
        .with_context(|| format!("schema file {} is not valid JSON", path.display()))?;
    convert(&schema).with_context(|| format!("schema {} does not compile", path.display()))
}

/// Print one per-document result line; returns whether the document conformed.
fn report_one(validator: &Validator, label: &str, doc: &serde_json::Value) -> bool {
    match validator.check(doc) {
        Ok(_) => {
            println!("{} {label}", "✓".green());
            true
        }
        Err(issues) => {
            println!("{} {label}", "✗".red());
            for issue in issues.issues() {
                println!("    {issue}");
            }
            false
        }
    }
}

/// Deserialize with JSON-path context in error messages.
fn parse_json_with_path(src: &str) -> Result<serde_json::Value> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize(de).map_err(|err| {
        let path = err.path().to_string();
        anyhow!("at JSON path {path}: {}", err.into_inner())
    })
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                // An explicit glob that matches nothing is an input mistake.
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_paths_pass_through_unresolved() {
        let paths = resolve_file_path_patterns(["a/b.json", "c.json"]).unwrap();
        assert_eq!(paths, vec![PathBuf::from("a/b.json"), PathBuf::from("c.json")]);
    }

    #[test]
    fn empty_glob_is_an_error() {
        let err = resolve_file_path_patterns(["/nonexistent-dir-xyz/*.json"]).unwrap_err();
        assert!(err.to_string().contains("matched no files"));
    }

    #[test]
    fn parse_errors_carry_json_paths() {
        let err = parse_json_with_path(r#"{"a": {"b": [1, }]}}"#).unwrap_err();
        assert!(err.to_string().contains("at JSON path"));
    }
}
