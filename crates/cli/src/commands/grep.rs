//! `foundry grep`: a small built-in grep used by editor/search integrations
//! that want matches without shelling out to the system `grep`.

use std::path::{Path, PathBuf};

use anyhow::Result;
use regex::RegexBuilder;

pub struct GrepArgs {
    pub pattern: String,
    pub targets: Vec<PathBuf>,
    pub recursive: bool,
    pub ignore_case: bool,
    pub extended_regexp: bool,
    pub word_regexp: bool,
    pub max_count: Option<usize>,
    pub context_lines: Option<usize>,
}

fn walk(path: &Path, recursive: bool, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    if path.is_file() {
        out.push(path.to_path_buf());
        return Ok(());
    }
    if !path.is_dir() {
        return Ok(());
    }
    for entry in std::fs::read_dir(path)? {
        let entry = entry?;
        let entry_path = entry.path();
        if entry_path.is_dir() {
            if recursive {
                walk(&entry_path, recursive, out)?;
            }
        } else {
            out.push(entry_path);
        }
    }
    Ok(())
}

pub async fn run(args: GrepArgs) -> Result<()> {
    // `extended_regexp` is accepted for command-line familiarity with POSIX
    // grep, but `regex` already parses an extended syntax, so there's
    // nothing to translate either way.
    let mut pattern = args.pattern.clone();
    if args.word_regexp {
        pattern = format!(r"\b{pattern}\b");
    }

    let re = RegexBuilder::new(&pattern)
        .case_insensitive(args.ignore_case)
        .build()?;

    let mut files = Vec::new();
    let targets = if args.targets.is_empty() {
        vec![PathBuf::from(".")]
    } else {
        args.targets
    };
    for target in &targets {
        walk(target, args.recursive, &mut files)?;
    }

    let mut total = 0usize;
    'files: for file in files {
        let Ok(contents) = std::fs::read_to_string(&file) else {
            continue;
        };
        let lines: Vec<&str> = contents.lines().collect();
        for (i, line) in lines.iter().enumerate() {
            if !re.is_match(line) {
                continue;
            }
            if let Some(ctx) = args.context_lines {
                let start = i.saturating_sub(ctx);
                let end = (i + ctx + 1).min(lines.len());
                for j in start..end {
                    println!("{}:{}:{}", file.display(), j + 1, lines[j]);
                }
                println!("--");
            } else {
                println!("{}:{}:{}", file.display(), i + 1, line);
            }
            total += 1;
            if let Some(max) = args.max_count {
                if total >= max {
                    break 'files;
                }
            }
        }
    }

    Ok(())
}
