//! `compile_commands.json` parsing, lookup, and C/C++/Vala argument
//! filtering.
//!
//! Ported from the original's `foundry-compile-commands.c`: directories are
//! interned once, and looking up a file's compile info can optionally
//! filter the stored argv down to just the switches a language server or
//! indexer cares about (include paths, defines, standard version) while
//! dropping compiler-specific noise (`-c`, `-o`, `-MF`, and the like).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use tracing::instrument;

use crate::errors::{FoundryError, Result};

/// One entry of a `compile_commands.json` file.
#[derive(Debug, Clone, Deserialize)]
struct RawEntry {
    directory: String,
    file: String,
    #[serde(default)]
    command: Option<String>,
    #[serde(default)]
    arguments: Option<Vec<String>>,
}

/// Compile information for a single source file, with its working directory
/// interned against every other entry sharing it.
#[derive(Debug, Clone)]
pub struct CompileInfo {
    pub directory: Arc<Path>,
    pub file: PathBuf,
    pub argv: Vec<String>,
}

/// An immutable index over a project's `compile_commands.json`, built once
/// via [`CompileCommands::load`] or [`CompileCommands::parse`].
pub struct CompileCommands {
    by_file: HashMap<PathBuf, CompileInfo>,
    vala: Vec<CompileInfo>,
}

/// Switch prefixes kept verbatim by `filter_c`. `-I`, `-include`, and
/// `-isystem` are handled separately since their path arguments need
/// absolutizing; `-M*` (dependency generation) is deliberately absent here
/// and dropped explicitly.
const C_CLASS_PREFIXES: &[&str] = &["-D", "-f", "-W", "-m", "-O", "-x", "-std=", "--std="];

/// `.h` fallback suffixes tried in order when no entry exists for the header
/// itself, matching the original's "a header has no compile command of its
/// own, borrow its implementation file's" behavior.
const HEADER_FALLBACK_SUFFIXES: &[&str] = &[".c", ".cc", ".cpp", ".cxx", ".c++"];

const VALA_PREFIXES: &[&str] = &["--pkg", "--vapidir", "--girdir", "--metadatadir"];

fn is_vala_file(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("vala")
}

fn intern_directory(interned: &mut HashMap<String, Arc<Path>>, directory: &str) -> Arc<Path> {
    if let Some(existing) = interned.get(directory) {
        return Arc::clone(existing);
    }
    let arc: Arc<Path> = Arc::from(Path::new(directory));
    interned.insert(directory.to_string(), Arc::clone(&arc));
    arc
}

/// Collapse `.`/`..` components without touching the filesystem (no
/// `canonicalize`, which would require the path to exist).
fn lexically_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            std::path::Component::ParentDir => {
                out.pop();
            }
            std::path::Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Resolve `value` to an absolute path, joining it against `directory` first
/// if it's relative, then lexically normalizing the result.
fn absolutize(value: &str, directory: &Path) -> PathBuf {
    let candidate = Path::new(value);
    if candidate.is_absolute() {
        lexically_normalize(candidate)
    } else {
        lexically_normalize(&directory.join(candidate))
    }
}

impl CompileCommands {
    /// Parse `compile_commands.json` content directly, without touching the
    /// filesystem (used by tests and by callers that already have the bytes
    /// in hand, e.g. read over an LSP transport).
    #[instrument(skip(contents))]
    pub fn parse(contents: &str) -> Result<CompileCommands> {
        let raw: Vec<RawEntry> = serde_json::from_str(contents)?;
        let mut interned = HashMap::new();
        let mut by_file = HashMap::new();
        let mut vala = Vec::new();

        for entry in raw {
            let argv = match entry.arguments {
                Some(args) => args,
                None => {
                    let command = entry.command.ok_or_else(|| {
                        FoundryError::invalid_data(
                            "compile_commands entry has neither `arguments` nor `command`",
                        )
                    })?;
                    shell_words::split(&command)
                        .map_err(|e| FoundryError::invalid_data(e.to_string()))?
                }
            };

            let directory = intern_directory(&mut interned, &entry.directory);
            let file = absolutize(&entry.file, &directory);
            let info = CompileInfo {
                directory,
                file: file.clone(),
                argv,
            };

            if is_vala_file(&file) {
                vala.push(info.clone());
            }
            by_file.insert(file, info);
        }

        Ok(CompileCommands { by_file, vala })
    }

    /// Load and parse `compile_commands.json` at `path`.
    pub fn load(path: &Path) -> Result<CompileCommands> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Look up the raw compile info for `file`.
    ///
    /// Falls back to an *alternate* file sharing the same directory when
    /// `file` has no entry of its own: a `*-private.h` header resolves to
    /// its same-named `.c`, and any other `.h` header resolves to the first
    /// of `.c`/`.cc`/`.cpp`/`.cxx`/`.c++` that has an entry, in that order —
    /// headers are rarely compiled directly, so they borrow the compile
    /// flags of the implementation file that includes them.
    pub fn lookup(&self, file: &Path) -> Option<&CompileInfo> {
        if let Some(info) = self.by_file.get(file) {
            return Some(info);
        }

        let name = file.file_name()?.to_str()?;
        let dir = file.parent().unwrap_or_else(|| Path::new(""));

        if let Some(stem) = name.strip_suffix("-private.h") {
            return self.by_file.get(&dir.join(format!("{stem}.c")));
        }

        if let Some(stem) = name.strip_suffix(".h") {
            for suffix in HEADER_FALLBACK_SUFFIXES {
                if let Some(info) = self.by_file.get(&dir.join(format!("{stem}{suffix}"))) {
                    return Some(info);
                }
            }
        }

        None
    }

    /// Filter `info`'s argv down to the C/C++ switches a language server or
    /// indexer cares about.
    ///
    /// The program name leads, followed by `-I{system_include}` for each of
    /// `system_includes` (in order), followed by the kept switches in their
    /// original relative order. `-I`/`-include`/`-isystem` path arguments are
    /// rewritten to absolute paths via `info.directory`; `-M*`
    /// dependency-generation flags are dropped.
    pub fn filter_c(info: &CompileInfo, system_includes: &[String]) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(program) = info.argv.first() {
            out.push(program.clone());
        }
        for system_include in system_includes {
            out.push(format!("-I{system_include}"));
        }

        let mut iter = info.argv.iter().skip(1).peekable();
        while let Some(arg) = iter.next() {
            if arg == "-I" {
                if let Some(path) = iter.next() {
                    out.push(format!("-I{}", absolutize(path, &info.directory).display()));
                }
                continue;
            }
            if let Some(rest) = arg.strip_prefix("-I") {
                out.push(format!("-I{}", absolutize(rest, &info.directory).display()));
                continue;
            }
            if arg == "-include" || arg == "-isystem" {
                out.push(arg.clone());
                if let Some(path) = iter.next() {
                    out.push(absolutize(path, &info.directory).display().to_string());
                }
                continue;
            }
            if arg.starts_with("-isystem") {
                out.push(arg.clone());
                continue;
            }
            if arg.starts_with("-M") {
                continue;
            }
            if arg == "-pthread" || C_CLASS_PREFIXES.iter().any(|p| arg.starts_with(p)) {
                out.push(arg.clone());
            }
        }
        out
    }

    /// Filter `info`'s argv down to the Vala compiler switches a consumer
    /// cares about (`--pkg`, `--vapidir`, `--girdir`, `--metadatadir`, and
    /// any bare `.vapi` file argument), in original order.
    pub fn filter_vala(info: &CompileInfo) -> Vec<String> {
        info.argv
            .iter()
            .filter(|arg| {
                VALA_PREFIXES.iter().any(|p| arg.starts_with(p)) || arg.ends_with(".vapi")
            })
            .cloned()
            .collect()
    }

    pub fn vala_entries(&self) -> &[CompileInfo] {
        &self.vala
    }

    pub fn len(&self) -> usize {
        self.by_file.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_file.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[
        {
            "directory": "/home/user/project/build",
            "file": "/home/user/project/src/main.c",
            "arguments": ["gcc", "-c", "-I/usr/include/glib-2.0", "-DNDEBUG", "-Wall", "-isystem", "/usr/include/sys", "-std=c11", "-MF", "main.d", "-o", "main.o", "main.c"]
        },
        {
            "directory": "/home/user/project/build",
            "file": "/home/user/project/src/app.vala",
            "arguments": ["valac", "--pkg", "gio-2.0", "--vapidir", "vapi", "app.vala"]
        }
    ]"#;

    #[test]
    fn parses_and_looks_up_by_exact_path() {
        let cc = CompileCommands::parse(SAMPLE).unwrap();
        assert_eq!(cc.len(), 2);
        let info = cc
            .lookup(Path::new("/home/user/project/src/main.c"))
            .unwrap();
        assert_eq!(info.argv[0], "gcc");
    }

    #[test]
    fn lookup_resolves_private_header_to_same_directory_c_file() {
        let json = r#"[{"directory": "/p", "file": "/p/src/x.c", "command": "cc -c /p/src/x.c"}]"#;
        let cc = CompileCommands::parse(json).unwrap();
        let info = cc.lookup(Path::new("/p/src/x-private.h")).unwrap();
        assert_eq!(info.file, Path::new("/p/src/x.c"));
    }

    #[test]
    fn lookup_resolves_generic_header_trying_suffixes_in_order() {
        let json = r#"[
            {"directory": "/p", "file": "/p/src/x.cc", "command": "c++ -c /p/src/x.cc"},
            {"directory": "/p", "file": "/p/src/x.cpp", "command": "c++ -c /p/src/x.cpp"}
        ]"#;
        let cc = CompileCommands::parse(json).unwrap();
        let info = cc.lookup(Path::new("/p/src/x.h")).unwrap();
        assert_eq!(info.file, Path::new("/p/src/x.cc"));
    }

    #[test]
    fn lookup_on_unrelated_missing_file_is_none() {
        let cc = CompileCommands::parse(SAMPLE).unwrap();
        assert!(cc.lookup(Path::new("/nowhere/gone.c")).is_none());
    }

    #[test]
    fn filter_c_drops_compiler_noise_and_dependency_flags() {
        let cc = CompileCommands::parse(SAMPLE).unwrap();
        let info = cc
            .lookup(Path::new("/home/user/project/src/main.c"))
            .unwrap();
        let filtered = CompileCommands::filter_c(info, &[]);
        assert!(!filtered.contains(&"-c".to_string()));
        assert!(!filtered.contains(&"-o".to_string()));
        assert!(!filtered.contains(&"main.o".to_string()));
        assert!(!filtered.iter().any(|a| a.starts_with("-MF")));
        assert!(!filtered.contains(&"main.d".to_string()));
        assert!(filtered.contains(&"-DNDEBUG".to_string()));
        assert!(filtered.contains(&"-std=c11".to_string()));
    }

    #[test]
    fn filter_c_prepends_program_then_system_includes() {
        let cc = CompileCommands::parse(SAMPLE).unwrap();
        let info = cc
            .lookup(Path::new("/home/user/project/src/main.c"))
            .unwrap();
        let system_includes = vec!["/opt/include".to_string()];
        let filtered = CompileCommands::filter_c(info, &system_includes);
        assert_eq!(filtered[0], "gcc");
        assert_eq!(filtered[1], "-I/opt/include");
    }

    #[test]
    fn filter_c_absolutizes_relative_include_paths() {
        let json = r#"[{"directory": "/p/build", "file": "/p/src/a.c", "command": "cc -DA -I../inc -c /p/src/a.c"}]"#;
        let cc = CompileCommands::parse(json).unwrap();
        let info = cc.lookup(Path::new("/p/src/a.c")).unwrap();
        let system_includes = vec!["/opt/include".to_string()];
        let filtered = CompileCommands::filter_c(info, &system_includes);
        assert_eq!(
            filtered,
            vec!["cc", "-I/opt/include", "-DA", "-I/p/inc"]
        );
    }

    #[test]
    fn filter_vala_keeps_vala_switches() {
        let cc = CompileCommands::parse(SAMPLE).unwrap();
        let info = &cc.vala_entries()[0];
        let filtered = CompileCommands::filter_vala(info);
        assert_eq!(filtered, vec!["--pkg", "gio-2.0", "--vapidir", "vapi"]);
    }

    #[test]
    fn command_string_is_tokenized() {
        let json = r#"[{"directory": "/d", "file": "/d/a.c", "command": "gcc -c a.c -o a.o"}]"#;
        let cc = CompileCommands::parse(json).unwrap();
        let info = cc.lookup(Path::new("/d/a.c")).unwrap();
        assert_eq!(info.argv, vec!["gcc", "-c", "a.c", "-o", "a.o"]);
    }
}
