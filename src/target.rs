//! # Build target: what to compile, with what, into what.
//!
//! [`BuildTarget`] is computed once from argv at startup and immutable for the
//! life of the process. It bundles:
//! - the watched source path,
//! - the compiler identity inferred from the file extension,
//! - the derived output artifact path (current directory, base name,
//!   `.exe` suffix on windows),
//! - the ordered compiler flags and program arguments.
//!
//! ## argv contract
//! ```text
//! cwatch <source-file> [compiler-flags...] [program-args...]
//! ```
//! Every token after the source file that begins with `-` is a compiler flag,
//! consumed in order until the first non-dash token; all remaining tokens are
//! passed verbatim to the compiled program. The split is positional and
//! order-dependent: `-x` *after* the first program argument is a program
//! argument, not a flag.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::UsageError;

/// Compiler identity, inferred from the source file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compiler {
    /// `.c` sources.
    Gcc,
    /// `.cpp` sources.
    Gpp,
}

impl Compiler {
    /// Maps a source path to a compiler by extension; `None` if unsupported.
    pub fn for_source(path: &Path) -> Option<Compiler> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("c") => Some(Compiler::Gcc),
            Some("cpp") => Some(Compiler::Gpp),
            _ => None,
        }
    }

    /// The executable name to invoke.
    pub fn command(&self) -> &'static str {
        match self {
            Compiler::Gcc => "gcc",
            Compiler::Gpp => "g++",
        }
    }
}

/// Immutable description of one compile/run cycle's inputs and outputs.
#[derive(Debug, Clone)]
pub struct BuildTarget {
    /// Watched source file, as given on the command line.
    pub source: PathBuf,
    /// Compiler selected by the source extension.
    pub compiler: Compiler,
    /// Output artifact path: source base name (+ `.exe` on windows), in the
    /// current working directory.
    pub artifact: PathBuf,
    /// Compiler flags, in argv order, appended after `-o <artifact>` so they
    /// can override defaults.
    pub compiler_flags: Vec<String>,
    /// Arguments passed verbatim to the compiled program.
    pub program_args: Vec<String>,
}

impl BuildTarget {
    /// Builds a target from argv tokens (without the program name).
    ///
    /// ## Errors
    /// - [`UsageError::MissingSource`] if no tokens were given
    /// - [`UsageError::UnsupportedExtension`] for anything but `.c`/`.cpp`
    pub fn from_args<I>(args: I) -> Result<Self, UsageError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        let source = PathBuf::from(args.next().ok_or(UsageError::MissingSource)?);
        let compiler = Compiler::for_source(&source).ok_or_else(|| {
            UsageError::UnsupportedExtension {
                path: source.clone(),
            }
        })?;

        let mut compiler_flags = Vec::new();
        let mut program_args = Vec::new();
        let mut in_flags = true;
        for tok in args {
            if in_flags && tok.starts_with('-') {
                compiler_flags.push(tok);
            } else {
                in_flags = false;
                program_args.push(tok);
            }
        }

        let artifact = artifact_path(&source);
        Ok(Self {
            source,
            compiler,
            artifact,
            compiler_flags,
            program_args,
        })
    }

    /// The artifact's bare file name, used for the best-effort kill-by-name
    /// fallback. Empty if the name is not valid UTF-8.
    pub fn artifact_name(&self) -> &str {
        self.artifact
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("")
    }
}

/// Derives the output artifact path from the source file name.
///
/// The artifact lands in the current working directory regardless of where
/// the source lives.
fn artifact_path(source: &Path) -> PathBuf {
    let mut name: OsString = source.file_stem().unwrap_or_default().to_os_string();
    if cfg!(windows) {
        name.push(".exe");
    }
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_flags_then_args_split() {
        let t = BuildTarget::from_args(argv(&["file.c", "-O2", "-Wall", "run1", "run2"])).unwrap();
        assert_eq!(t.compiler_flags, vec!["-O2", "-Wall"]);
        assert_eq!(t.program_args, vec!["run1", "run2"]);
    }

    #[test]
    fn test_bare_source_yields_empty_flags_and_args() {
        let t = BuildTarget::from_args(argv(&["file.cpp"])).unwrap();
        assert!(t.compiler_flags.is_empty());
        assert!(t.program_args.is_empty());
    }

    #[test]
    fn test_dash_after_first_program_arg_is_a_program_arg() {
        let t = BuildTarget::from_args(argv(&["file.c", "-O2", "run1", "-v"])).unwrap();
        assert_eq!(t.compiler_flags, vec!["-O2"]);
        assert_eq!(t.program_args, vec!["run1", "-v"]);
    }

    #[test]
    fn test_compiler_mapping() {
        assert_eq!(
            BuildTarget::from_args(argv(&["main.c"])).unwrap().compiler,
            Compiler::Gcc
        );
        assert_eq!(
            BuildTarget::from_args(argv(&["main.cpp"])).unwrap().compiler,
            Compiler::Gpp
        );
    }

    #[test]
    fn test_unsupported_extension_is_a_usage_error() {
        let err = BuildTarget::from_args(argv(&["file.py"])).unwrap_err();
        assert_eq!(err.as_label(), "usage_unsupported_extension");
    }

    #[test]
    fn test_missing_source_is_a_usage_error() {
        let err = BuildTarget::from_args(Vec::new()).unwrap_err();
        assert_eq!(err.as_label(), "usage_missing_source");
    }

    #[test]
    fn test_artifact_is_base_name_in_cwd() {
        let t = BuildTarget::from_args(argv(&["dir/deep/prog.c"])).unwrap();
        if cfg!(windows) {
            assert_eq!(t.artifact, PathBuf::from("prog.exe"));
        } else {
            assert_eq!(t.artifact, PathBuf::from("prog"));
        }
        assert_eq!(t.artifact_name(), t.artifact.to_str().unwrap());
    }
}
