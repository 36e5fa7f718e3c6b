//! Three-tier resolution for optional external tools.
//!
//! The pose-tracking tools are often installed inside a conda
//! environment rather than on PATH, so resolution runs in a fixed,
//! testable order:
//!
//! 1. an explicit override path (typically from an environment variable),
//! 2. candidate binaries on the search path,
//! 3. a `conda run` fallback into a named environment.
//!
//! Resolution is a pure lookup - nothing is spawned - and the search
//! path can be injected, so it is testable without real tools installed.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use super::runner::CommandSpec;
use super::types::{ProcessError, ProcessResult};

/// A resolved executable plus the arguments that must precede the
/// caller's own (e.g. `run --no-capture-output -n sleap sleap-nn track`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCommand {
    /// Executable to spawn.
    pub program: PathBuf,
    /// Arguments the resolution tier requires before any user arguments.
    pub leading_args: Vec<String>,
}

impl ResolvedCommand {
    /// Start building a [`CommandSpec`] from this resolution.
    pub fn to_spec(&self) -> CommandSpec {
        CommandSpec::new(&self.program).args(self.leading_args.iter().cloned())
    }
}

/// One binary to probe on the search path, with the arguments it needs.
///
/// `sleap-nn-track` needs no subcommand while `sleap-nn` needs `track`,
/// so each candidate carries its own argument prefix.
#[derive(Debug, Clone, Copy)]
pub struct ToolCandidate<'a> {
    /// Binary name to look up.
    pub binary: &'a str,
    /// Arguments required when this candidate is used.
    pub args: &'a [&'a str],
}

/// Fallback invocation through `conda run` in a named environment.
#[derive(Debug, Clone)]
pub struct CondaFallback {
    /// The conda executable.
    pub conda: PathBuf,
    /// Environment name to run in.
    pub env: String,
    /// Command (and any subcommands) to run inside the environment.
    pub command: Vec<String>,
}

/// Resolve a tool using override -> search path -> conda fallback.
///
/// An override that does not exist on disk is skipped rather than
/// reported, matching the behavior users expect from a stale
/// environment variable. Returns [`ProcessError::ToolNotFound`] naming
/// the primary candidate when every tier fails.
///
/// Pass `search_path` to resolve against an injected PATH-like string
/// instead of the process environment.
pub fn resolve_tool(
    override_path: Option<&Path>,
    override_args: &[&str],
    candidates: &[ToolCandidate<'_>],
    search_path: Option<&OsStr>,
    fallback: Option<&CondaFallback>,
) -> ProcessResult<ResolvedCommand> {
    if let Some(path) = override_path {
        if path.exists() {
            tracing::debug!("Tool resolved via override: {}", path.display());
            return Ok(ResolvedCommand {
                program: path.to_path_buf(),
                leading_args: override_args.iter().map(|s| s.to_string()).collect(),
            });
        }
        tracing::warn!("Tool override does not exist, ignoring: {}", path.display());
    }

    for candidate in candidates {
        if let Some(found) = lookup(candidate.binary, search_path) {
            tracing::debug!("Tool resolved on search path: {}", found.display());
            return Ok(ResolvedCommand {
                program: found,
                leading_args: candidate.args.iter().map(|s| s.to_string()).collect(),
            });
        }
    }

    if let Some(fb) = fallback {
        tracing::debug!(
            "Tool resolved via conda env '{}': {}",
            fb.env,
            fb.command.join(" ")
        );
        let mut leading_args = vec![
            "run".to_string(),
            "--no-capture-output".to_string(),
            "-n".to_string(),
            fb.env.clone(),
        ];
        leading_args.extend(fb.command.iter().cloned());
        return Ok(ResolvedCommand {
            program: fb.conda.clone(),
            leading_args,
        });
    }

    let name = candidates
        .first()
        .map(|c| c.binary.to_string())
        .unwrap_or_else(|| "<unnamed tool>".to_string());
    Err(ProcessError::tool_not_found(name))
}

/// Locate the conda executable for fallback invocations.
///
/// Probes the search path first, then the well-known `condabin`
/// locations under the home directory. Falls back to the bare name so
/// the eventual spawn error names the right tool.
pub fn resolve_conda_executable(search_path: Option<&OsStr>, home: Option<&Path>) -> PathBuf {
    if let Some(found) = lookup("conda", search_path) {
        return found;
    }

    if let Some(home) = home {
        for prefix in ["anaconda3", "miniconda3"] {
            let candidate = home.join(prefix).join("condabin").join("conda");
            if candidate.exists() {
                return candidate;
            }
        }
    }

    PathBuf::from("conda")
}

fn lookup(binary: &str, search_path: Option<&OsStr>) -> Option<PathBuf> {
    match search_path {
        Some(paths) => {
            let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            which::which_in(binary, Some(paths), cwd).ok()
        }
        None => which::which(binary).ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[cfg(unix)]
    fn fake_tool(dir: &Path, name: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join(name);
        fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    const TRACKER_CANDIDATES: &[ToolCandidate<'static>] = &[
        ToolCandidate {
            binary: "sleap-nn-track",
            args: &[],
        },
        ToolCandidate {
            binary: "sleap-nn",
            args: &["track"],
        },
    ];

    #[test]
    fn override_wins_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("custom-tracker");
        fs::write(&tool, "").unwrap();

        let resolved = resolve_tool(
            Some(&tool),
            &["track"],
            TRACKER_CANDIDATES,
            Some(OsStr::new("")),
            None,
        )
        .unwrap();

        assert_eq!(resolved.program, tool);
        assert_eq!(resolved.leading_args, vec!["track"]);
    }

    #[test]
    fn missing_override_is_skipped() {
        let result = resolve_tool(
            Some(Path::new("/nonexistent/tracker")),
            &[],
            TRACKER_CANDIDATES,
            Some(OsStr::new("")),
            None,
        );
        assert!(matches!(result, Err(ProcessError::ToolNotFound { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn search_path_candidates_probe_in_order() {
        let dir = tempfile::tempdir().unwrap();
        fake_tool(dir.path(), "sleap-nn");

        let resolved = resolve_tool(
            None,
            &[],
            TRACKER_CANDIDATES,
            Some(dir.path().as_os_str()),
            None,
        )
        .unwrap();

        assert!(resolved.program.ends_with("sleap-nn"));
        assert_eq!(resolved.leading_args, vec!["track"]);

        // A more specific binary appearing later takes priority.
        fake_tool(dir.path(), "sleap-nn-track");
        let resolved = resolve_tool(
            None,
            &[],
            TRACKER_CANDIDATES,
            Some(dir.path().as_os_str()),
            None,
        )
        .unwrap();
        assert!(resolved.program.ends_with("sleap-nn-track"));
        assert!(resolved.leading_args.is_empty());
    }

    #[test]
    fn conda_fallback_builds_run_invocation() {
        let fallback = CondaFallback {
            conda: PathBuf::from("/opt/conda/bin/conda"),
            env: "sleap".to_string(),
            command: vec!["sleap-nn".to_string(), "track".to_string()],
        };

        let resolved = resolve_tool(
            None,
            &[],
            TRACKER_CANDIDATES,
            Some(OsStr::new("")),
            Some(&fallback),
        )
        .unwrap();

        assert_eq!(resolved.program, PathBuf::from("/opt/conda/bin/conda"));
        assert_eq!(
            resolved.leading_args,
            vec!["run", "--no-capture-output", "-n", "sleap", "sleap-nn", "track"]
        );
    }

    #[test]
    fn not_found_names_primary_candidate() {
        let err = resolve_tool(None, &[], TRACKER_CANDIDATES, Some(OsStr::new("")), None)
            .unwrap_err();
        assert!(err.to_string().contains("sleap-nn-track"));
    }

    #[test]
    fn conda_probe_checks_condabin_under_home() {
        let home = tempfile::tempdir().unwrap();
        let condabin = home.path().join("miniconda3").join("condabin");
        fs::create_dir_all(&condabin).unwrap();
        fs::write(condabin.join("conda"), "").unwrap();

        let found = resolve_conda_executable(Some(OsStr::new("")), Some(home.path()));
        assert_eq!(found, condabin.join("conda"));
    }

    #[test]
    fn conda_probe_defaults_to_bare_name() {
        let found = resolve_conda_executable(Some(OsStr::new("")), None);
        assert_eq!(found, PathBuf::from("conda"));
    }

    #[test]
    fn resolved_command_builds_spec() {
        let resolved = ResolvedCommand {
            program: PathBuf::from("conda"),
            leading_args: vec!["run".into(), "-n".into(), "sleap".into()],
        };
        let spec = resolved.to_spec().arg("--data_path").arg("a.mp4");
        assert_eq!(
            spec.arg_list(),
            &["run", "-n", "sleap", "--data_path", "a.mp4"]
        );
    }
}
