//! Fire-and-forget launch of the labeler GUI.

use std::ffi::OsStr;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};

use crate::config::ToolSettings;
use crate::process::{
    resolve_conda_executable, resolve_tool, CondaFallback, ProcessError, ProcessResult,
    ToolCandidate,
};

/// Launch the labeler and return the detached child.
///
/// Resolution order is fixed: the configured override path, then
/// `sleap-label` on the search path, then
/// `conda run --no-capture-output -n <env> sleap-label`. Unlike the
/// batch runner this is a single launch, not a loop - failure to start
/// at any tier surfaces one actionable error instead of a log entry.
pub fn launch_labeler(
    tools: &ToolSettings,
    search_path: Option<&OsStr>,
) -> ProcessResult<Child> {
    let fallback = CondaFallback {
        conda: resolve_conda_executable(search_path, home_dir().as_deref()),
        env: tools.conda_env.clone(),
        command: vec!["sleap-label".to_string()],
    };
    let resolved = resolve_tool(
        tools.labeler_override.as_deref(),
        &[],
        &[ToolCandidate {
            binary: "sleap-label",
            args: &[],
        }],
        search_path,
        Some(&fallback),
    )?;

    tracing::info!(
        "Launching labeler: {} {}",
        resolved.program.display(),
        resolved.leading_args.join(" ")
    );

    Command::new(&resolved.program)
        .args(&resolved.leading_args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ProcessError::tool_not_found(resolved.program.to_string_lossy())
            } else {
                ProcessError::io(
                    format!("launching {}", resolved.program.display()),
                    e,
                )
            }
        })
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[cfg(unix)]
    #[test]
    fn launches_labeler_from_search_path() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let labeler = dir.path().join("sleap-label");
        fs::write(&labeler, "#!/bin/sh\nexit 0\n").unwrap();
        fs::set_permissions(&labeler, fs::Permissions::from_mode(0o755)).unwrap();

        let tools = ToolSettings::default();
        let mut child = launch_labeler(&tools, Some(dir.path().as_os_str())).unwrap();
        let status = child.wait().unwrap();
        assert!(status.success());
    }

    #[cfg(unix)]
    #[test]
    fn override_beats_search_path() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("launched_via_override");
        let override_tool = dir.path().join("my-labeler");
        fs::write(
            &override_tool,
            format!("#!/bin/sh\ntouch {}\nexit 0\n", marker.display()),
        )
        .unwrap();
        fs::set_permissions(&override_tool, fs::Permissions::from_mode(0o755)).unwrap();

        let tools = ToolSettings {
            labeler_override: Some(override_tool),
            ..ToolSettings::default()
        };
        let mut child = launch_labeler(&tools, Some(OsStr::new(""))).unwrap();
        child.wait().unwrap();
        assert!(marker.exists());
    }
}
