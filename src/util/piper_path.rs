use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    process::Command,
};

use thiserror::Error;

/// How Piper is launched on this machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PiperCommand {
    Executable(PathBuf),
    PythonModule,
    /// Shell-style command line taken from configuration.
    Custom(Vec<String>),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PiperPathError {
    #[error("no piper executable under {0} and python is not on PATH")]
    Unavailable(PathBuf),
    #[error("the Piper command override is empty")]
    EmptyOverride,
}

/// Prefer an explicit override, then a bundled executable, then
/// `python -m piper`.
pub fn resolve(runtime_dir: &Path, override_cmd: Option<&str>) -> Result<PiperCommand, PiperPathError> {
    if let Some(raw) = override_cmd {
        let parts = shlex::split(raw).unwrap_or_default();
        if parts.is_empty() {
            return Err(PiperPathError::EmptyOverride);
        }
        return Ok(PiperCommand::Custom(parts));
    }

    let candidate = runtime_dir
        .join("piper")
        .join(if cfg!(windows) { "piper.exe" } else { "piper" });
    if candidate.exists() {
        return Ok(PiperCommand::Executable(candidate));
    }

    if which::which("python").is_ok() {
        return Ok(PiperCommand::PythonModule);
    }

    Err(PiperPathError::Unavailable(runtime_dir.to_path_buf()))
}

pub fn command_to_args(cmd: &PiperCommand) -> (OsString, Vec<OsString>) {
    match cmd {
        PiperCommand::Executable(path) => (path.as_os_str().into(), vec![]),
        PiperCommand::PythonModule => (
            OsString::from("python"),
            vec!["-m".into(), "piper".into()],
        ),
        PiperCommand::Custom(parts) => {
            let mut parts = parts.iter().map(OsString::from);
            let program = parts.next().unwrap_or_default();
            (program, parts.collect())
        }
    }
}

impl PiperCommand {
    pub fn to_command(&self) -> Command {
        let (program, args) = command_to_args(self);
        let mut command = Command::new(program);
        command.args(args);
        command
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    #[test]
    fn override_is_split_like_a_shell() {
        let cmd = resolve(Path::new("runtime"), Some("python3 '/opt/my piper/run.py' --cuda")).unwrap();
        assert_eq!(
            cmd,
            PiperCommand::Custom(vec![
                "python3".into(),
                "/opt/my piper/run.py".into(),
                "--cuda".into()
            ])
        );
        let (program, args) = command_to_args(&cmd);
        assert_eq!(program, "python3");
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn empty_override_is_rejected() {
        assert_eq!(
            resolve(Path::new("runtime"), Some("   ")),
            Err(PiperPathError::EmptyOverride)
        );
    }

    #[test]
    fn bundled_executable_is_preferred() {
        let temp = assert_fs::TempDir::new().unwrap();
        let exe = temp.child(if cfg!(windows) { "piper/piper.exe" } else { "piper/piper" });
        exe.touch().unwrap();
        assert_eq!(
            resolve(temp.path(), None),
            Ok(PiperCommand::Executable(exe.path().to_path_buf()))
        );
    }

    #[test]
    fn python_module_runs_through_dash_m() {
        let (program, args) = command_to_args(&PiperCommand::PythonModule);
        assert_eq!(program, "python");
        assert_eq!(args, vec![OsString::from("-m"), OsString::from("piper")]);
    }
}
