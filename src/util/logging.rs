use std::path::Path;

use flexi_logger::{Age, Cleanup, Criterion, Duplicate, FileSpec, Logger, Naming};
use once_cell::sync::OnceCell;

static LOGGER: OnceCell<()> = OnceCell::new();

/// Start file logging under `log_dir`, mirrored to stderr. Later calls are
/// no-ops.
pub fn init(log_dir: &Path) -> anyhow::Result<()> {
    LOGGER.get_or_try_init(|| -> anyhow::Result<()> {
        std::fs::create_dir_all(log_dir)?;
        // The handle must outlive the program or buffered records are lost.
        let handle = Logger::try_with_env_or_str("info")?
            .duplicate_to_stderr(Duplicate::Info)
            .log_to_file(FileSpec::default().directory(log_dir).basename("reader"))
            .rotate(
                Criterion::AgeOrSize(Age::Day, 10_000_000),
                Naming::Numbers,
                Cleanup::KeepLogFiles(7),
            )
            .start()?;
        std::mem::forget(handle);
        Ok(())
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logger_creates_directory_once() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log_dir = temp_dir.path().join("logs");
        init(&log_dir).unwrap();
        assert!(log_dir.exists());
        init(&temp_dir.path().join("ignored")).unwrap();
        assert!(!temp_dir.path().join("ignored").exists());
    }
}
