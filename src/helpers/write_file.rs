use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::prelude::*;

/// Replace `path` with `content` through a rename, so that readers never see
/// a partially written file.
pub(crate) fn write_atomically(path: &Path, content: &str) -> Result<()> {
    let dir = path
        .parent()
        .with_context(|| format!("{} has no parent directory", path.display()))?;
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let mut file = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create a temporary file in {}", dir.display()))?;
    file.write_all(content.as_bytes())?;
    file.persist(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    debug!("Wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_atomically_creates_and_replaces() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("timing_data").join("linux-perf_timing.json");

        write_atomically(&path, "[]\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]\n");

        write_atomically(&path, "[\n  {}\n]\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[\n  {}\n]\n");
        assert_eq!(std::fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
    }
}
