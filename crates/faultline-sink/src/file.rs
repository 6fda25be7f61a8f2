//! Appends records to a file as JSON lines.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use parking_lot::Mutex;

use faultline_core::CategorizedRecord;

use crate::extension::Extension;

/// Writes one compact JSON document per line for each record.
pub struct FileExtension {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl FileExtension {
    /// Open `path` for appending, creating it if needed.
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    /// The file being written.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Extension for FileExtension {
    fn name(&self) -> &str {
        "file"
    }

    fn on_record(&self, record: &CategorizedRecord) -> anyhow::Result<()> {
        let line = serde_json::to_string(record)?;
        let mut writer = self.writer.lock();
        writeln!(writer, "{}", line)
            .and_then(|_| writer.flush())
            .with_context(|| format!("writing record to {}", self.path.display()))?;
        Ok(())
    }
}

impl std::fmt::Debug for FileExtension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileExtension")
            .field("path", &self.path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use faultline_core::EventKind;

    #[test]
    fn test_appends_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.jsonl");

        let ext = FileExtension::open(&path).unwrap();
        let mut first = CategorizedRecord::with_message(EventKind::Error, "first");
        first.set("Db", "Host", "primary");
        ext.on_record(&first).unwrap();
        ext.on_record(&CategorizedRecord::with_message(EventKind::Info, "second")).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        let parsed = CategorizedRecord::from_json(lines[0]).unwrap();
        assert_eq!(parsed.id(), first.id());
        assert_eq!(parsed.get("Db", "Host"), first.get("Db", "Host"));
        assert_eq!(CategorizedRecord::from_json(lines[1]).unwrap().message(), "second");
    }

    #[test]
    fn test_reopen_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.jsonl");

        for _ in 0..2 {
            let ext = FileExtension::open(&path).unwrap();
            ext.on_record(&CategorizedRecord::new(EventKind::Warning)).unwrap();
        }
        assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 2);
    }
}
