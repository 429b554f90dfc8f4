use anyhow::{Context, Result};
use comicdex_core::{AuditSink, DocId, Document};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;

#[derive(Serialize)]
struct Entry<'a> {
    id: DocId,
    logged_at: String,
    document: &'a Document,
}

#[derive(Deserialize)]
struct EntryId {
    id: DocId,
}

/// Append-only JSON-lines log of processed documents.
///
/// Ids already present in the file are not written again, so re-running after
/// an aborted update does not duplicate entries.
pub struct AuditLog {
    path: PathBuf,
    out: BufWriter<File>,
    seen: HashSet<DocId>,
}

impl AuditLog {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let mut seen = HashSet::new();
        if path.exists() {
            let reader = BufReader::new(File::open(&path).with_context(|| format!("reading {}", path.display()))?);
            for line in reader.lines() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<EntryId>(&line) {
                    Ok(entry) => {
                        seen.insert(entry.id);
                    }
                    Err(e) => tracing::warn!(error = %e, "skipping unreadable audit line"),
                }
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("opening {}", path.display()))?;
        Ok(Self { path, out: BufWriter::new(file), seen })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }
}

impl AuditSink for AuditLog {
    fn record(&mut self, id: DocId, doc: &Document) -> Result<()> {
        if self.seen.contains(&id) {
            return Ok(());
        }
        let logged_at = time::OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default();
        serde_json::to_writer(&mut self.out, &Entry { id, logged_at, document: doc })?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        self.seen.insert(id);
        Ok(())
    }
}
