//! Hit report export

use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

use crate::model::Hit;
use crate::repository::Database;

/// Write hits as CSV with a `repository,path` header
pub fn write_hits<W: Write>(hits: &[Hit], writer: W) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(["repository", "path"])?;
    for hit in hits {
        csv.write_record([hit.repository.as_str(), hit.path.as_str()])?;
    }
    csv.flush()?;
    Ok(())
}

/// Export every recorded hit to a CSV file; returns the number of rows
pub async fn export(db: &Database, out: &Path) -> Result<usize> {
    let hits = db.hits().await?;
    let file = std::fs::File::create(out)
        .with_context(|| format!("could not create '{}'", out.display()))?;
    write_hits(&hits, file)?;
    Ok(hits.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_and_quoting() {
        let hits = vec![
            Hit::new("alice/proj", "photos/IMG_0001.jpg"),
            Hit::new("bob/trips", "2019, summer/beach.jpg"),
        ];
        let mut out = Vec::new();
        write_hits(&hits, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "repository,path");
        assert_eq!(lines[1], "alice/proj,photos/IMG_0001.jpg");
        assert_eq!(lines[2], "bob/trips,\"2019, summer/beach.jpg\"");
    }

    #[test]
    fn test_empty_report_has_header() {
        let mut out = Vec::new();
        write_hits(&[], &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "repository,path\n");
    }
}
