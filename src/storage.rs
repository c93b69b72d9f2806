//! CSV persistence for the metadata and derived tables.

use std::path::Path;

use anyhow::Context;
use tracing::warn;

use crate::dataset::DerivedTable;
use crate::models::{MetadataRecord, RawRecord};

/// Write the metadata table, replacing any existing file.
pub fn write_metadata(path: &Path, records: &[MetadataRecord]) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create metadata table at {}", path.display()))?;

    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read the metadata table strictly, for consumers that need every field
/// present (the asset fetcher in particular).
pub fn read_metadata(path: &Path) -> anyhow::Result<Vec<MetadataRecord>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open metadata table at {}", path.display()))?;

    let mut records = Vec::new();
    for result in reader.deserialize() {
        let record: MetadataRecord =
            result.with_context(|| format!("Malformed row in {}", path.display()))?;
        records.push(record);
    }
    Ok(records)
}

/// Read the metadata table leniently. The table may have been hand-edited
/// or produced elsewhere, so columns are resolved by header name and a
/// cell that fails to parse is logged and treated as missing rather than
/// failing the file. This is the form the cleaning stage consumes.
pub fn read_raw(path: &Path) -> anyhow::Result<Vec<RawRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open metadata table at {}", path.display()))?;

    let columns = RawColumns::resolve(reader.headers()?);

    let mut records = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let row = result.with_context(|| format!("Unreadable row in {}", path.display()))?;
        // Header is line 1, data starts at line 2.
        records.push(columns.decode(&row, index + 2));
    }
    Ok(records)
}

/// Column positions in the raw table, resolved from the header once.
struct RawColumns {
    id: Option<usize>,
    content_type: Option<usize>,
    image_type: Option<usize>,
    category: Option<usize>,
    colors: Option<usize>,
    editor_choice: Option<usize>,
    order: Option<usize>,
    tags: Option<usize>,
    views: Option<usize>,
    downloads: Option<usize>,
    likes: Option<usize>,
    comments: Option<usize>,
    url: Option<usize>,
}

impl RawColumns {
    fn resolve(headers: &csv::StringRecord) -> Self {
        let find = |name: &str| headers.iter().position(|h| h == name);
        Self {
            id: find("ID"),
            content_type: find("Content_Type"),
            image_type: find("Image_Type"),
            category: find("Category"),
            colors: find("Colors"),
            editor_choice: find("Editor_Choice"),
            order: find("Order"),
            tags: find("Tags"),
            views: find("Views"),
            downloads: find("Downloads"),
            likes: find("Likes"),
            comments: find("Comments"),
            url: find("URL"),
        }
    }

    fn decode(&self, row: &csv::StringRecord, line: usize) -> RawRecord {
        let cell = |col: Option<usize>| col.and_then(|i| row.get(i)).filter(|s| !s.is_empty());
        let text = |col: Option<usize>| cell(col).map(|s| s.to_string());

        RawRecord {
            id: lenient_id(cell(self.id), line),
            content_type: text(self.content_type),
            image_type: text(self.image_type),
            category: text(self.category),
            colors: text(self.colors),
            editor_choice: text(self.editor_choice),
            order: text(self.order),
            tags: text(self.tags),
            views: lenient_number(cell(self.views), "Views", line),
            downloads: lenient_number(cell(self.downloads), "Downloads", line),
            likes: lenient_number(cell(self.likes), "Likes", line),
            comments: lenient_number(cell(self.comments), "Comments", line),
            url: text(self.url),
        }
    }
}

/// Parse an id cell, accepting integers that external tools rewrote as
/// floats (`"123.0"`). Anything else is treated as missing.
fn lenient_id(value: Option<&str>, line: usize) -> Option<u64> {
    let raw = value?.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(v) = raw.parse::<u64>() {
        return Some(v);
    }
    match raw.parse::<f64>() {
        Ok(v) if v >= 0.0 && v.fract() == 0.0 && v <= u64::MAX as f64 => Some(v as u64),
        _ => {
            warn!(line, value = raw, "unparseable ID cell treated as missing");
            None
        }
    }
}

/// Parse a numeric cell, treating garbage as missing.
fn lenient_number(value: Option<&str>, column: &str, line: usize) -> Option<f64> {
    let raw = value?.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Some(v),
        _ => {
            warn!(
                line,
                column,
                value = raw,
                "unparseable numeric cell treated as missing"
            );
            None
        }
    }
}

/// Write the derived table. The header is dynamic: one-hot columns depend
/// on the image types present in the run that produced the table.
pub fn write_derived(path: &Path, table: &DerivedTable) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create derived table at {}", path.display()))?;

    writer.write_record(table.headers())?;
    for row in table.rows() {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::engineer;
    use crate::models::ContentType;

    fn record(id: u64) -> MetadataRecord {
        MetadataRecord {
            id,
            content_type: ContentType::Ai,
            image_type: "photo".to_string(),
            category: "Unknown".to_string(),
            colors: "Unknown".to_string(),
            editor_choice: "Unknown".to_string(),
            order: "popular".to_string(),
            tags: "sky, cloud".to_string(),
            views: 100,
            downloads: 10,
            likes: 5,
            comments: 1,
            url: format!("https://img.example/{}.jpg", id),
        }
    }

    #[test]
    fn test_metadata_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metadata.csv");
        let records = vec![record(1), record(2)];

        write_metadata(&path, &records).unwrap();
        let read_back = read_metadata(&path).unwrap();
        assert_eq!(read_back, records);
    }

    #[test]
    fn test_read_raw_tolerates_empty_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metadata.csv");
        std::fs::write(
            &path,
            "ID,Content_Type,Image_Type,Category,Colors,Editor_Choice,Order,Tags,Views,Downloads,Likes,Comments,URL\n\
             ,authentic,photo,,,,popular,,100,10,5,1,https://img.example/a.jpg\n\
             2,,photo,Unknown,Unknown,Unknown,popular,sky,,10,5,1,\n",
        )
        .unwrap();

        let rows = read_raw(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, None);
        assert_eq!(rows[0].category, None);
        assert_eq!(rows[1].id, Some(2));
        assert_eq!(rows[1].content_type, None);
        assert_eq!(rows[1].views, None);
    }

    #[test]
    fn test_read_raw_treats_unparseable_cells_as_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metadata.csv");
        // Hand-edited table: a float-rewritten id, a non-numeric counter,
        // and a fractional id that cannot identify a row.
        std::fs::write(
            &path,
            "ID,Content_Type,Image_Type,Category,Colors,Editor_Choice,Order,Tags,Views,Downloads,Likes,Comments,URL\n\
             123.0,authentic,photo,Unknown,Unknown,Unknown,popular,sky,abc,10,2.5,1,https://img.example/a.jpg\n\
             12.5,authentic,photo,Unknown,Unknown,Unknown,popular,sea,100,10,5,1,https://img.example/b.jpg\n",
        )
        .unwrap();

        let rows = read_raw(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, Some(123));
        assert_eq!(rows[0].views, None);
        assert_eq!(rows[0].likes, Some(2.5));
        assert_eq!(rows[0].downloads, Some(10.0));
        assert_eq!(rows[1].id, None);
        assert_eq!(rows[1].views, Some(100.0));
    }

    #[test]
    fn test_read_raw_resolves_columns_by_header_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metadata.csv");
        // Reordered and partial header: only the named columns are read.
        std::fs::write(
            &path,
            "Views,ID,Tags\n50,7,mountain\n",
        )
        .unwrap();

        let rows = read_raw(&path).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, Some(7));
        assert_eq!(rows[0].views, Some(50.0));
        assert_eq!(rows[0].tags.as_deref(), Some("mountain"));
        assert_eq!(rows[0].content_type, None);
    }

    #[test]
    fn test_write_derived_header_matches_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dataset.csv");
        let table = engineer(&[record(1), record(2)]);

        write_derived(&path, &table).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let header = contents.lines().next().unwrap();
        assert_eq!(header.split(',').count(), table.headers().len());
        assert!(header.starts_with("ID,Content_Type"));
        assert!(header.ends_with("Image_Type_photo"));
        assert_eq!(contents.lines().count(), 3);
    }
}
