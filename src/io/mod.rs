//! Raw input readers.
//!
//! Vendor binary decoders are external collaborators; the engine only needs
//! something that produces a [`RawDataset`]. Header CSV is the one format
//! bundled here, because nearly every instrument or logger can export it:
//! each column becomes a raw field, with types inferred from the data.

use std::fs::File;
use std::io::Seek;
use std::path::Path;
use std::sync::Arc;

use arrow::compute::concat_batches;
use arrow::csv::reader::Format;
use arrow::csv::ReaderBuilder;
use arrow::record_batch::RecordBatch;

use crate::dataset::RawDataset;
use crate::error::DataError;

/// Rows sampled when inferring CSV column types.
const INFER_MAX_RECORDS: usize = 1000;

/// Reads a header CSV file into a raw dataset, one field per column.
pub fn read_raw_csv(path: &Path) -> Result<RawDataset, DataError> {
    let mut file = File::open(path)?;
    let format = Format::default().with_header(true);
    let (schema, _) = format.infer_schema(&mut file, Some(INFER_MAX_RECORDS))?;
    file.rewind()?;

    let schema = Arc::new(schema);
    let reader = ReaderBuilder::new(schema.clone())
        .with_format(format)
        .build(file)?;
    let batches: Vec<RecordBatch> = reader.collect::<Result<Vec<_>, _>>()?;
    let combined = concat_batches(&schema, &batches)?;

    let mut raw = RawDataset::new();
    for (field, column) in schema.fields().iter().zip(combined.columns()) {
        raw.insert(field.name().clone(), column.clone());
    }
    Ok(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_columns_as_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "time,pitch,label").unwrap();
        writeln!(file, "100,1.5,a").unwrap();
        writeln!(file, "110,-0.5,b").unwrap();
        file.flush().unwrap();

        let raw = read_raw_csv(file.path()).unwrap();
        assert_eq!(raw.fields.len(), 3);
        assert_eq!(raw.get("time").unwrap().shape, vec![2]);
        assert!(raw.get("pitch").is_some());
        assert!(raw.get("label").is_some());
    }
}
