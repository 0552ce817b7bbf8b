use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::prices::PricePoint;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Column order of the price CSV, matching the field order of [`PricePoint`].
pub const CSV_COLUMNS: [&str; 8] = [
    "valid_from",
    "valid_to",
    "value_inc_vat",
    "value_exc_vat",
    "price_gbp",
    "payment_method",
    "region_name",
    "region_code",
];

/// File-name friendly form of a region name: lowercase, spaces replaced by underscores.
pub fn region_slug(region_name: &str) -> String {
    region_name.to_lowercase().replace(' ', "_")
}

/// Path of the CSV export for `region_name` inside `output_dir`.
pub fn csv_path(output_dir: &Path, region_name: &str) -> PathBuf {
    output_dir.join(format!("octopus_agile_prices_{}.csv", region_slug(region_name)))
}

/// Writes `points` as CSV to `{output_dir}/octopus_agile_prices_{slug}.csv`, creating the
/// directory if needed, and returns the written path.
pub fn write_prices_csv(
    output_dir: &Path,
    region_name: &str,
    points: &[PricePoint],
) -> Result<PathBuf, ExportError> {
    fs::create_dir_all(output_dir)?;
    let path = csv_path(output_dir, region_name);

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(&path)?;
    writer.write_record(CSV_COLUMNS)?;
    for point in points {
        writer.serialize(point)?;
    }
    writer.flush()?;

    info!(path = %path.display(), rows = points.len(), "Wrote price CSV");
    Ok(path)
}
