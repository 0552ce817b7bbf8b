//! Human-readable reports printed by the command line tool.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono_tz::Europe::London;

use crate::catalog::Catalog;
use crate::client::OctopusClient;
use crate::error::OctopusError;
use crate::export::{self, ExportError};
use crate::prices::{PricePoint, PriceSummary};
use crate::region::Region;

const SAMPLE_ROWS: usize = 10;
const UK_TIME_FORMAT: &str = "%Y-%m-%d %H:%M %Z";

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error(transparent)]
    Api(#[from] OctopusError),

    #[error("failed to write CSV: {0}")]
    Export(#[from] ExportError),

    #[error("failed to write report: {0}")]
    Io(#[from] io::Error),
}

/// Lists every known region, ordered by name.
pub fn write_region_list<W: Write>(out: &mut W) -> io::Result<()> {
    let mut regions = Region::ALL;
    regions.sort_by_key(|region| region.name());

    writeln!(out, "Available regions:")?;
    for region in regions {
        writeln!(out, "  {} ({})", region.name(), region.code())?;
    }
    Ok(())
}

/// Skipped products, then the number of Agile products per region.
pub fn write_catalog_summary<W: Write>(out: &mut W, catalog: &Catalog) -> io::Result<()> {
    if !catalog.is_complete() {
        writeln!(
            out,
            "\nWarning: {} products could not be fetched and are missing from the catalog:",
            catalog.skipped.len()
        )?;
        for skipped in &catalog.skipped {
            writeln!(out, "  {}: {}", skipped.product_code, skipped.reason)?;
        }
    }

    writeln!(
        out,
        "\nFound {} Agile products across all regions",
        catalog.agile().count()
    )?;
    writeln!(out, "\nAvailable Agile products by region:")?;
    for (region, count) in catalog.agile_region_counts() {
        writeln!(out, "  {region}: {count} products")?;
    }
    Ok(())
}

/// Resolves `region_name` against `catalog`, fetches its last `days` days of prices, reports
/// them and writes the CSV export. Returns the path of the written CSV.
///
/// An unknown region lists the regions that do have Agile tariffs before returning
/// [`OctopusError::NotFound`].
pub async fn write_region_report<W: Write>(
    out: &mut W,
    client: &OctopusClient,
    catalog: &Catalog,
    region_name: &str,
    days: u32,
    output_dir: &Path,
) -> Result<PathBuf, ReportError> {
    writeln!(out, "\n{}", "=".repeat(50))?;
    writeln!(out, "Getting pricing data for {region_name}...")?;

    let tariff = match catalog.resolve(region_name) {
        Ok(tariff) => tariff,
        Err(e) => {
            if matches!(e, OctopusError::NotFound(_)) {
                writeln!(
                    out,
                    "Available regions: {}",
                    catalog.agile_region_names().join(", ")
                )?;
            }
            return Err(e.into());
        }
    };

    let prices = client.prices_for_tariff(tariff, days).await?;

    writeln!(out, "Region: {} ({})", tariff.region_name, tariff.region_code)?;
    writeln!(
        out,
        "Tariff: {} ({}, {})",
        tariff.tariff_code,
        tariff.product_name,
        tariff.payment_method.as_str()
    )?;
    writeln!(
        out,
        "\nRetrieved {} price points for {region_name}",
        prices.len()
    )?;

    write_sample(out, &prices)?;

    match PriceSummary::from_points(&prices) {
        Some(summary) => write_summary(out, &summary, days)?,
        None => writeln!(out, "\nNo price points returned, skipping statistics.")?,
    }

    let path = export::write_prices_csv(output_dir, region_name, &prices)?;
    writeln!(out, "\nData saved to: {}", path.display())?;

    Ok(path)
}

fn write_sample<W: Write>(out: &mut W, prices: &[PricePoint]) -> io::Result<()> {
    if prices.is_empty() {
        return Ok(());
    }

    writeln!(out, "\nSample pricing data:")?;
    writeln!(
        out,
        "  {:<22} {:>14} {:>10}",
        "valid_from (UK)", "value_inc_vat", "price_gbp"
    )?;
    for point in prices.iter().take(SAMPLE_ROWS) {
        writeln!(
            out,
            "  {:<22} {:>14} {:>10.4}",
            point
                .valid_from
                .with_timezone(&London)
                .format(UK_TIME_FORMAT)
                .to_string(),
            point.value_inc_vat.to_string(),
            point.price_gbp
        )?;
    }
    Ok(())
}

fn write_summary<W: Write>(out: &mut W, summary: &PriceSummary, days: u32) -> io::Result<()> {
    writeln!(out, "\nPricing statistics (last {days} days):")?;
    writeln!(out, "  Minimum price: {:.4} £/kWh", summary.min)?;
    writeln!(out, "  Maximum price: {:.4} £/kWh", summary.max)?;
    writeln!(out, "  Average price: {:.4} £/kWh", summary.mean)?;
    writeln!(
        out,
        "  Cheapest slot starts {}",
        summary.cheapest_from.with_timezone(&London).format(UK_TIME_FORMAT)
    )?;
    writeln!(
        out,
        "  Most expensive slot starts {}",
        summary.dearest_from.with_timezone(&London).format(UK_TIME_FORMAT)
    )?;
    if summary.negative_count > 0 {
        writeln!(
            out,
            "  Found {} periods with negative prices!",
            summary.negative_count
        )?;
    }
    Ok(())
}
