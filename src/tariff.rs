use tracing::info;

use crate::catalog::{Catalog, ProductTariff};
use crate::client::OctopusClient;
use crate::error::{OctopusError, Result};

/// Marker for export (feed-in) products, which never price consumption.
const OUTGOING_MARKER: &str = "OUTGOING";

/// Picks the Agile tariff to use for `region_name`.
///
/// Among the Agile tariffs of the region, the first one whose product code is not an
/// outgoing product wins. When the region only has outgoing products, the first of those
/// is returned. "First" is the order the tariffs appear in `tariffs`, which for a fetched
/// catalog is the provider's listing order.
pub fn select_agile_tariff<'a, I>(tariffs: I, region_name: &str) -> Result<&'a ProductTariff>
where
    I: IntoIterator<Item = &'a ProductTariff>,
{
    let candidates: Vec<&ProductTariff> = tariffs
        .into_iter()
        .filter(|tariff| tariff.is_agile && tariff.region_name == region_name)
        .collect();

    candidates
        .iter()
        .find(|tariff| !tariff.product_code.contains(OUTGOING_MARKER))
        .or_else(|| candidates.first())
        .copied()
        .ok_or_else(|| OctopusError::NotFound(region_name.to_owned()))
}

impl Catalog {
    pub fn resolve(&self, region_name: &str) -> Result<&ProductTariff> {
        select_agile_tariff(&self.tariffs, region_name)
    }
}

impl OctopusClient {
    /// Fetches the catalog and resolves the Agile tariff for `region_name`.
    pub async fn resolve_tariff(&self, region_name: &str) -> Result<ProductTariff> {
        let catalog = self.fetch_catalog().await?;
        let tariff = catalog.resolve(region_name)?;

        info!(
            region = %tariff.region_name,
            product = %tariff.product_code,
            tariff = %tariff.tariff_code,
            "Resolved Agile tariff"
        );
        Ok(tariff.clone())
    }
}
