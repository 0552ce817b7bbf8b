use std::collections::{BTreeMap, BTreeSet};

use futures_util::stream::{self, StreamExt};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::client::OctopusClient;
use crate::error::Result;
use crate::region;

/// A variable-rate product from the provider's product listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub product_code: String,
    pub product_name: String,
    pub display_name: Option<String>,
    /// `IMPORT` or `EXPORT`, as reported by the listing.
    pub direction: Option<String>,
    pub brand: Option<String>,
    pub is_variable: bool,
    pub is_green: bool,
    pub is_tracker: bool,
    pub is_agile: bool,
}

impl From<ProductListItem> for Product {
    fn from(item: ProductListItem) -> Self {
        Self {
            is_agile: is_agile_code(&item.code),
            product_code: item.code,
            product_name: item.full_name,
            display_name: item.display_name,
            direction: item.direction,
            brand: item.brand,
            is_variable: item.is_variable,
            is_green: item.is_green,
            is_tracker: item.is_tracker,
        }
    }
}

/// Agile products are recognised by their product code alone.
pub fn is_agile_code(product_code: &str) -> bool {
    product_code.to_lowercase().contains("agile")
}

/// Payment-method variants a single-register tariff may be offered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentMethod {
    DirectDebitMonthly,
    DirectDebitQuarterly,
    Varying,
}

impl PaymentMethod {
    /// Order in which variants are tried when picking a region's tariff code.
    pub const PREFERENCE: [PaymentMethod; 3] = [
        PaymentMethod::DirectDebitMonthly,
        PaymentMethod::DirectDebitQuarterly,
        PaymentMethod::Varying,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::DirectDebitMonthly => "direct_debit_monthly",
            PaymentMethod::DirectDebitQuarterly => "direct_debit_quarterly",
            PaymentMethod::Varying => "varying",
        }
    }
}

/// One tariff of a product in one region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductTariff {
    pub product_code: String,
    pub product_name: String,
    pub tariff_code: String,
    pub region_code: String,
    pub region_name: String,
    pub payment_method: PaymentMethod,
    pub is_variable: bool,
    pub is_green: bool,
    pub is_tracker: bool,
    pub is_agile: bool,
}

/// A product whose detail record could not be fetched, and therefore contributed no tariffs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedProduct {
    pub product_code: String,
    pub reason: String,
}

/// The flattened product catalog, in the order the provider listed the products.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    pub tariffs: Vec<ProductTariff>,
    pub skipped: Vec<SkippedProduct>,
}

impl Catalog {
    pub fn len(&self) -> usize {
        self.tariffs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tariffs.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }

    pub fn agile(&self) -> impl Iterator<Item = &ProductTariff> {
        self.tariffs.iter().filter(|tariff| tariff.is_agile)
    }

    /// Number of distinct Agile products per region, ordered by region name.
    pub fn agile_region_counts(&self) -> Vec<(String, usize)> {
        let mut products: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for tariff in self.agile() {
            products
                .entry(tariff.region_name.as_str())
                .or_default()
                .insert(tariff.product_code.as_str());
        }

        products
            .into_iter()
            .map(|(region, codes)| (region.to_owned(), codes.len()))
            .collect()
    }

    /// Sorted, de-duplicated names of the regions that have at least one Agile tariff.
    pub fn agile_region_names(&self) -> Vec<String> {
        self.agile_region_counts()
            .into_iter()
            .map(|(region, _)| region)
            .collect()
    }
}

#[derive(Deserialize)]
struct ProductListResponse {
    results: Vec<ProductListItem>,
}

#[derive(Deserialize)]
struct ProductListItem {
    code: String,
    full_name: String,
    display_name: Option<String>,
    direction: Option<String>,
    brand: Option<String>,
    #[serde(default)]
    is_variable: bool,
    #[serde(default)]
    is_green: bool,
    #[serde(default)]
    is_tracker: bool,
}

#[derive(Deserialize)]
struct ProductDetail {
    #[serde(default)]
    single_register_electricity_tariffs: BTreeMap<String, RegionTariffs>,
}

#[derive(Deserialize)]
struct RegionTariffs {
    direct_debit_monthly: Option<TariffVariant>,
    direct_debit_quarterly: Option<TariffVariant>,
    varying: Option<TariffVariant>,
}

impl RegionTariffs {
    fn variant(&self, method: PaymentMethod) -> Option<&TariffVariant> {
        match method {
            PaymentMethod::DirectDebitMonthly => self.direct_debit_monthly.as_ref(),
            PaymentMethod::DirectDebitQuarterly => self.direct_debit_quarterly.as_ref(),
            PaymentMethod::Varying => self.varying.as_ref(),
        }
    }

    /// First tariff code available in [`PaymentMethod::PREFERENCE`] order.
    fn preferred_code(&self) -> Option<(PaymentMethod, &str)> {
        PaymentMethod::PREFERENCE.into_iter().find_map(|method| {
            self.variant(method)
                .map(|variant| (method, variant.code.as_str()))
        })
    }
}

#[derive(Deserialize)]
struct TariffVariant {
    code: String,
}

impl ProductDetail {
    fn into_tariffs(self, product: &Product) -> Vec<ProductTariff> {
        self.single_register_electricity_tariffs
            .iter()
            .filter_map(|(region_code, tariffs)| {
                let Some((payment_method, tariff_code)) = tariffs.preferred_code() else {
                    debug!(
                        product = %product.product_code,
                        region = %region_code,
                        "No recognised payment method, skipping region"
                    );
                    return None;
                };

                Some(ProductTariff {
                    product_code: product.product_code.clone(),
                    product_name: product.product_name.clone(),
                    tariff_code: tariff_code.to_owned(),
                    region_code: region_code.clone(),
                    region_name: region::name_for(region_code).to_owned(),
                    payment_method,
                    is_variable: product.is_variable,
                    is_green: product.is_green,
                    is_tracker: product.is_tracker,
                    is_agile: product.is_agile,
                })
            })
            .collect()
    }
}

impl OctopusClient {
    /// Lists all variable-rate products.
    ///
    /// Only the first page the provider returns is read.
    pub async fn fetch_products(&self) -> Result<Vec<Product>> {
        let listing: ProductListResponse = self
            .get_json(&self.url("products/"), &[("is_variable", "true")])
            .await?;

        Ok(listing.results.into_iter().map(Product::from).collect())
    }

    /// Fetches a product's detail record and flattens it to one tariff per region.
    pub async fn fetch_product_tariffs(&self, product: &Product) -> Result<Vec<ProductTariff>> {
        let url = self.url(&format!("products/{}", product.product_code));
        let detail: ProductDetail = self.get_json(&url, &[] as &[(&str, &str)]).await?;

        Ok(detail.into_tariffs(product))
    }

    /// Builds the full catalog: the product listing, then every product's detail record.
    ///
    /// A failure on the listing aborts. A failure on an individual detail record does not;
    /// the product is reported in [`Catalog::skipped`] instead. Detail requests run with the
    /// client's concurrency limit but results keep the listing order.
    pub async fn fetch_catalog(&self) -> Result<Catalog> {
        let products = self.fetch_products().await?;
        info!(products = products.len(), "Fetched variable product listing");

        let details = stream::iter(products)
            .map(|product| async move {
                let tariffs = self.fetch_product_tariffs(&product).await;
                (product, tariffs)
            })
            .buffered(self.concurrency())
            .collect::<Vec<_>>()
            .await;

        let mut catalog = Catalog::default();
        for (product, tariffs) in details {
            match tariffs {
                Ok(tariffs) => catalog.tariffs.extend(tariffs),
                Err(e) => {
                    warn!(product = %product.product_code, error = %e, "Skipping product");
                    catalog.skipped.push(SkippedProduct {
                        product_code: product.product_code,
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            tariffs = catalog.len(),
            agile = catalog.agile().count(),
            skipped = catalog.skipped.len(),
            "Catalog assembled"
        );
        Ok(catalog)
    }
}
