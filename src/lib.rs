//! API client for Octopus Energy Agile electricity prices.
//!
//! ```no_run
//! # async fn run() -> octopus_agile::Result<()> {
//! let client = octopus_agile::OctopusClient::new()?;
//! let prices = client.get_prices_for_region("London", 7).await?;
//! if let Some(summary) = octopus_agile::PriceSummary::from_points(&prices) {
//!     println!("cheapest: {} £/kWh", summary.min);
//! }
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod client;
pub mod error;
pub mod export;
pub mod prices;
pub mod region;
pub mod report;
pub mod tariff;

pub use catalog::{Catalog, PaymentMethod, Product, ProductTariff, SkippedProduct};
pub use client::OctopusClient;
pub use error::{OctopusError, Result};
pub use prices::{PricePoint, PriceSummary};
pub use region::Region;
pub use tariff::select_agile_tariff;
