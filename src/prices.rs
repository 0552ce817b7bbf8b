use chrono::{DateTime, Duration, SecondsFormat, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::catalog::ProductTariff;
use crate::client::OctopusClient;
use crate::error::{OctopusError, Result};

/// Page size requested from the unit-rate endpoint.
pub const PAGE_SIZE: u32 = 1500;

/// One half-hourly (or open-ended) unit rate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricePoint {
    /// Start time of this price slot
    pub valid_from: DateTime<Utc>,
    /// End time of this price slot, `None` for open-ended rates
    pub valid_to: Option<DateTime<Utc>>,
    /// Price in pence per kWh including VAT, as returned by the API
    pub value_inc_vat: Decimal,
    /// Price in pence per kWh excluding VAT
    pub value_exc_vat: Decimal,
    /// `value_inc_vat` converted to pounds per kWh
    pub price_gbp: Decimal,
    pub payment_method: Option<String>,
    pub region_name: Option<String>,
    pub region_code: Option<String>,
}

impl PricePoint {
    pub fn is_negative(&self) -> bool {
        self.price_gbp.is_sign_negative() && !self.price_gbp.is_zero()
    }
}

/// Converts an amount in pence to pounds.
pub fn pence_to_pounds(pence: Decimal) -> Decimal {
    pence / Decimal::ONE_HUNDRED
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|e| OctopusError::UnsupportedResponse(format!("invalid timestamp {value:?}: {e}")))
}

impl TryFrom<UnitRateItem> for PricePoint {
    type Error = OctopusError;

    fn try_from(item: UnitRateItem) -> Result<Self> {
        Ok(Self {
            valid_from: parse_timestamp(&item.valid_from)?,
            valid_to: item.valid_to.as_deref().map(parse_timestamp).transpose()?,
            price_gbp: pence_to_pounds(item.value_inc_vat),
            value_inc_vat: item.value_inc_vat,
            value_exc_vat: item.value_exc_vat,
            payment_method: item.payment_method,
            region_name: None,
            region_code: None,
        })
    }
}

#[derive(Deserialize)]
struct UnitRateItem {
    value_exc_vat: Decimal,
    value_inc_vat: Decimal,
    valid_from: String,
    valid_to: Option<String>,
    payment_method: Option<String>,
}

#[derive(Deserialize)]
struct UnitRateResponse {
    next: Option<String>,
    results: Vec<UnitRateItem>,
}

/// Fills in the query window: `period_from` defaults to one day before `now` and
/// `period_to` defaults to `now`.
pub fn price_window<TZ>(
    period_from: Option<DateTime<TZ>>,
    period_to: Option<DateTime<TZ>>,
    now: DateTime<Utc>,
) -> (DateTime<Utc>, DateTime<Utc>)
where
    TZ: TimeZone,
{
    let from = period_from.map_or_else(|| now - Duration::days(1), |t| t.with_timezone(&Utc));
    let to = period_to.map_or(now, |t| t.with_timezone(&Utc));
    (from, to)
}

fn days_before(now: DateTime<Utc>, days: u32) -> Result<DateTime<Utc>> {
    Duration::try_days(i64::from(days))
        .and_then(|span| now.checked_sub_signed(span))
        .ok_or_else(|| OctopusError::InvalidArgument(format!("{days} days is out of range")))
}

impl OctopusClient {
    /// Query unit rates of a tariff with an optional `period_from` and `period_to`.
    ///
    /// Missing bounds default as described in [`price_window`]. The first page is requested
    /// with [`PAGE_SIZE`] entries and any further pages are followed through the response's
    /// `next` link. Points are returned in the order the API sends them, which is newest
    /// first.
    pub async fn fetch_prices<TZ>(
        &self,
        product_code: &str,
        tariff_code: &str,
        period_from: Option<DateTime<TZ>>,
        period_to: Option<DateTime<TZ>>,
    ) -> Result<Vec<PricePoint>>
    where
        TZ: TimeZone,
    {
        let (from, to) = price_window(period_from, period_to, Utc::now());
        let url = self.url(&format!(
            "products/{product_code}/electricity-tariffs/{tariff_code}/standard-unit-rates/"
        ));
        let query = [
            ("period_from", from.to_rfc3339_opts(SecondsFormat::Secs, true)),
            ("period_to", to.to_rfc3339_opts(SecondsFormat::Secs, true)),
            ("page_size", PAGE_SIZE.to_string()),
        ];

        let mut page: UnitRateResponse = self.get_json(&url, &query).await?;
        let mut points = Vec::new();
        loop {
            let UnitRateResponse { next, results } = page;
            for item in results {
                points.push(PricePoint::try_from(item)?);
            }

            let Some(next) = next else { break };
            debug!(%next, fetched = points.len(), "Following next page of unit rates");
            page = self.get_json(&next, &[] as &[(&str, &str)]).await?;
        }

        Ok(points)
    }

    /// This is a shortcut for `fetch_prices::<Utc>(product_code, tariff_code, None, None)`.
    pub async fn fetch_prices_last_day(
        &self,
        product_code: &str,
        tariff_code: &str,
    ) -> Result<Vec<PricePoint>> {
        self.fetch_prices::<Utc>(product_code, tariff_code, None, None)
            .await
    }

    /// Fetches the last `days` days of prices for an already resolved tariff and stamps
    /// every point with the tariff's region.
    pub async fn prices_for_tariff(
        &self,
        tariff: &ProductTariff,
        days: u32,
    ) -> Result<Vec<PricePoint>> {
        let now = Utc::now();
        let from = days_before(now, days)?;

        let mut points = self
            .fetch_prices(&tariff.product_code, &tariff.tariff_code, Some(from), Some(now))
            .await?;
        for point in &mut points {
            point.region_name = Some(tariff.region_name.clone());
            point.region_code = Some(tariff.region_code.clone());
        }

        info!(
            region = %tariff.region_name,
            tariff = %tariff.tariff_code,
            points = points.len(),
            days,
            "Fetched Agile prices"
        );
        Ok(points)
    }

    /// Resolves the Agile tariff for `region_name` and fetches its last `days` days of prices.
    pub async fn get_prices_for_region(
        &self,
        region_name: &str,
        days: u32,
    ) -> Result<Vec<PricePoint>> {
        let tariff = self.resolve_tariff(region_name).await?;
        self.prices_for_tariff(&tariff, days).await
    }
}

/// Summary statistics over a set of price points.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSummary {
    pub count: usize,
    pub min: Decimal,
    pub max: Decimal,
    pub mean: Decimal,
    pub negative_count: usize,
    /// Start of the cheapest interval
    pub cheapest_from: DateTime<Utc>,
    /// Start of the most expensive interval
    pub dearest_from: DateTime<Utc>,
}

impl PriceSummary {
    /// Returns `None` for an empty slice.
    pub fn from_points(points: &[PricePoint]) -> Option<Self> {
        let cheapest = points.iter().min_by_key(|point| point.price_gbp)?;
        let dearest = points.iter().max_by_key(|point| point.price_gbp)?;
        let total: Decimal = points.iter().map(|point| point.price_gbp).sum();

        Some(Self {
            count: points.len(),
            min: cheapest.price_gbp,
            max: dearest.price_gbp,
            mean: total / Decimal::from(points.len()),
            negative_count: points.iter().filter(|point| point.is_negative()).count(),
            cheapest_from: cheapest.valid_from,
            dearest_from: dearest.valid_from,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::{mock_detail, mock_listing};
    use mockito::{Matcher, Server};
    use serde_json::json;

    const RATES_PATH: &str =
        "/products/AGILE-FLEX-22-11-25/electricity-tariffs/E-1R-AGILE-FLEX-22-11-25-C/standard-unit-rates/";

    fn item(value_inc_vat: f64, valid_from: &str, valid_to: &str) -> UnitRateItem {
        serde_json::from_value(json!({
            "value_exc_vat": value_inc_vat,
            "value_inc_vat": value_inc_vat,
            "valid_from": valid_from,
            "valid_to": valid_to,
            "payment_method": null
        }))
        .unwrap()
    }

    fn point(value_inc_vat: f64) -> PricePoint {
        PricePoint::try_from(item(value_inc_vat, "2024-01-01T00:00:00Z", "2024-01-01T00:30:00Z"))
            .unwrap()
    }

    #[test]
    fn test_pricepoint_from_item() {
        let slot = PricePoint::try_from(item(15.5, "2024-01-01T00:00:00Z", "2024-01-01T00:30:00Z"))
            .unwrap();

        assert_eq!(slot.valid_from, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(
            slot.valid_to,
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 30, 0).unwrap())
        );
        assert_eq!(slot.value_inc_vat, Decimal::new(155, 1));
        assert_eq!(slot.price_gbp, Decimal::new(155, 3));
        assert_eq!(slot.region_name, None);
    }

    #[test]
    fn test_pricepoint_from_item_negative() {
        let slot = point(-2.0);

        assert_eq!(slot.price_gbp, Decimal::new(-2, 2));
        assert!(slot.is_negative());
    }

    #[test]
    fn test_pricepoint_with_offset_timestamp() {
        let slot = PricePoint::try_from(item(
            20.0,
            "2024-06-01T01:00:00+01:00",
            "2024-06-01T01:30:00+01:00",
        ))
        .unwrap();

        assert_eq!(slot.valid_from, Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_pricepoint_open_ended() {
        let raw: UnitRateItem = serde_json::from_value(json!({
            "value_exc_vat": 20.0,
            "value_inc_vat": 21.0,
            "valid_from": "2024-01-01T00:00:00Z",
            "valid_to": null,
            "payment_method": "DIRECT_DEBIT"
        }))
        .unwrap();

        let slot = PricePoint::try_from(raw).unwrap();
        assert_eq!(slot.valid_to, None);
        assert_eq!(slot.payment_method.as_deref(), Some("DIRECT_DEBIT"));
    }

    #[test]
    fn test_invalid_timestamp_is_unsupported() {
        let err = PricePoint::try_from(item(1.0, "yesterday", "today")).unwrap_err();
        assert!(matches!(err, OctopusError::UnsupportedResponse(_)));
    }

    #[test]
    fn test_price_conversion_is_exact() {
        for (pence, pounds) in [
            (Decimal::new(155, 1), Decimal::new(155, 3)),
            (Decimal::new(-2, 0), Decimal::new(-2, 2)),
            (Decimal::new(2457, 2), Decimal::new(2457, 4)),
        ] {
            assert_eq!(pence_to_pounds(pence), pounds);
        }
    }

    #[test]
    fn test_default_window_is_one_day() {
        let now = Utc::now();
        let (from, to) = price_window::<Utc>(None, None, now);

        assert_eq!(to, now);
        assert_eq!(to - from, Duration::days(1));
    }

    #[test]
    fn test_explicit_window_is_kept() {
        let now = Utc::now();
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap();

        assert_eq!(price_window(Some(start), Some(end), now), (start, end));
        assert_eq!(price_window(Some(start), None, now), (start, now));
    }

    #[test]
    fn test_days_before_out_of_range() {
        assert!(matches!(
            days_before(Utc::now(), u32::MAX),
            Err(OctopusError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_summary() {
        let points = vec![point(15.5), point(-2.0), point(30.0)];
        let summary = PriceSummary::from_points(&points).unwrap();

        assert_eq!(summary.count, 3);
        assert_eq!(summary.min, Decimal::new(-2, 2));
        assert_eq!(summary.max, Decimal::new(3, 1));
        assert_eq!(summary.mean, Decimal::new(145, 3));
        assert_eq!(summary.negative_count, 1);
    }

    #[test]
    fn test_summary_of_nothing() {
        assert_eq!(PriceSummary::from_points(&[]), None);
    }

    #[tokio::test]
    async fn test_fetch_prices() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", RATES_PATH)
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("page_size".into(), "1500".into()),
                Matcher::UrlEncoded("period_from".into(), "2024-01-01T00:00:00Z".into()),
                Matcher::UrlEncoded("period_to".into(), "2024-01-02T00:00:00Z".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "count": 2,
                    "next": null,
                    "previous": null,
                    "results": [
                        {
                            "value_exc_vat": 14.76,
                            "value_inc_vat": 15.5,
                            "valid_from": "2024-01-01T00:30:00Z",
                            "valid_to": "2024-01-01T01:00:00Z",
                            "payment_method": null
                        },
                        {
                            "value_exc_vat": -1.9,
                            "value_inc_vat": -2.0,
                            "valid_from": "2024-01-01T00:00:00Z",
                            "valid_to": "2024-01-01T00:30:00Z",
                            "payment_method": null
                        }
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = OctopusClient::new().unwrap().with_base_url(server.url());
        let prices = client
            .fetch_prices(
                "AGILE-FLEX-22-11-25",
                "E-1R-AGILE-FLEX-22-11-25-C",
                Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
                Some(Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()),
            )
            .await
            .unwrap();

        assert_eq!(prices.len(), 2);
        assert_eq!(prices[0].price_gbp, Decimal::new(155, 3));
        assert_eq!(prices[1].price_gbp, Decimal::new(-2, 2));
        assert_eq!(PriceSummary::from_points(&prices).unwrap().negative_count, 1);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_prices_follows_next_page() {
        let mut server = Server::new_async().await;
        let next = format!("{}{}?page=2", server.url(), RATES_PATH);
        let first = server
            .mock("GET", RATES_PATH)
            .match_query(Matcher::UrlEncoded("page_size".into(), "1500".into()))
            .with_status(200)
            .with_body(
                json!({
                    "next": next,
                    "results": [{
                        "value_exc_vat": 10.0,
                        "value_inc_vat": 10.5,
                        "valid_from": "2024-01-01T00:30:00Z",
                        "valid_to": "2024-01-01T01:00:00Z"
                    }]
                })
                .to_string(),
            )
            .create_async()
            .await;
        let second = server
            .mock("GET", RATES_PATH)
            .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
            .with_status(200)
            .with_body(
                json!({
                    "next": null,
                    "results": [{
                        "value_exc_vat": 9.0,
                        "value_inc_vat": 9.45,
                        "valid_from": "2024-01-01T00:00:00Z",
                        "valid_to": "2024-01-01T00:30:00Z"
                    }]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = OctopusClient::new().unwrap().with_base_url(server.url());
        let prices = client
            .fetch_prices_last_day("AGILE-FLEX-22-11-25", "E-1R-AGILE-FLEX-22-11-25-C")
            .await
            .unwrap();

        assert_eq!(prices.len(), 2);
        assert_eq!(prices[1].value_inc_vat, Decimal::new(945, 2));
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_prices_status_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", RATES_PATH)
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(r#"{"detail":"Not found."}"#)
            .create_async()
            .await;

        let client = OctopusClient::new().unwrap().with_base_url(server.url());
        let err = client
            .fetch_prices_last_day("AGILE-FLEX-22-11-25", "E-1R-AGILE-FLEX-22-11-25-C")
            .await
            .unwrap_err();

        assert!(matches!(err, OctopusError::HttpStatus { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_get_prices_for_region_stamps_region() {
        let mut server = Server::new_async().await;
        let _listing = mock_listing(&mut server, &["AGILE-FLEX-22-11-25"]).await;
        let _detail = mock_detail(
            &mut server,
            "AGILE-FLEX-22-11-25",
            json!({ "_C": { "direct_debit_monthly": { "code": "E-1R-AGILE-FLEX-22-11-25-C" } } }),
        )
        .await;
        let _rates = server
            .mock("GET", RATES_PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                json!({
                    "next": null,
                    "results": [
                        { "value_exc_vat": 1.0, "value_inc_vat": 1.05, "valid_from": "2024-01-01T00:30:00Z", "valid_to": "2024-01-01T01:00:00Z" },
                        { "value_exc_vat": 2.0, "value_inc_vat": 2.1, "valid_from": "2024-01-01T00:00:00Z", "valid_to": "2024-01-01T00:30:00Z" }
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = OctopusClient::new().unwrap().with_base_url(server.url());
        let prices = client.get_prices_for_region("London", 3).await.unwrap();

        assert_eq!(prices.len(), 2);
        for point in &prices {
            assert_eq!(point.region_name.as_deref(), Some("London"));
            assert_eq!(point.region_code.as_deref(), Some("_C"));
        }
    }

    #[tokio::test]
    async fn test_get_prices_for_unknown_region() {
        let mut server = Server::new_async().await;
        let _listing = mock_listing(&mut server, &[]).await;

        let client = OctopusClient::new().unwrap().with_base_url(server.url());
        let err = client.get_prices_for_region("Atlantis", 7).await.unwrap_err();

        assert!(matches!(err, OctopusError::NotFound(ref region) if region == "Atlantis"));
    }
}
