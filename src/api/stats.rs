use reqwest::Method;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ApiClient;
use crate::error::ApiError;

pub const SUMMARY_PATH: &str = "hotel-stats/summary";

/// Figures shown on the dashboard overview.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryStats {
    #[serde(default)]
    pub bookings: BookingStats,
    #[serde(default)]
    pub revenue: RevenueStats,
    /// Percentage, 0 to 100
    #[serde(default)]
    pub occupancy_rate: Decimal,
    #[serde(default)]
    pub category_distribution: Vec<CategoryCount>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookingStats {
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueStats {
    #[serde(default)]
    pub total: Decimal,
    #[serde(default)]
    pub by_month: Vec<MonthlyRevenue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyRevenue {
    pub month: String,
    #[serde(default)]
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: String,
    #[serde(default)]
    pub count: u64,
}

impl SummaryStats {
    /// Occupancy as a 0..1 fraction rounded to two places, as charted per month
    pub fn occupancy_fraction(&self) -> Decimal {
        (self.occupancy_rate / Decimal::ONE_HUNDRED).round_dp(2)
    }

    fn from_body(body: Value) -> Result<Self, ApiError> {
        match body {
            Value::Object(_) => Ok(serde_json::from_value(body)?),
            _ => Err(ApiError::unexpected_format()),
        }
    }
}

impl ApiClient {
    /// Fetch the overview figures. The response body is the stats object
    /// itself, not a keyed envelope.
    pub async fn summary_stats(&self) -> Result<SummaryStats, ApiError> {
        let body = self.send(self.request(Method::GET, SUMMARY_PATH)?).await?;
        let stats = SummaryStats::from_body(body)?;
        tracing::debug!(
            "Loaded summary stats: {} bookings, {} categories",
            stats.bookings.total,
            stats.category_distribution.len()
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    #[test]
    fn decodes_the_overview_payload() {
        let stats = SummaryStats::from_body(json!({
            "bookings": { "total": 42 },
            "revenue": {
                "total": 15250.5,
                "byMonth": [{ "month": "Jan", "amount": 7000 }, { "month": "Feb", "amount": 8250.5 }]
            },
            "occupancyRate": 73.456,
            "categoryDistribution": [{ "category": "Suite", "count": 4 }, { "category": "Single", "count": 9 }]
        }))
        .unwrap();

        assert_eq!(stats.bookings.total, 42);
        assert_eq!(stats.revenue.total, Decimal::new(152505, 1));
        assert_eq!(stats.revenue.by_month[1].month, "Feb");
        assert_eq!(stats.category_distribution[1].count, 9);
        assert_eq!(stats.occupancy_fraction(), Decimal::new(73, 2));
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let stats = SummaryStats::from_body(json!({ "bookings": { "total": 3 } })).unwrap();
        assert_eq!(stats.bookings.total, 3);
        assert!(stats.revenue.by_month.is_empty());
        assert_eq!(stats.occupancy_rate, Decimal::ZERO);
    }

    #[test]
    fn malformed_payloads_are_server_errors() {
        let err = SummaryStats::from_body(json!([1, 2])).unwrap_err();
        assert_eq!(err, ApiError::unexpected_format());

        let err = SummaryStats::from_body(json!({ "bookings": "many" })).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Server);
    }
}
