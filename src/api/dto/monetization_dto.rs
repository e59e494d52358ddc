//! Ad impression, cost, and revenue DTOs.
//!
//! Money fields deserialize into [`Decimal`] so amounts round-trip without
//! float precision loss; period dates are plain ISO dates.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::store::models::{NewExternalCost, NewRevenue};

/// Request body for `POST /metrics/ad`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAdImpressionRequest {
    /// Placement of the ad (e.g. `results_gate`).
    pub placement: String,
    /// Milliseconds the ad was watched.
    pub watched_ms: i64,
    /// Whether the ad was watched to completion.
    pub completed: bool,
    /// User ID override; defaults to the authenticated caller.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Ad provider name.
    #[serde(default)]
    pub provider: Option<String>,
}

/// Request body for `POST /metrics/costs`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCostRequest {
    /// Service name (`tripadvisor`, `stripe`, `vercel`, ...).
    pub service: String,
    /// Unit type (`per_request`, `per_1000_requests`, `flat_monthly`, ...).
    pub unit: String,
    /// Quantity of units.
    pub quantity: Decimal,
    /// Cost per unit in USD.
    pub unit_cost: Decimal,
    /// Billing period start (YYYY-MM-DD).
    pub period_start: NaiveDate,
    /// Billing period end (YYYY-MM-DD).
    pub period_end: NaiveDate,
    /// Free-form notes.
    #[serde(default)]
    pub notes: Option<String>,
}

impl CreateCostRequest {
    /// Converts into an insert payload.
    #[must_use]
    pub fn into_new_cost(self) -> NewExternalCost {
        NewExternalCost {
            service: self.service,
            unit: self.unit,
            quantity: self.quantity,
            unit_cost: self.unit_cost,
            period_start: self.period_start,
            period_end: self.period_end,
            notes: self.notes,
        }
    }
}

/// Request body for `POST /metrics/revenue`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRevenueRequest {
    /// User the revenue is attributable to, when known.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Revenue source (`stripe`, `ads`, ...).
    pub source: String,
    /// Plan type (`free`, `monthly`, `yearly`).
    pub plan: String,
    /// Gross amount in USD.
    pub amount_gross: Decimal,
    /// Fees in USD (processor, app store).
    pub fees: Decimal,
    /// Net amount in USD.
    pub amount_net: Decimal,
    /// Subscription period start (YYYY-MM-DD).
    #[serde(default)]
    pub period_start: Option<NaiveDate>,
    /// Subscription period end (YYYY-MM-DD).
    #[serde(default)]
    pub period_end: Option<NaiveDate>,
    /// External reference (e.g. a Stripe charge ID).
    #[serde(default)]
    pub external_ref: Option<String>,
}

impl CreateRevenueRequest {
    /// Converts into an insert payload.
    #[must_use]
    pub fn into_new_revenue(self) -> NewRevenue {
        NewRevenue {
            user_id: self.user_id,
            source: self.source,
            plan: self.plan,
            amount_gross: self.amount_gross,
            fees: self.fees,
            amount_net: self.amount_net,
            period_start: self.period_start,
            period_end: self.period_end,
            external_ref: self.external_ref,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn money_fields_accept_json_numbers_and_strings() {
        let cost: CreateCostRequest = serde_json::from_value(json!({
            "service": "tripadvisor",
            "unit": "per_1000_requests",
            "quantity": 12.5,
            "unitCost": "0.035",
            "periodStart": "2026-08-01",
            "periodEnd": "2026-08-31",
        }))
        .unwrap();

        assert_eq!(cost.quantity, Decimal::new(125, 1));
        assert_eq!(cost.unit_cost, Decimal::new(35, 3));
        assert_eq!(
            cost.period_start,
            NaiveDate::from_ymd_opt(2026, 8, 1).unwrap()
        );
    }

    #[test]
    fn revenue_period_is_optional() {
        let revenue: CreateRevenueRequest = serde_json::from_value(json!({
            "source": "stripe",
            "plan": "monthly",
            "amountGross": 9.99,
            "fees": 0.59,
            "amountNet": 9.40,
        }))
        .unwrap();

        let payload = revenue.into_new_revenue();
        assert!(payload.period_start.is_none());
        assert_eq!(payload.amount_net, Decimal::new(940, 2));
    }
}
