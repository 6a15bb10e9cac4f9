//! # Sales Forecast
//!
//! Projects daily revenue for the coming days from past sales, and flags
//! products likely to run out in that window.
//!
//! ## Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  history:  zero-filled daily revenue, first sale day → yesterday        │
//! │                                                                         │
//! │  trend(x)   = a + b·x                (ordinary least squares)           │
//! │  index(wd)  = mean(actual / trend)   per weekday, ≥ 14 days only        │
//! │  expected   = max(trend(x) · index(wd), 0)                              │
//! │  band       = expected ± 1.96 · σ(residuals)                            │
//! │                                                                         │
//! │  direction: |b| ≤ 1% of mean daily revenue → flat                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The forecast starts today: history index `n - 1` is yesterday.

use std::collections::HashMap;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{Product, Sale};

/// Fewest days of history a forecast is made from.
pub const MIN_HISTORY_DAYS: usize = 7;

/// History needed before weekday effects are estimated.
pub const WEEKDAY_INDEX_MIN_DAYS: usize = 14;

pub const MAX_HORIZON_DAYS: u32 = 30;

/// z-score of the 95% band.
const BAND_Z: f64 = 1.96;

/// Relative slope under which the trend is called flat.
const FLAT_THRESHOLD: f64 = 0.01;

// =============================================================================
// Output Types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum TrendDirection {
    Up,
    Down,
    Flat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ForecastPoint {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub expected_cents: i64,
    pub low_cents: i64,
    pub high_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RestockSuggestion {
    pub product_id: String,
    pub name: String,
    pub stock: i64,
    pub average_daily_units: f64,
    pub days_of_cover: f64,
    pub suggested_quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SalesForecast {
    #[ts(as = "String")]
    pub generated_for: NaiveDate,
    pub horizon_days: u32,
    pub history_days: usize,
    pub trend: TrendDirection,
    pub slope_cents_per_day: i64,
    pub average_daily_cents: i64,
    pub points: Vec<ForecastPoint>,
    pub expected_total_cents: i64,
    pub insights: Vec<String>,
    pub restock: Vec<RestockSuggestion>,
}

// =============================================================================
// History
// =============================================================================

/// Revenue of one past day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyRevenue {
    pub date: NaiveDate,
    pub revenue_cents: i64,
}

/// Zero-filled daily revenue from the first completed sale up to yesterday.
pub fn daily_history(sales: &[Sale], today: NaiveDate) -> Vec<DailyRevenue> {
    let completed = || {
        sales
            .iter()
            .filter(|s| s.is_completed() && s.operational_date < today)
    };

    let Some(first) = completed().map(|s| s.operational_date).min() else {
        return Vec::new();
    };

    let mut history: Vec<DailyRevenue> = first
        .iter_days()
        .take_while(|d| *d < today)
        .map(|date| DailyRevenue {
            date,
            revenue_cents: 0,
        })
        .collect();

    for sale in completed() {
        let offset = (sale.operational_date - first).num_days() as usize;
        if let Some(day) = history.get_mut(offset) {
            day.revenue_cents += sale.total_cents;
        }
    }

    history
}

// =============================================================================
// Model
// =============================================================================

struct LinearTrend {
    intercept: f64,
    slope: f64,
}

impl LinearTrend {
    fn fit(ys: &[f64]) -> Self {
        let n = ys.len() as f64;
        let x_mean = (n - 1.0) / 2.0;
        let y_mean = ys.iter().sum::<f64>() / n;

        let (mut sxy, mut sxx) = (0.0, 0.0);
        for (x, y) in ys.iter().enumerate() {
            let dx = x as f64 - x_mean;
            sxy += dx * (y - y_mean);
            sxx += dx * dx;
        }

        let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
        LinearTrend {
            intercept: y_mean - slope * x_mean,
            slope,
        }
    }

    fn at(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// Average actual/trend ratio per weekday, normalised to a mean of 1.
fn weekday_index(history: &[DailyRevenue], trend: &LinearTrend) -> [f64; 7] {
    let mut index = [1.0; 7];
    if history.len() < WEEKDAY_INDEX_MIN_DAYS {
        return index;
    }

    let mut sums = [0.0; 7];
    let mut counts = [0usize; 7];
    for (x, day) in history.iter().enumerate() {
        let t = trend.at(x as f64);
        if t > 0.0 {
            let wd = day.date.weekday().num_days_from_monday() as usize;
            sums[wd] += day.revenue_cents as f64 / t;
            counts[wd] += 1;
        }
    }

    for wd in 0..7 {
        if counts[wd] > 0 {
            index[wd] = sums[wd] / counts[wd] as f64;
        }
    }

    let mean = index.iter().sum::<f64>() / 7.0;
    if mean > 0.0 {
        for value in index.iter_mut() {
            *value /= mean;
        }
    }
    index
}

const WEEKDAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

// =============================================================================
// Forecast
// =============================================================================

/// Forecasts revenue for `horizon` days starting `today`.
///
/// ## Errors
/// - validation error for a horizon outside `1..=30`
/// - `InsufficientHistory` with fewer than [`MIN_HISTORY_DAYS`] days
pub fn forecast_sales(
    sales: &[Sale],
    products: &[Product],
    horizon: u32,
    today: NaiveDate,
) -> CoreResult<SalesForecast> {
    if horizon == 0 || horizon > MAX_HORIZON_DAYS {
        return Err(ValidationError::OutOfRange {
            field: "days".to_string(),
            min: 1,
            max: MAX_HORIZON_DAYS as i64,
        }
        .into());
    }

    let history = daily_history(sales, today);
    if history.len() < MIN_HISTORY_DAYS {
        return Err(CoreError::InsufficientHistory {
            required: MIN_HISTORY_DAYS,
            available: history.len(),
        });
    }

    let n = history.len();
    let ys: Vec<f64> = history.iter().map(|d| d.revenue_cents as f64).collect();
    let trend = LinearTrend::fit(&ys);
    let index = weekday_index(&history, &trend);

    let fitted = |x: usize, date: NaiveDate| -> f64 {
        let wd = date.weekday().num_days_from_monday() as usize;
        (trend.at(x as f64) * index[wd]).max(0.0)
    };

    let sse: f64 = history
        .iter()
        .enumerate()
        .map(|(x, day)| {
            let r = day.revenue_cents as f64 - fitted(x, day.date);
            r * r
        })
        .sum();
    let sigma = (sse / (n as f64 - 2.0)).sqrt();
    let margin = BAND_Z * sigma;

    let points: Vec<ForecastPoint> = (0..horizon as usize)
        .map(|i| {
            let date = today + Duration::days(i as i64);
            let expected = fitted(n + i, date);
            ForecastPoint {
                date,
                expected_cents: expected.round() as i64,
                low_cents: (expected - margin).max(0.0).round() as i64,
                high_cents: (expected + margin).round() as i64,
            }
        })
        .collect();

    let mean = ys.iter().sum::<f64>() / n as f64;
    let direction = if mean <= 0.0 {
        TrendDirection::Flat
    } else if trend.slope > FLAT_THRESHOLD * mean {
        TrendDirection::Up
    } else if trend.slope < -FLAT_THRESHOLD * mean {
        TrendDirection::Down
    } else {
        TrendDirection::Flat
    };

    let expected_total: i64 = points.iter().map(|p| p.expected_cents).sum();
    let low_total: i64 = points.iter().map(|p| p.low_cents).sum();
    let high_total: i64 = points.iter().map(|p| p.high_cents).sum();

    let mut insights = Vec::new();
    let slope = Money::from_cents(trend.slope.round() as i64);
    insights.push(match direction {
        TrendDirection::Up => format!("Daily revenue is trending up by about {} per day.", slope),
        TrendDirection::Down => {
            format!("Daily revenue is trending down by about {} per day.", slope.abs())
        }
        TrendDirection::Flat => "Daily revenue is stable.".to_string(),
    });
    if n >= WEEKDAY_INDEX_MIN_DAYS {
        let (busiest, _) = index
            .iter()
            .enumerate()
            .fold((0, f64::MIN), |best, (wd, v)| if *v > best.1 { (wd, *v) } else { best });
        insights.push(format!("{} is usually the busiest day.", WEEKDAY_NAMES[busiest]));
    }
    insights.push(format!(
        "Expected revenue over the next {} days: {} (between {} and {}).",
        horizon,
        Money::from_cents(expected_total),
        Money::from_cents(low_total),
        Money::from_cents(high_total),
    ));

    let from = history[0].date;
    let restock = restock_suggestions(sales, products, from, today, n, horizon);
    if !restock.is_empty() {
        insights.push(format!(
            "{} product(s) may run out within {} days.",
            restock.len(),
            horizon
        ));
    }

    Ok(SalesForecast {
        generated_for: today,
        horizon_days: horizon,
        history_days: n,
        trend: direction,
        slope_cents_per_day: trend.slope.round() as i64,
        average_daily_cents: mean.round() as i64,
        points,
        expected_total_cents: expected_total,
        insights,
        restock,
    })
}

/// Products whose stock covers fewer days than the horizon.
fn restock_suggestions(
    sales: &[Sale],
    products: &[Product],
    from: NaiveDate,
    today: NaiveDate,
    history_days: usize,
    horizon: u32,
) -> Vec<RestockSuggestion> {
    let mut units: HashMap<&str, i64> = HashMap::new();
    for sale in sales
        .iter()
        .filter(|s| s.is_completed() && s.operational_date >= from && s.operational_date < today)
    {
        for item in &sale.items {
            *units.entry(item.product_id.as_str()).or_default() += item.quantity;
        }
    }

    let mut suggestions: Vec<RestockSuggestion> = products
        .iter()
        .filter_map(|product| {
            let sold = *units.get(product.id.as_str())?;
            let avg = sold as f64 / history_days as f64;
            if avg <= 0.0 {
                return None;
            }

            let cover = product.stock.max(0) as f64 / avg;
            if cover >= horizon as f64 {
                return None;
            }

            let needed = (avg * horizon as f64).ceil() as i64;
            Some(RestockSuggestion {
                product_id: product.id.clone(),
                name: product.name.clone(),
                stock: product.stock,
                average_daily_units: avg,
                days_of_cover: cover,
                suggested_quantity: (needed - product.stock).max(1),
            })
        })
        .collect();

    suggestions.sort_by(|a, b| a.days_of_cover.total_cmp(&b.days_of_cover));
    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PaymentDetails, PaymentMethod, SaleItem, SaleStatus};
    use chrono::{Utc, Weekday};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn sale(day: NaiveDate, total: i64, product: &str, qty: i64) -> Sale {
        Sale {
            id: uuid::Uuid::new_v4().to_string(),
            receipt_number: String::new(),
            sold_at: Utc::now(),
            operational_date: day,
            items: vec![SaleItem {
                product_id: product.to_string(),
                name_snapshot: product.to_string(),
                unit_price_cents: total,
                cost_price_cents: 0,
                quantity: qty,
                line_total_cents: total,
            }],
            total_cents: total,
            cost_cents: 0,
            payment_method: PaymentMethod::Cash,
            payment: PaymentDetails::Cash { tendered_cents: total, change_cents: 0 },
            customer_id: None,
            cashier_id: "u".into(),
            status: SaleStatus::Completed,
            voided_at: None,
        }
    }

    fn product(id: &str, stock: i64) -> Product {
        let now = Utc::now();
        Product {
            id: id.to_string(),
            name: id.to_uppercase(),
            category: "General".into(),
            price_cents: 100,
            cost_price_cents: 50,
            stock,
            unit: "unit".into(),
            image: None,
            description: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// `days` of history ending yesterday, revenue given by `f(day_index)`.
    fn history(today: NaiveDate, days: i64, f: impl Fn(i64, NaiveDate) -> i64) -> Vec<Sale> {
        (0..days)
            .map(|k| {
                let day = today - Duration::days(days - k);
                sale(day, f(k, day), "p", 1)
            })
            .collect()
    }

    #[test]
    fn test_zero_filled_history() {
        let today = date("2026-10-19");
        let sales = vec![
            sale(date("2026-10-15"), 500, "p", 1),
            sale(date("2026-10-17"), 700, "p", 1),
            sale(today, 900, "p", 1),
        ];
        let h = daily_history(&sales, today);
        assert_eq!(h.len(), 4);
        assert_eq!(h[1].revenue_cents, 0);
        assert_eq!(h[3].date, date("2026-10-18"));
    }

    #[test]
    fn test_insufficient_history() {
        let today = date("2026-10-19");
        let sales = history(today, 5, |_, _| 1000);
        let err = forecast_sales(&sales, &[], 7, today).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientHistory { required: 7, available: 5 }
        ));
    }

    #[test]
    fn test_horizon_bounds() {
        let today = date("2026-10-19");
        let sales = history(today, 10, |_, _| 1000);
        assert!(forecast_sales(&sales, &[], 0, today).is_err());
        assert!(forecast_sales(&sales, &[], 31, today).is_err());
        assert!(forecast_sales(&sales, &[], 30, today).is_ok());
    }

    #[test]
    fn test_linear_growth_projects_upward() {
        let today = date("2026-10-19");
        let sales = history(today, 10, |k, _| 1000 + 100 * k);

        let forecast = forecast_sales(&sales, &[], 3, today).unwrap();
        assert_eq!(forecast.trend, TrendDirection::Up);
        assert_eq!(forecast.slope_cents_per_day, 100);
        assert_eq!(forecast.points.len(), 3);
        assert_eq!(forecast.points[0].date, today);
        assert_eq!(forecast.points[0].expected_cents, 2000);
        assert_eq!(forecast.points[2].expected_cents, 2200);
        // Perfect fit: no band.
        assert_eq!(forecast.points[0].low_cents, forecast.points[0].high_cents);
        assert_eq!(forecast.expected_total_cents, 6300);
    }

    #[test]
    fn test_flat_history_is_flat() {
        let today = date("2026-10-19");
        let sales = history(today, 10, |k, _| if k % 2 == 0 { 1000 } else { 1010 });
        let forecast = forecast_sales(&sales, &[], 7, today).unwrap();
        assert_eq!(forecast.trend, TrendDirection::Flat);
        assert!(forecast.points.iter().all(|p| p.low_cents <= p.expected_cents));
        assert!(forecast.insights[0].contains("stable"));
    }

    #[test]
    fn test_weekday_pattern_is_learned() {
        let today = date("2026-10-19"); // Monday
        let sales = history(today, 28, |_, day| match day.weekday() {
            Weekday::Sat => 3000,
            _ => 1000,
        });

        let forecast = forecast_sales(&sales, &[], 7, today).unwrap();
        let saturday = forecast
            .points
            .iter()
            .find(|p| p.date.weekday() == Weekday::Sat)
            .unwrap();
        let wednesday = forecast
            .points
            .iter()
            .find(|p| p.date.weekday() == Weekday::Wed)
            .unwrap();

        assert!(saturday.expected_cents > 2 * wednesday.expected_cents);
        assert!(forecast.insights.iter().any(|i| i.starts_with("Saturday")));
    }

    #[test]
    fn test_restock_suggestions() {
        let today = date("2026-10-19");
        // 10 days, 3 units/day of "p".
        let sales: Vec<Sale> = (0..10)
            .map(|k| sale(today - Duration::days(10 - k), 300, "p", 3))
            .collect();
        let products = vec![product("p", 12), product("q", 4)];

        let forecast = forecast_sales(&sales, &products, 7, today).unwrap();
        assert_eq!(forecast.restock.len(), 1);

        let s = &forecast.restock[0];
        assert_eq!(s.product_id, "p");
        assert!((s.average_daily_units - 3.0).abs() < 1e-9);
        assert!((s.days_of_cover - 4.0).abs() < 1e-9);
        assert_eq!(s.suggested_quantity, 21 - 12);
    }
}
