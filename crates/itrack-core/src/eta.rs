//! Service-order timing: estimates, elapsed time and overrun.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Default estimate for an order with no timed services, in minutes.
pub const DEFAULT_ESTIMATE_MINUTES: u32 = 30;

/// Anything that carries an estimated duration.
pub trait EstimatedDuration {
    fn estimated_minutes(&self) -> Option<u32>;
}

impl EstimatedDuration for u32 {
    fn estimated_minutes(&self) -> Option<u32> {
        Some(*self)
    }
}

/// A service or add-on with its catalogue duration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDuration {
    pub name: String,
    #[serde(default)]
    pub estimated_minutes: Option<u32>,
}

impl EstimatedDuration for ServiceDuration {
    fn estimated_minutes(&self) -> Option<u32> {
        self.estimated_minutes
    }
}

/// Total estimated minutes of the selected services and add-ons.
///
/// Falls back to `default_minutes` when no service is selected or the
/// durations add up to zero.
pub fn estimate_duration<S, A>(services: &[S], addons: &[A], default_minutes: u32) -> u32
where
    S: EstimatedDuration,
    A: EstimatedDuration,
{
    if services.is_empty() {
        return default_minutes;
    }

    let total: u32 = services
        .iter()
        .filter_map(EstimatedDuration::estimated_minutes)
        .chain(addons.iter().filter_map(EstimatedDuration::estimated_minutes))
        .fold(0u32, u32::saturating_add);

    if total > 0 { total } else { default_minutes }
}

/// Whole minutes from `created` to `completed`.
///
/// `None` when either timestamp is missing or completion precedes creation.
pub fn actual_duration(
    created: Option<DateTime<Utc>>,
    completed: Option<DateTime<Utc>>,
) -> Option<i64> {
    let minutes = (completed? - created?).num_minutes();
    (minutes >= 0).then_some(minutes)
}

/// How an order's actual time compares to its estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VarianceStatus {
    OnTime,
    Early,
    Overrun,
    Unknown,
}

/// Difference between estimated and actual duration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variance {
    /// Actual minus estimated minutes; positive is an overrun.
    pub difference: Option<i64>,
    /// Difference as a percentage of the estimate, 2 decimal places.
    pub percentage: Option<Decimal>,
    pub is_overrun: bool,
    pub status: VarianceStatus,
}

impl Variance {
    fn unknown() -> Self {
        Self {
            difference: None,
            percentage: None,
            is_overrun: false,
            status: VarianceStatus::Unknown,
        }
    }
}

/// Compare an estimate with the actual duration.
pub fn variance(estimated: Option<u32>, actual: Option<i64>) -> Variance {
    let (estimated, actual) = match (estimated, actual) {
        (Some(e), Some(a)) if e != 0 && a != 0 => (i64::from(e), a),
        _ => return Variance::unknown(),
    };

    let difference = actual - estimated;
    let percentage = (Decimal::from(difference) * Decimal::ONE_HUNDRED / Decimal::from(estimated))
        .round_dp(2);

    let status = match difference {
        d if d > 0 => VarianceStatus::Overrun,
        d if d < 0 => VarianceStatus::Early,
        _ => VarianceStatus::OnTime,
    };

    Variance {
        difference: Some(difference),
        percentage: Some(percentage),
        is_overrun: difference > 0,
        status,
    }
}

/// `2h 30m`, `2h`, `45m`; an em dash for missing, zero or negative input.
pub fn format_duration(minutes: Option<i64>) -> String {
    let minutes = match minutes {
        Some(m) if m > 0 => m,
        _ => return "—".to_string(),
    };

    match (minutes / 60, minutes % 60) {
        (0, m) => format!("{m}m"),
        (h, 0) => format!("{h}h"),
        (h, m) => format!("{h}h {m}m"),
    }
}

/// The timing-related view of a service order.
pub trait TimedOrder {
    fn created_at(&self) -> Option<DateTime<Utc>>;
    fn completed_at(&self) -> Option<DateTime<Utc>>;
    /// Estimate stored on the order, in minutes.
    fn estimated_duration(&self) -> Option<u32>;
    /// Actual duration stored on the order, in minutes.
    fn actual_duration(&self) -> Option<i64>;
}

/// Timing summary shown for an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTimeMetrics {
    pub estimated: u32,
    pub estimated_formatted: String,
    pub actual: Option<i64>,
    pub actual_formatted: String,
    pub estimated_completion: Option<DateTime<Utc>>,
    /// Present once an actual duration is known.
    pub variance: Option<Variance>,
    /// False only when the order completed after its estimated completion.
    pub eta_met: bool,
}

/// Compute timing metrics for an order.
///
/// The stored actual duration wins; otherwise it is derived from the
/// timestamps once the order is completed.
pub fn order_time_metrics<O: TimedOrder + ?Sized>(order: &O, default_minutes: u32) -> OrderTimeMetrics {
    let estimated = order
        .estimated_duration()
        .filter(|m| *m > 0)
        .unwrap_or(default_minutes);

    let actual = order.actual_duration().or_else(|| {
        order
            .completed_at()
            .and_then(|_| actual_duration(order.created_at(), order.completed_at()))
    });

    let estimated_completion = order
        .created_at()
        .map(|created| created + Duration::minutes(i64::from(estimated)));

    let eta_met = match (order.completed_at(), estimated_completion) {
        (Some(completed), Some(due)) => completed <= due,
        _ => true,
    };

    let variance = actual
        .filter(|a| *a != 0)
        .map(|a| variance(Some(estimated), Some(a)));

    OrderTimeMetrics {
        estimated,
        estimated_formatted: format_duration(Some(i64::from(estimated))),
        actual,
        actual_formatted: format_duration(actual),
        estimated_completion,
        variance,
        eta_met,
    }
}
