//! Build check-in observations from logged diary totals and weigh-ins

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Bound;
use tracing::debug;

use crate::error::{
    ensure_in_range, ensure_non_negative, ensure_positive, InputError, NutritionError, Result,
};
use crate::models::{CheckInObservation, DEFAULT_PERIOD_DAYS};

const CALCULATION: &str = "weekly check-in";

/// Calories logged for one diary entry or day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyCalorieTotal {
    pub date: NaiveDate,
    pub calories: Decimal,
}

/// A single weigh-in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightEntry {
    pub date: NaiveDate,
    pub weight_lbs: Decimal,
}

/// Diary totals and weigh-ins handed over for one check-in
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressLog {
    #[serde(default)]
    pub calories: Vec<DailyCalorieTotal>,
    #[serde(default)]
    pub weights: Vec<WeightEntry>,
}

/// Observation window `(period_end - period_days, period_end]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressWindow {
    pub period_end: NaiveDate,
    pub period_days: u32,
}

impl ProgressWindow {
    pub fn new(period_end: NaiveDate, period_days: u32) -> Self {
        ProgressWindow {
            period_end,
            period_days,
        }
    }

    /// Seven-day window ending on `period_end`
    pub fn weekly(period_end: NaiveDate) -> Self {
        Self::new(period_end, DEFAULT_PERIOD_DAYS)
    }

    /// Exclusive start of the window
    pub fn start(&self) -> NaiveDate {
        self.period_end - Duration::days(i64::from(self.period_days))
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date > self.start() && date <= self.period_end
    }

    /// Sum entries per day inside the window
    pub fn aggregate_daily_calories(
        &self,
        totals: &[DailyCalorieTotal],
    ) -> Result<BTreeMap<NaiveDate, Decimal>> {
        let mut daily: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
        for total in totals.iter().filter(|t| self.contains(t.date)) {
            ensure_non_negative("calories", total.calories)?;
            let day = daily.entry(total.date).or_insert(Decimal::ZERO);
            *day = ensure_in_range("daily calories", day.checked_add(total.calories))?;
        }
        Ok(daily)
    }

    /// Average intake over days with a diary log; unlogged days are skipped
    pub fn average_daily_calories(&self, totals: &[DailyCalorieTotal]) -> Result<Decimal> {
        let daily = self.aggregate_daily_calories(totals)?;
        let logged: Vec<Decimal> = daily.into_values().filter(|c| !c.is_zero()).collect();

        if logged.is_empty() {
            return Err(NutritionError::InsufficientData {
                calculation: CALCULATION.to_string(),
                reason: format!("no calories logged between {} and {}", self.start(), self.period_end),
            });
        }

        let sum = logged
            .iter()
            .try_fold(Decimal::ZERO, |acc, calories| acc.checked_add(*calories));
        Ok(ensure_in_range("calorie total", sum)? / Decimal::from(logged.len()))
    }

    /// Previous and current weigh-in for the window.
    ///
    /// Previous is the latest weigh-in on or before the window start, falling
    /// back to the earliest weigh-in inside the window. Current is the latest
    /// weigh-in inside the window. Same-day duplicates keep the last entry.
    /// The two may be further apart than one window; callers rescale by the
    /// dates they carry.
    pub fn weight_change_endpoints(
        &self,
        weights: &[WeightEntry],
    ) -> Result<(WeightEntry, WeightEntry)> {
        let mut by_date: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
        for entry in weights.iter().filter(|w| w.date <= self.period_end) {
            ensure_positive("weight_lbs", entry.weight_lbs)?;
            by_date.insert(entry.date, entry.weight_lbs);
        }

        let start = self.start();
        let in_window: Vec<(NaiveDate, Decimal)> = by_date
            .range((Bound::Excluded(start), Bound::Unbounded))
            .map(|(date, weight)| (*date, *weight))
            .collect();

        let (current_date, current_weight) = in_window.last().copied().ok_or_else(|| {
            NutritionError::InsufficientData {
                calculation: CALCULATION.to_string(),
                reason: format!("no weigh-in between {} and {}", start, self.period_end),
            }
        })?;

        let previous = by_date
            .range(..=start)
            .next_back()
            .map(|(date, weight)| (*date, *weight))
            .or_else(|| {
                in_window
                    .first()
                    .copied()
                    .filter(|(date, _)| *date != current_date)
            })
            .map(|(date, weight_lbs)| WeightEntry { date, weight_lbs })
            .ok_or_else(|| NutritionError::InsufficientData {
                calculation: CALCULATION.to_string(),
                reason: "at least two weigh-ins are required".to_string(),
            })?;

        let current = WeightEntry {
            date: current_date,
            weight_lbs: current_weight,
        };
        Ok((previous, current))
    }

    /// Observation for the weekly check-in engine
    pub fn observation(
        &self,
        totals: &[DailyCalorieTotal],
        weights: &[WeightEntry],
    ) -> Result<CheckInObservation> {
        if self.period_days == 0 {
            return Err(InputError::non_positive("period_days", Decimal::ZERO).into());
        }

        let avg_daily_calories = self.average_daily_calories(totals)?;
        let (previous, current) = self.weight_change_endpoints(weights)?;
        let span = (current.date - previous.date).num_days();
        let weigh_in_days = u32::try_from(span).map_err(|_| InputError::OutOfRange {
            calculation: "weigh-in span".to_string(),
        })?;

        debug!(
            start = %self.start(),
            end = %self.period_end,
            avg = %avg_daily_calories,
            previous = %previous.weight_lbs,
            current = %current.weight_lbs,
            weigh_in_days,
            "Built check-in observation"
        );

        Ok(CheckInObservation {
            previous_weight_lbs: previous.weight_lbs,
            current_weight_lbs: current.weight_lbs,
            avg_daily_calories,
            period_days: self.period_days,
            weigh_in_days: Some(weigh_in_days),
        })
    }
}
