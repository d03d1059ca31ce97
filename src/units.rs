//! Unit and calendar helpers shared by the energy, goal and check-in engines

use crate::error::{ensure_in_range, InputError};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

/// Kilograms per pound
pub const KG_PER_POUND: Decimal = dec!(0.453592);

/// Centimeters per inch
pub const CM_PER_INCH: Decimal = dec!(2.54);

const SECONDS_PER_DAY: i64 = 86_400;

/// Convert pounds to kilograms
pub fn pounds_to_kg(lbs: Decimal) -> Decimal {
    lbs * KG_PER_POUND
}

/// Convert kilograms to pounds
pub fn kg_to_pounds(kg: Decimal) -> Result<Decimal, InputError> {
    ensure_in_range("pounds", kg.checked_div(KG_PER_POUND))
}

/// Convert a feet + inches height to centimeters
pub fn feet_inches_to_cm(feet: Decimal, inches: Decimal) -> Result<Decimal, InputError> {
    let cm = feet
        .checked_mul(dec!(12))
        .and_then(|total| total.checked_add(inches))
        .and_then(|total| total.checked_mul(CM_PER_INCH));
    ensure_in_range("height in centimeters", cm)
}

/// Whole years elapsed between `birth_date` and `reference_date` (floored)
pub fn age_in_years(birth_date: NaiveDate, reference_date: NaiveDate) -> Result<u32, InputError> {
    reference_date
        .years_since(birth_date)
        .ok_or(InputError::BirthDateInFuture {
            birth_date,
            reference_date,
        })
}

/// Calendar-day difference between two instants, rounded to the nearest day.
///
/// Negative when `end` precedes `start`. Half days round up.
pub fn days_between(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    let seconds = (end - start).num_seconds();
    (seconds + SECONDS_PER_DAY / 2).div_euclid(SECONDS_PER_DAY)
}

/// Midnight UTC at the start of `date`
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Round to the nearest integer, halves rounding towards positive infinity.
///
/// Same as `floor(value + 0.5)` but cannot overflow near `Decimal::MAX`.
pub fn round_half_up(value: Decimal) -> Decimal {
    let floor = value.floor();
    if value - floor >= dec!(0.5) {
        floor + Decimal::ONE
    } else {
        floor
    }
}

/// Round to one decimal place for display in messages
pub fn round_tenth(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
}
