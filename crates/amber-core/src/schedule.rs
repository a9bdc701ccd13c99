//! The fixed commission installment schedule.
//!
//! Every approved indication is worth exactly three installments of 300.00
//! falling due 0, 30, and 90 days after the approval date.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

/// Number of installments generated per approved indication.
pub const INSTALLMENT_COUNT: u32 = 3;

/// Days after the approval date at which each installment falls due,
/// indexed by `installment_number - 1`.
pub const DUE_OFFSET_DAYS: [i64; 3] = [0, 30, 90];

/// Value of a single installment.
#[must_use]
pub fn installment_value() -> Decimal {
    Decimal::new(300_00, 2)
}

/// Total commission per approved indication.
#[must_use]
pub fn total_commission() -> Decimal {
    Decimal::new(900_00, 2)
}

/// Due date of installment `number` (1-based) for the given approval date.
///
/// # Panics
///
/// Panics if `number` is outside `1..=3`; callers iterate over
/// [`installment_numbers`] and never construct other values.
#[must_use]
pub fn due_date(approval_date: DateTime<Utc>, number: u32) -> DateTime<Utc> {
    let index = usize::try_from(number.checked_sub(1).expect("installment number is 1-based"))
        .expect("installment number fits usize");
    approval_date + Duration::days(DUE_OFFSET_DAYS[index])
}

/// Iterator over the valid installment numbers, `1..=3`.
pub fn installment_numbers() -> impl Iterator<Item = u32> {
    1..=INSTALLMENT_COUNT
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn three_installments_sum_to_total() {
        let sum: Decimal = installment_numbers().map(|_| installment_value()).sum();
        assert_eq!(sum, total_commission());
    }

    #[test]
    fn due_dates_follow_offsets_from_approval() {
        let approval = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        assert_eq!(due_date(approval, 1), approval);
        assert_eq!(
            due_date(approval, 2),
            Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap()
        );
        assert_eq!(
            due_date(approval, 3),
            Utc.with_ymd_and_hms(2024, 3, 31, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn due_dates_are_non_decreasing_by_number() {
        let approval = Utc::now();
        let dates: Vec<_> = installment_numbers()
            .map(|n| due_date(approval, n))
            .collect();
        assert!(dates.windows(2).all(|w| w[0] <= w[1]));
    }
}
