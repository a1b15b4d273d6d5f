//! Overdue fine rule.
//!
//! A loan is free for the first `grace_days` days; every day after that costs
//! `rate_per_day`. Dates that are missing or not `YYYY-MM-DD` produce no fine
//! rather than an error.

use thiserror::Error;
use time::{macros::format_description, Date};

use libris_kernel::settings::FineSettings;

/// Rate and grace period used to price a late return
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinePolicy {
    pub rate_per_day: f64,
    pub grace_days: i64,
}

/// Rejected rate or grace period
#[derive(Debug, Error, PartialEq)]
pub enum InvalidFinePolicy {
    #[error("fine rate must be a non-negative number, got {0}")]
    Rate(f64),
    #[error("grace period must be non-negative, got {0} days")]
    GraceDays(i64),
}

impl FinePolicy {
    /// Build a policy, rejecting negative or non-finite rates and negative
    /// grace periods.
    pub fn new(rate_per_day: f64, grace_days: i64) -> Result<Self, InvalidFinePolicy> {
        if !rate_per_day.is_finite() || rate_per_day < 0.0 {
            return Err(InvalidFinePolicy::Rate(rate_per_day));
        }
        if grace_days < 0 {
            return Err(InvalidFinePolicy::GraceDays(grace_days));
        }
        Ok(Self {
            rate_per_day,
            grace_days,
        })
    }
}

impl Default for FinePolicy {
    fn default() -> Self {
        Self {
            rate_per_day: 2.0,
            grace_days: 14,
        }
    }
}

impl From<&FineSettings> for FinePolicy {
    fn from(settings: &FineSettings) -> Self {
        Self {
            rate_per_day: settings.rate_per_day,
            grace_days: settings.grace_days,
        }
    }
}

/// Parse an ISO `YYYY-MM-DD` date.
pub fn parse_date(text: &str) -> Option<Date> {
    Date::parse(text.trim(), format_description!("[year]-[month]-[day]")).ok()
}

/// Fine owed for a loan running from `borrow_date` to `return_date`.
///
/// Never negative: early returns, reversed dates and out-of-range policies
/// cost nothing.
pub fn compute_fine(
    borrow_date: Option<&str>,
    return_date: Option<&str>,
    policy: &FinePolicy,
) -> f64 {
    let (Some(borrow_text), Some(return_text)) = (borrow_date, return_date) else {
        return 0.0;
    };

    let (Some(borrowed), Some(returned)) = (parse_date(borrow_text), parse_date(return_text)) else {
        tracing::debug!(
            borrow_date = borrow_text,
            return_date = return_text,
            "unparseable loan dates, no fine charged"
        );
        return 0.0;
    };

    let days_late = (returned - borrowed)
        .whole_days()
        .saturating_sub(policy.grace_days);
    if days_late <= 0 {
        return 0.0;
    }

    // f64::max also maps a NaN product to zero.
    (days_late as f64 * policy.rate_per_day).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{macros::date, Duration};

    fn iso(date: Date) -> String {
        date.format(format_description!("[year]-[month]-[day]"))
            .unwrap()
    }

    #[test]
    fn parses_iso_dates_only() {
        assert_eq!(parse_date("2024-01-20"), Some(date!(2024 - 01 - 20)));
        assert_eq!(parse_date(" 2024-02-29 "), Some(date!(2024 - 02 - 29)));
        assert_eq!(parse_date("2023-02-29"), None);
        assert_eq!(parse_date("20/01/2024"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn grace_period_is_free() {
        let policy = FinePolicy::default();
        let borrowed = date!(2024 - 03 - 01);

        for days in 0..=policy.grace_days {
            let returned = borrowed + Duration::days(days);
            assert_eq!(
                compute_fine(Some(&iso(borrowed)), Some(&iso(returned)), &policy),
                0.0,
                "{days} days should be within the grace period"
            );
        }
    }

    #[test]
    fn fine_grows_linearly_after_grace_period() {
        let policy = FinePolicy::default();
        assert_eq!(
            compute_fine(Some("2024-01-01"), Some("2024-01-20"), &policy),
            10.0
        );
        assert_eq!(
            compute_fine(Some("2024-01-01"), Some("2024-01-16"), &policy),
            2.0
        );
        assert_eq!(
            compute_fine(Some("2023-12-25"), Some("2024-01-20"), &policy),
            24.0
        );
    }

    #[test]
    fn custom_policy_is_respected() {
        let policy = FinePolicy {
            rate_per_day: 0.25,
            grace_days: 7,
        };
        assert_eq!(
            compute_fine(Some("2024-01-01"), Some("2024-01-12"), &policy),
            1.0
        );
    }

    #[test]
    fn missing_or_malformed_dates_cost_nothing() {
        let policy = FinePolicy::default();
        assert_eq!(compute_fine(Some("2024-01-01"), None, &policy), 0.0);
        assert_eq!(compute_fine(None, Some("2024-03-01"), &policy), 0.0);
        assert_eq!(compute_fine(None, None, &policy), 0.0);
        assert_eq!(
            compute_fine(Some("2024-01-01"), Some("next tuesday"), &policy),
            0.0
        );
        assert_eq!(
            compute_fine(Some("2024-13-01"), Some("2024-03-01"), &policy),
            0.0
        );
    }

    #[test]
    fn fine_is_never_negative() {
        let policy = FinePolicy::default();
        let returned = date!(2024 - 01 - 01);

        for days_before in 0..60 {
            let borrowed = returned + Duration::days(days_before);
            let fine = compute_fine(Some(&iso(borrowed)), Some(&iso(returned)), &policy);
            assert!(fine >= 0.0);
            assert_eq!(fine, 0.0);
        }
    }

    #[test]
    fn fine_is_never_negative_for_any_policy() {
        let late = (Some("2024-01-01"), Some("2024-03-01"));
        let early = (Some("2024-03-01"), Some("2024-01-01"));

        for rate_per_day in [-2.0, -0.01, 0.0, 0.5, f64::NAN, f64::NEG_INFINITY] {
            for grace_days in [i64::MIN, -14, 0, 14, i64::MAX] {
                let policy = FinePolicy {
                    rate_per_day,
                    grace_days,
                };
                for (borrowed, returned) in [late, early] {
                    let fine = compute_fine(borrowed, returned, &policy);
                    assert!(
                        fine >= 0.0,
                        "rate {rate_per_day}, grace {grace_days}: fine {fine}"
                    );
                }
            }
        }
    }

    #[test]
    fn negative_rate_charges_nothing() {
        let policy = FinePolicy {
            rate_per_day: -2.0,
            grace_days: 14,
        };
        assert_eq!(
            compute_fine(Some("2024-01-01"), Some("2024-01-20"), &policy),
            0.0
        );
    }

    #[test]
    fn extreme_grace_periods_do_not_overflow() {
        let rate = FinePolicy {
            rate_per_day: 1.0,
            grace_days: i64::MIN,
        };
        let fine = compute_fine(Some("2024-01-01"), Some("2024-01-20"), &rate);
        assert!(fine > 0.0 && fine.is_finite());

        let never = FinePolicy {
            rate_per_day: 1.0,
            grace_days: i64::MAX,
        };
        assert_eq!(
            compute_fine(Some("2024-01-01"), Some("2024-01-20"), &never),
            0.0
        );
    }

    #[test]
    fn zero_grace_charges_from_the_first_day() {
        let policy = FinePolicy::new(2.0, 0).unwrap();
        assert_eq!(
            compute_fine(Some("2024-01-01"), Some("2024-01-01"), &policy),
            0.0
        );
        assert_eq!(
            compute_fine(Some("2024-01-01"), Some("2024-01-04"), &policy),
            6.0
        );
    }

    #[test]
    fn new_rejects_out_of_range_values() {
        assert_eq!(
            FinePolicy::new(-2.0, 14),
            Err(InvalidFinePolicy::Rate(-2.0))
        );
        assert!(matches!(
            FinePolicy::new(f64::NAN, 14),
            Err(InvalidFinePolicy::Rate(_))
        ));
        assert_eq!(
            FinePolicy::new(2.0, -1),
            Err(InvalidFinePolicy::GraceDays(-1))
        );
        assert_eq!(FinePolicy::new(0.0, 0).unwrap().rate_per_day, 0.0);
        assert_eq!(FinePolicy::new(2.0, 14).unwrap(), FinePolicy::default());
    }

    #[test]
    fn policy_from_settings() {
        let settings = FineSettings {
            rate_per_day: 1.5,
            grace_days: 21,
        };
        assert_eq!(
            FinePolicy::from(&settings),
            FinePolicy {
                rate_per_day: 1.5,
                grace_days: 21
            }
        );
    }
}
