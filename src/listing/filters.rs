use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, FixedOffset, Months, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::order::{OrderError, OrderStatus};
use crate::store::Filter;

/// Server-side status predicate selected in the orders view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StatusFilter {
    #[default]
    All,
    Only(OrderStatus),
}

impl StatusFilter {
    pub fn to_filter(self) -> Option<Filter> {
        match self {
            StatusFilter::All => None,
            StatusFilter::Only(status) => Some(Filter::StatusEquals(status)),
        }
    }
}

impl FromStr for StatusFilter {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(StatusFilter::All)
        } else {
            OrderStatus::normalize(s).map(StatusFilter::Only)
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusFilter::All => f.write_str("all"),
            StatusFilter::Only(status) => fmt::Display::fmt(status, f),
        }
    }
}

/// Server-side creation-date window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateFilter {
    #[default]
    All,
    Today,
    Week,
    Month,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown date filter {0:?}, expected one of all, today, week, month")]
pub struct UnknownDateFilter(pub String);

impl DateFilter {
    /// Inclusive lower bound on `date`, or `None` for no predicate.
    ///
    /// `today` starts at midnight in `offset`; `week` is now minus seven days;
    /// `month` is now minus one calendar month, clamped to the shorter month's
    /// last day. Chrono only fails that subtraction at the edge of its
    /// representable range; there `month` falls back to thirty days, or to
    /// the earliest representable instant.
    pub fn lower_bound(self, now: DateTime<Utc>, offset: FixedOffset) -> Option<DateTime<Utc>> {
        match self {
            DateFilter::All => None,
            DateFilter::Today => {
                let local = now.with_timezone(&offset);
                local
                    .date_naive()
                    .and_hms_opt(0, 0, 0)
                    .and_then(|midnight| midnight.and_local_timezone(offset).single())
                    .map(|midnight| midnight.with_timezone(&Utc))
            }
            DateFilter::Week => Some(now - Duration::days(7)),
            DateFilter::Month => now
                .with_timezone(&offset)
                .checked_sub_months(Months::new(1))
                .map(|bound| bound.with_timezone(&Utc))
                .or_else(|| now.checked_sub_signed(Duration::days(30)))
                .or(Some(DateTime::<Utc>::MIN_UTC)),
        }
    }

    pub fn to_filter(self, now: DateTime<Utc>, offset: FixedOffset) -> Option<Filter> {
        self.lower_bound(now, offset).map(Filter::DateAtLeast)
    }
}

impl FromStr for DateFilter {
    type Err = UnknownDateFilter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(DateFilter::All),
            "today" => Ok(DateFilter::Today),
            "week" => Ok(DateFilter::Week),
            "month" => Ok(DateFilter::Month),
            _ => Err(UnknownDateFilter(s.to_string())),
        }
    }
}

/// The filter combination a listing session (and its cursor) is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListingFilters {
    pub status: StatusFilter,
    pub date: DateFilter,
}

impl ListingFilters {
    pub fn new(status: StatusFilter, date: DateFilter) -> Self {
        Self { status, date }
    }

    /// Store predicates in composition order: status, then date.
    pub fn to_store_filters(&self, now: DateTime<Utc>, offset: FixedOffset) -> Vec<Filter> {
        self.status
            .to_filter()
            .into_iter()
            .chain(self.date.to_filter(now, offset))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[test]
    fn test_status_filter_parse() {
        assert_eq!("all".parse::<StatusFilter>().unwrap(), StatusFilter::All);
        assert_eq!(
            "In Transit".parse::<StatusFilter>().unwrap(),
            StatusFilter::Only(OrderStatus::InTransit)
        );
        assert!("sideways".parse::<StatusFilter>().is_err());
    }

    #[test]
    fn test_date_filter_parse() {
        assert_eq!("Week".parse::<DateFilter>().unwrap(), DateFilter::Week);
        assert!("fortnight".parse::<DateFilter>().is_err());
    }

    #[test]
    fn test_today_starts_at_local_midnight() {
        let now = Utc.with_ymd_and_hms(2026, 10, 17, 15, 45, 0).unwrap();
        assert_eq!(
            DateFilter::Today.lower_bound(now, utc()),
            Some(Utc.with_ymd_and_hms(2026, 10, 17, 0, 0, 0).unwrap())
        );

        // 02:00 UTC is already 07:30 on the same day in UTC+05:30, whose
        // midnight is 18:30 UTC the day before.
        let ist = FixedOffset::east_opt(5 * 3600 + 1800).unwrap();
        let early = Utc.with_ymd_and_hms(2026, 10, 17, 2, 0, 0).unwrap();
        assert_eq!(
            DateFilter::Today.lower_bound(early, ist),
            Some(Utc.with_ymd_and_hms(2026, 10, 16, 18, 30, 0).unwrap())
        );
    }

    #[test]
    fn test_week_and_month_bounds() {
        let now = Utc.with_ymd_and_hms(2026, 3, 31, 12, 0, 0).unwrap();
        assert_eq!(
            DateFilter::Week.lower_bound(now, utc()),
            Some(Utc.with_ymd_and_hms(2026, 3, 24, 12, 0, 0).unwrap())
        );
        assert_eq!(
            DateFilter::Month.lower_bound(now, utc()),
            Some(Utc.with_ymd_and_hms(2026, 2, 28, 12, 0, 0).unwrap())
        );
        assert_eq!(DateFilter::All.lower_bound(now, utc()), None);
    }

    #[test]
    fn test_month_bound_at_range_edge() {
        let now = DateTime::<Utc>::MIN_UTC + Duration::days(10);
        assert_eq!(
            DateFilter::Month.lower_bound(now, utc()),
            Some(DateTime::<Utc>::MIN_UTC)
        );

        // One calendar month back is out of range, thirty days is not.
        let now = DateTime::<Utc>::MIN_UTC + Duration::days(30);
        assert_eq!(
            DateFilter::Month.lower_bound(now, utc()),
            Some(now - Duration::days(30))
        );
    }

    #[test]
    fn test_store_filters_composition() {
        let now = Utc.with_ymd_and_hms(2026, 10, 17, 15, 45, 0).unwrap();

        assert!(ListingFilters::default().to_store_filters(now, utc()).is_empty());

        let filters = ListingFilters::new(StatusFilter::Only(OrderStatus::Delivered), DateFilter::Today)
            .to_store_filters(now, utc());
        assert_eq!(
            filters,
            vec![
                Filter::StatusEquals(OrderStatus::Delivered),
                Filter::DateAtLeast(Utc.with_ymd_and_hms(2026, 10, 17, 0, 0, 0).unwrap()),
            ]
        );
    }
}
