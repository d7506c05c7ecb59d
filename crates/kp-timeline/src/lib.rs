//! kp-timeline: time-based views over effective data items.
//!
//! - `interest`: dates on which something changes, for the date picker
//! - `period`: calendar partitioning for a time dimension
//! - `aggregate`: per-period hours, staffing ratio and specialist quota

pub mod aggregate;
pub mod interest;
pub mod period;

pub use aggregate::{
    aggregate, aggregate_with, weekly_profile, ChartData, PeriodRatio, Regulation, WeekdayHours,
};
pub use interest::{extract_dates_of_interest, ChangeKind, ChangeTag, DateOfInterest};
pub use period::{partition, period_label, period_start, Period};
