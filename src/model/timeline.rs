use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Days of slack added on both sides of the task range.
pub const DATE_PADDING_DAYS: i64 = 3;
/// Horizontal offset of `min_date` inside the chart canvas.
pub const LEFT_MARGIN: f32 = 20.0;

/// Controls what scale the timeline displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[default]
    Day,
    Week,
    Month,
}

impl Granularity {
    pub const ALL: [Granularity; 3] = [Granularity::Day, Granularity::Week, Granularity::Month];

    /// Pixels per day at this scale.
    pub fn unit_width(self) -> f32 {
        match self {
            Granularity::Day => 40.0,
            Granularity::Week => 12.0,
            Granularity::Month => 4.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Granularity::Day => "Day",
            Granularity::Week => "Week",
            Granularity::Month => "Month",
        }
    }
}

/// Maps dates to horizontal pixel positions and back.
///
/// The date range is fixed when the axis is built from a task set; changing the
/// granularity only rescales `unit_width`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeAxis {
    pub min_date: NaiveDate,
    pub max_date: NaiveDate,
    pub granularity: Granularity,
    /// Pixels per day.
    pub unit_width: f32,
    pub left_margin: f32,
}

impl TimeAxis {
    /// Build the axis spanning every start and end date, padded on both sides.
    /// Returns `None` for an empty date set.
    pub fn from_dates<I>(dates: I, granularity: Granularity) -> Option<Self>
    where
        I: IntoIterator<Item = (NaiveDate, NaiveDate)>,
    {
        let mut range: Option<(NaiveDate, NaiveDate)> = None;
        for (start, end) in dates {
            let lo = start.min(end);
            let hi = start.max(end);
            range = Some(match range {
                Some((min, max)) => (min.min(lo), max.max(hi)),
                None => (lo, hi),
            });
        }
        let (min, max) = range?;
        Some(Self {
            min_date: min - Duration::days(DATE_PADDING_DAYS),
            max_date: max + Duration::days(DATE_PADDING_DAYS),
            granularity,
            unit_width: granularity.unit_width(),
            left_margin: LEFT_MARGIN,
        })
    }

    pub fn set_granularity(&mut self, granularity: Granularity) {
        self.granularity = granularity;
        self.unit_width = granularity.unit_width();
    }

    /// Convert a date to an x-pixel position on the canvas.
    pub fn date_to_x(&self, date: NaiveDate) -> f32 {
        let days = (date - self.min_date).num_days() as f32;
        self.left_margin + days * self.unit_width
    }

    /// Convert an x-pixel position back to the nearest day boundary.
    pub fn x_to_date(&self, x: f32) -> NaiveDate {
        let days = ((x - self.left_margin) / self.unit_width).round() as i64;
        self.min_date + Duration::days(days)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.min_date && date <= self.max_date
    }

    /// Number of day columns between `min_date` and `max_date`, inclusive.
    pub fn day_count(&self) -> i64 {
        (self.max_date - self.min_date).num_days() + 1
    }

    /// Canvas width needed to show the full range.
    pub fn total_width(&self) -> f32 {
        self.left_margin + self.day_count() as f32 * self.unit_width
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn sample_axis(granularity: Granularity) -> TimeAxis {
        TimeAxis::from_dates(
            [
                (d(2024, 1, 10), d(2024, 1, 12)),
                (d(2024, 2, 1), d(2024, 3, 15)),
                (d(2023, 12, 28), d(2024, 1, 2)),
            ],
            granularity,
        )
        .unwrap()
    }

    #[test]
    fn range_is_padded_by_three_days() {
        let axis = sample_axis(Granularity::Day);
        assert_eq!(axis.min_date, d(2023, 12, 25));
        assert_eq!(axis.max_date, d(2024, 3, 18));
    }

    #[test]
    fn empty_task_set_has_no_axis() {
        assert!(TimeAxis::from_dates(std::iter::empty(), Granularity::Week).is_none());
    }

    #[test]
    fn date_to_x_starts_at_left_margin() {
        let axis = sample_axis(Granularity::Day);
        assert_eq!(axis.date_to_x(axis.min_date), LEFT_MARGIN);
        assert_eq!(axis.date_to_x(axis.min_date + Duration::days(2)), LEFT_MARGIN + 80.0);
    }

    #[test]
    fn unit_width_narrows_from_day_to_month() {
        assert!(Granularity::Day.unit_width() > Granularity::Week.unit_width());
        assert!(Granularity::Week.unit_width() > Granularity::Month.unit_width());
    }

    #[test]
    fn granularity_switch_keeps_date_range() {
        let mut axis = sample_axis(Granularity::Day);
        let (min, max) = (axis.min_date, axis.max_date);
        axis.set_granularity(Granularity::Month);
        assert_eq!((axis.min_date, axis.max_date), (min, max));
        assert_eq!(axis.unit_width, Granularity::Month.unit_width());
    }

    #[test]
    fn x_to_date_rounds_to_nearest_day() {
        let axis = sample_axis(Granularity::Day);
        let x = axis.date_to_x(d(2024, 1, 10));
        assert_eq!(axis.x_to_date(x + 19.0), d(2024, 1, 10));
        assert_eq!(axis.x_to_date(x + 21.0), d(2024, 1, 11));
        assert_eq!(axis.x_to_date(x - 19.0), d(2024, 1, 10));
    }

    proptest! {
        #[test]
        fn x_to_date_inverts_date_to_x(offset in 0i64..90, g in 0usize..3) {
            let axis = sample_axis(Granularity::ALL[g]);
            let date = axis.min_date + Duration::days(offset);
            prop_assume!(axis.contains(date));
            prop_assert_eq!(axis.x_to_date(axis.date_to_x(date)), date);
        }
    }
}
