use chrono::NaiveDate;

use crate::model::TimeAxis;

/// Share of the viewport left of the today line after auto-scroll.
pub const TODAY_VIEWPORT_FRACTION: f32 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TodayMarker {
    pub date: NaiveDate,
    /// Left edge of today's day cell.
    pub x: f32,
}

/// The today line, when today falls inside the padded range.
pub fn today_marker(axis: &TimeAxis, today: NaiveDate) -> Option<TodayMarker> {
    axis.contains(today).then(|| TodayMarker {
        date: today,
        x: axis.date_to_x(today),
    })
}

/// Horizontal scroll offset that puts `x` at 40% of the viewport width.
pub fn scroll_offset_for(x: f32, viewport_width: f32) -> f32 {
    (x - viewport_width * TODAY_VIEWPORT_FRACTION).max(0.0)
}

/// A scroll request that fires only after the chart has been laid out once.
///
/// The scroll area does not know its content width on the frame the data
/// arrives, so the request waits for one full pass before applying.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeferredScroll {
    frames_left: Option<u8>,
}

impl DeferredScroll {
    pub fn schedule(&mut self) {
        self.frames_left = Some(1);
    }

    pub fn cancel(&mut self) {
        self.frames_left = None;
    }

    pub fn is_pending(&self) -> bool {
        self.frames_left.is_some()
    }

    /// Advance one frame. Returns `true` on the frame the scroll should apply.
    pub fn tick(&mut self) -> bool {
        match self.frames_left {
            Some(0) => {
                self.frames_left = None;
                true
            }
            Some(n) => {
                self.frames_left = Some(n - 1);
                false
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Granularity;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, day).unwrap()
    }

    fn axis() -> TimeAxis {
        TimeAxis::from_dates([(d(1, 10), d(1, 20))], Granularity::Day).unwrap()
    }

    #[test]
    fn marker_inside_padded_range() {
        let axis = axis();
        let m = today_marker(&axis, d(1, 15)).unwrap();
        assert_eq!(m.x, axis.date_to_x(d(1, 15)));
        // Padding days still count.
        assert!(today_marker(&axis, d(1, 7)).is_some());
        assert!(today_marker(&axis, d(1, 23)).is_some());
    }

    #[test]
    fn marker_hidden_outside_range() {
        let axis = axis();
        assert!(today_marker(&axis, d(1, 6)).is_none());
        assert!(today_marker(&axis, d(3, 1)).is_none());
    }

    #[test]
    fn scroll_offset_puts_today_at_forty_percent() {
        assert_eq!(scroll_offset_for(1000.0, 500.0), 800.0);
        assert_eq!(scroll_offset_for(100.0, 500.0), 0.0);
    }

    #[test]
    fn deferred_scroll_waits_one_frame() {
        let mut s = DeferredScroll::default();
        assert!(!s.tick());
        s.schedule();
        assert!(s.is_pending());
        assert!(!s.tick());
        assert!(s.tick());
        assert!(!s.is_pending());
        assert!(!s.tick());

        s.schedule();
        s.cancel();
        assert!(!s.tick());
    }
}
