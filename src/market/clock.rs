/// Result of advancing the [`HorizonClock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HourTick {
    /// The next hour of the current day.
    Hour(usize),
    /// Every hour of the day has been handed out; the caller must reset.
    DayComplete,
}

/// A clock that hands out the hours of one simulated day.
///
/// The `HorizonClock` never wraps on its own: once the last hour has been
/// returned it keeps reporting [`HourTick::DayComplete`] until
/// [`HorizonClock::reset`] is called.
///
/// # Examples
///
/// ```
/// use dr_market_sim::market::clock::{HorizonClock, HourTick};
///
/// let mut clock = HorizonClock::new(2);
/// assert_eq!(clock.advance(), HourTick::Hour(0));
/// assert_eq!(clock.advance(), HourTick::Hour(1));
/// assert_eq!(clock.advance(), HourTick::DayComplete);
///
/// clock.reset();
/// assert_eq!(clock.advance(), HourTick::Hour(0));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HorizonClock {
    /// Next hour to hand out
    current: usize,
    /// Number of hours in a day
    hours_per_day: usize,
}

impl HorizonClock {
    /// Creates a clock positioned at hour 0.
    ///
    /// # Arguments
    ///
    /// * `hours_per_day` - The number of hours the clock hands out per day
    pub fn new(hours_per_day: usize) -> Self {
        Self {
            current: 0,
            hours_per_day,
        }
    }

    /// Advances the clock by one hour.
    ///
    /// # Returns
    ///
    /// * `HourTick::Hour(hour)` - The hour (starting from 0) before advancing
    /// * `HourTick::DayComplete` - If every hour of the day has been returned
    pub fn advance(&mut self) -> HourTick {
        if self.current < self.hours_per_day {
            let hour = self.current;
            self.current += 1;
            HourTick::Hour(hour)
        } else {
            HourTick::DayComplete
        }
    }

    /// Restores the cursor to hour 0.
    pub fn reset(&mut self) {
        self.current = 0;
    }

    /// Number of hours handed out so far today.
    pub fn current(&self) -> usize {
        self.current
    }

    pub fn hours_per_day(&self) -> usize {
        self.hours_per_day
    }
}
