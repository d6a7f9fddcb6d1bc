/// Inclusive hour range during which an appliance may be used.
///
/// A window whose `start` is greater than its `end` wraps past midnight:
/// `(22, 2)` covers hours 22, 23, 0, 1 and 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplianceWindow {
    /// First active hour (inclusive).
    pub start: usize,
    /// Last active hour (inclusive).
    pub end: usize,
}

impl ApplianceWindow {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Returns `true` when the window wraps past midnight.
    pub fn wraps(&self) -> bool {
        self.start > self.end
    }

    /// Returns `true` when `hour` falls within the window.
    pub fn contains(&self, hour: usize) -> bool {
        if self.wraps() {
            hour >= self.start || hour <= self.end
        } else {
            self.start <= hour && hour <= self.end
        }
    }
}

impl From<(usize, usize)> for ApplianceWindow {
    fn from((start, end): (usize, usize)) -> Self {
        Self::new(start, end)
    }
}

/// Hours during which grid power is available.
///
/// The bounds may be given in either order; the window always covers the
/// inclusive range `[min(lo, hi), max(lo, hi)]` and never wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerWindow {
    pub lo: usize,
    pub hi: usize,
}

impl PowerWindow {
    pub fn new(lo: usize, hi: usize) -> Self {
        Self { lo, hi }
    }

    /// Window covering every hour of a day with `hours` steps.
    pub fn always(hours: usize) -> Self {
        Self::new(0, hours.saturating_sub(1))
    }

    /// Returns `true` when grid power is available at `hour`.
    pub fn contains(&self, hour: usize) -> bool {
        self.lo.min(self.hi) <= hour && hour <= self.lo.max(self.hi)
    }
}

impl From<(usize, usize)> for PowerWindow {
    fn from((lo, hi): (usize, usize)) -> Self {
        Self::new(lo, hi)
    }
}
