use super::types::UserStepRecord;

/// Receiver of per-user hourly records.
///
/// Reporting is advisory: no market behavior depends on what a sink does
/// with the records.
pub trait ReportSink {
    /// Called once per user per hour, after the user's best response.
    fn record(&mut self, record: &UserStepRecord);

    /// Called when a day has completed and the clock was reset.
    fn day_complete(&mut self, _day: usize) {}
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ReportSink for NullSink {
    fn record(&mut self, _record: &UserStepRecord) {}
}

impl ReportSink for Vec<UserStepRecord> {
    fn record(&mut self, record: &UserStepRecord) {
        self.push(record.clone());
    }
}
