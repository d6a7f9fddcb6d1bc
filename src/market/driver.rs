//! Simulation driver: the day/hour state machine around a market.

use tracing::info;

use crate::error::{MarketError, Result};
use crate::solver::NonlinearSolver;

use super::clock::HourTick;
use super::coordinator::MarketCoordinator;
use super::report::ReportSink;
use super::types::UserStepRecord;

/// Position of the driver in its day loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationState {
    /// Hours of the current day remain to be resolved.
    RunningHour,
    /// The last hour of a day was resolved and the day was reset.
    DayComplete,
    /// Every configured day has run.
    SimulationComplete,
}

/// Runs a market over a fixed number of days.
///
/// Each call to [`Driver::step`] performs exactly one state transition:
///
/// | from            | to                   | when                          |
/// |-----------------|----------------------|-------------------------------|
/// | `RunningHour`   | `RunningHour`        | an hour was priced and solved |
/// | `RunningHour`   | `DayComplete`        | the clock ran out; day reset  |
/// | `DayComplete`   | `RunningHour`        | days remain                   |
/// | `DayComplete`   | `SimulationComplete` | all days done                 |
#[derive(Debug)]
pub struct Driver<S: NonlinearSolver> {
    market: MarketCoordinator<S>,
    days: usize,
    /// Index of the day in progress, or number of completed days once finished.
    day: usize,
    state: SimulationState,
}

impl<S: NonlinearSolver> Driver<S> {
    /// Creates a driver positioned at hour 0 of day 0.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Configuration`] if `days` is zero.
    pub fn new(market: MarketCoordinator<S>, days: usize) -> Result<Self> {
        if days == 0 {
            return Err(MarketError::config("days", "must be > 0"));
        }
        Ok(Self {
            market,
            days,
            day: 0,
            state: SimulationState::RunningHour,
        })
    }

    /// Performs one state transition and returns the new state.
    ///
    /// # Errors
    ///
    /// Propagates fatal market errors.
    pub fn step(&mut self, sink: &mut dyn ReportSink) -> Result<SimulationState> {
        match self.state {
            SimulationState::RunningHour => {
                if self.market.advance_hour(self.day, sink)? == HourTick::DayComplete {
                    self.market.reset_day();
                    sink.day_complete(self.day);
                    info!(day = self.day, "day complete");
                    self.day += 1;
                    self.state = SimulationState::DayComplete;
                }
            }
            SimulationState::DayComplete => {
                self.state = if self.day >= self.days {
                    SimulationState::SimulationComplete
                } else {
                    SimulationState::RunningHour
                };
            }
            SimulationState::SimulationComplete => {}
        }
        Ok(self.state)
    }

    /// Steps until [`SimulationState::SimulationComplete`].
    ///
    /// # Errors
    ///
    /// Propagates fatal market errors.
    pub fn run(&mut self, sink: &mut dyn ReportSink) -> Result<()> {
        while self.state != SimulationState::SimulationComplete {
            self.step(sink)?;
        }
        Ok(())
    }

    /// Runs to completion and returns every record.
    ///
    /// # Errors
    ///
    /// Propagates fatal market errors.
    pub fn run_collect(&mut self) -> Result<Vec<UserStepRecord>> {
        let hours = self.market.config().hours_per_day;
        let mut records = Vec::with_capacity(self.days * hours * self.market.users().len());
        self.run(&mut records)?;
        Ok(records)
    }

    pub fn state(&self) -> SimulationState {
        self.state
    }

    pub fn day(&self) -> usize {
        self.day
    }

    pub fn days(&self) -> usize {
        self.days
    }

    pub fn market(&self) -> &MarketCoordinator<S> {
        &self.market
    }
}
