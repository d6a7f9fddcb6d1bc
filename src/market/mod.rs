/// Horizon clock handing out the hours of a day.
pub mod clock;
pub mod coordinator;
pub mod driver;
pub mod kpi;
/// Sequential running-load pricing.
pub mod pricing;
pub mod report;
pub mod types;
/// Appliance and grid power windows.
pub mod window;
