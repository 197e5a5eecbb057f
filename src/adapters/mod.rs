pub mod market_hours;

pub use market_hours::{parse_time, AlwaysOpen, MarketHoursGate};
