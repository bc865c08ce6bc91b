//! Vendor sources: payload builders and normalizers per remote API
//!
//! - `prices`: ticket price calendar, one request per product configuration
//! - `schedules`: activity schedules, one request per date

pub mod prices;
pub mod schedules;

pub use prices::{PriceNormalizer, PricePayloadBuilder};
pub use schedules::{ScheduleNormalizer, SchedulePayloadBuilder};
