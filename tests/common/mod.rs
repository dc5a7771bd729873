use std::time::Duration;

pub const SHORT_TIMEOUT: Duration = Duration::from_millis(500);
pub const LONG_TIMEOUT: Duration = Duration::from_secs(3);
pub const SETTLE_DELAY: Duration = Duration::from_millis(50);
pub const ITEMS_LOW: usize = 50;
