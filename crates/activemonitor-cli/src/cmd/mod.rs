pub mod days;
pub mod migrate;
pub mod rec;
pub mod show;

use activemonitor_core::{Clock, FixedClock, Settings, SystemClock};

/// The clock commands read "now" from: pinned by `NOW`, otherwise the system.
pub fn clock(settings: &Settings) -> Box<dyn Clock> {
    match settings.now {
        Some(at) => Box::new(FixedClock(at)),
        None => Box::new(SystemClock),
    }
}
