#![doc = "Duty-cycle engine for procclock: calibration, signal dispatch, and scheduling."]

pub mod calibrator;
pub mod clock;
pub mod dispatcher;
pub mod interrupt;
pub mod realtime;
pub mod scheduler;
pub mod target;

pub use calibrator::*;
pub use clock::*;
pub use dispatcher::*;
pub use interrupt::*;
pub use realtime::*;
pub use scheduler::*;
pub use target::*;
