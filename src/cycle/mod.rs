pub mod controller;
pub mod event;
mod loop_worker;
pub mod state;

pub use controller::CycleController;
pub use event::{ChannelSink, LogSink, PhaseEvent, PhaseEventSink};
pub use state::{SchedulerSnapshot, SchedulerState, SchedulerStatus};
