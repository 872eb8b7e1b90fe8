// Domain models: samples, rankings, session keys and emitted events

mod event;
mod ranking;
mod sample;
mod session;

pub use event::{AlertEvent, StatusEvent};
pub use ranking::{ProcessRef, RankedProcess, Ranking};
pub use sample::{ProcessSample, Sample, now_millis};
pub use session::SessionKey;
