// engine module: polling, change detection and the release conduit

pub mod delivery;
pub mod detector;
pub mod emitter;
mod interface;
mod scheduler;
pub mod stub;

pub use delivery::{DeliveryStats, run_delivery_loop};
pub use detector::{ChangeDetector, Detection, FirstObservation, Watermark};
pub use emitter::{Emitter, ReleaseStream};
pub use interface::{
    DeliveryError, DeliverySink, EmitError, QueryError, ReleaseSource, Shutdown, ShutdownTrigger,
    shutdown_channel,
};
pub use scheduler::{PassSummary, PollScheduler};
pub use stub::{RecordingSink, StubSource};
