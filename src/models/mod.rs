// Domain models shared by the sampler, pipeline, store and rendering consumers

mod alert;
mod anomaly;
mod frame;
mod metric;
mod snapshot;
mod stored;

pub use alert::{AlertEvent, AlertKey, AlertSource};
pub use anomaly::{AnomalyResult, Direction};
pub use frame::DashboardFrame;
pub use metric::{ColorHint, MetricKind, Severity};
pub use snapshot::{ProcessSample, Snapshot};
pub use stored::{AnomalyLogRow, Baseline, SamplePoint, StoredSample, Summary};
