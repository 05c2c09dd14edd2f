// Domain models: raw counter samples, derived interval series, evaluations.

mod evaluation;
mod interval;
mod sample;

pub use evaluation::{Evaluation, Histogram, Level, RateStats, ResourceStats, VmEvaluation};
pub use interval::{IntervalSample, Resource, ResourceCounts, TimeWindow};
pub use sample::{ControlPlaneMarker, CounterSample, DiskCounter, NicCounter};
