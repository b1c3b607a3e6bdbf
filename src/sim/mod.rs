//! Per-node simulation: node state, the in-progress `Step` that applies
//! actions and advances time, and the read-only `Timeline` view.
//!
//! ## Time model
//!
//! Time is measured in simulated seconds. Periodic effects and the ambient
//! auto tick fire on a fixed grid of [`TICK_INTERVAL`] seconds anchored at
//! time zero, independent of when an effect was applied.

pub mod node;
pub mod step;
pub mod timeline;

pub use node::{Children, NodeId, NodeLogs, SimNode};
pub use step::Step;
pub use timeline::Timeline;

/// Length of one periodic damage tick.
pub const TICK_INTERVAL: f64 = 3.0;
