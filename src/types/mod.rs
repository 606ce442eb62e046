//! Core types for the journey graph engine.

pub mod edge;
pub mod node;
pub mod query;
pub mod session;
pub mod signal;

pub use edge::{EdgeKey, EdgeStats};
pub use node::{NodeId, NodeKind};
pub use query::{AnalyticsQuery, QueryReport};
pub use session::{Session, SessionState};
pub use signal::Signal;
