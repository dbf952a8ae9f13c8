//! Source aggregation.
//!
//! This module provides the transport seam, the settle-all join and the
//! aggregator that ties them to the view model.

pub mod aggregator;
pub mod settle;
pub mod transport;

pub use aggregator::{Aggregator, AggregatorConfig, PublishPolicy};
pub use transport::{HttpTransport, Transport};
