//! Two-phase call protocol
//!
//! The host serves plain queries without ordering or durability and needs a
//! separate, committed call path for anything that mutates. Every inbound
//! call therefore lands on the query channel first:
//!
//! - GET is routed and answered there
//! - POST/DELETE get an empty 200 with `upgrade = Some(true)`, telling the
//!   proxy to resubmit the same request on the update channel
//! - anything else is rejected with 400
//!
//! The update channel accepts only POST/DELETE, routes them through a
//! disjoint table and runs the mutation.

mod gateway;
mod phase;

pub use gateway::Gateway;
pub use phase::{Call, CallPhase};
