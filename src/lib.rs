//! fdm-pipe-backend - A PowerDNS pipe backend that routes names by partition key.
//!
//! PowerDNS spawns the backend as a subprocess and talks to it over stdin/stdout
//! with a tab-separated line protocol. Each query name is reduced to a single
//! partition key, the key is looked up in a static partition table, and the
//! backend answers with an `A` or `CNAME` record pointing at the selected target.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  HELO / Q lines   ┌─────────────────────────────────────┐
//! │              │──────────────────▶│ PipeServer                          │
//! │   PowerDNS   │                   │   Query::parse                      │
//! │              │◀──────────────────│   Router ── key ── PartitionTable   │
//! └──────────────┘ DATA/NXDOMAIN/LOG │                                     │
//!                  END lines         └─────────────────────────────────────┘
//! ```
//!
//! ## Routing
//!
//! ```text
//! apple.example.com
//!   → first label "apple"
//!   → key 'a' (first letter) or '3' (first hex digit of sha256("apple"))
//!   → table['a'] = ["1.1.1.1"]
//!   → DATA apple.example.com IN A 3600 <id> 1.1.1.1
//! ```
//!
//! SOA queries are always answered with a synthetic record; everything else is
//! routed. A name whose key is not in the table is answered with `NXDOMAIN`.
//!
//! ## Example Usage
//!
//! ```rust
//! use fdm_pipe_backend::{BackendConfig, PipeServer};
//!
//! let input = "HELO\t1\nQ\tapple.example.com\tIN\tA\t1\t192.0.2.1\n";
//! let mut output = Vec::new();
//!
//! let server = PipeServer::from_config(&BackendConfig::default(), input.as_bytes(), &mut output)?;
//! server.run()?;
//!
//! assert!(String::from_utf8(output).unwrap().contains("\tA\t3600\t1\t1.1.1.1\n"));
//! # Ok::<(), fdm_pipe_backend::BackendError>(())
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod key;
pub mod metrics;
pub mod partition;
pub mod protocol;
pub mod router;
pub mod server;
pub mod telemetry;

// Re-export main types
pub use crate::config::{
    BackendConfig, Config, MalformedPolicy, ProfileConfig, RecordKind, SoaConfig, TelemetryConfig,
};
pub use error::BackendError;
pub use key::KeyFunction;
pub use partition::{PartitionRule, PartitionTable, TargetSelection};
pub use protocol::{Answer, Query};
pub use router::{Router, RoutingConfig};
pub use server::{PipeServer, SessionStats};
