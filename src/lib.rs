//! Embedded indexing and query engine for recorded multiplayer matches.
//!
//! demolens ingests the ordered, timestamped protocol-event stream of one
//! recorded match and builds an in-memory index answering two kinds of
//! queries: interpolated reconstruction of continuous per-participant
//! quantities (position, orientation, latency) at arbitrary timestamps,
//! and interval-set algebra over discrete gameplay events (shots, damage,
//! deaths, spawns) with time-weighted folds.
//!
//! ```rust
//! use demolens::ProtocolDecoder;
//! use serde_json::json;
//!
//! let mut decoder = ProtocolDecoder::new();
//! let skipped = decoder.ingest_all(
//!     [
//!         json!({"msg": "N_MAPCHANGE", "timestamp": 0, "map": "complex", "mode": 0}),
//!         json!({"msg": "N_SPAWN", "timestamp": 100, "cn": 1}),
//!         json!({"msg": "N_POS", "timestamp": 100, "cn": 1, "yaw": 0.0, "pitch": 0.0,
//!                "roll": 0.0, "pos": [10.0, 20.0, 0.0], "vel": [0.0, 0.0, 0.0]}),
//!         json!({"msg": "N_POS", "timestamp": 200, "cn": 1, "yaw": 90.0, "pitch": 0.0,
//!                "roll": 0.0, "pos": [30.0, 20.0, 0.0], "vel": [0.0, 0.0, 0.0]}),
//!     ]
//!     .iter(),
//! );
//! assert_eq!(skipped, 0);
//!
//! let state = decoder.finalize();
//! let pos = state.get_pos(1, 150.0).expect("inside the sampled range");
//! assert!((pos.value.yaw - 45.0).abs() < 1e-9);
//! assert_eq!(state.summary().duration_seconds, 0);
//! ```
//!
//! Ingestion is strictly sequential and single-writer; queries only run
//! against the finalized, immutable [`MatchState`].

pub mod decoder;
pub mod error;
pub mod filter;
pub mod interp;
pub mod modes;
pub mod series;
pub mod state;
pub mod types;

pub use decoder::{FLAG_TEAMS, Message, ModeField, ProtocolDecoder};
pub use error::{DemolensError, Result};
pub use filter::{IntervalFilter, OffsetPolicy, Payload, Span};
pub use interp::Interpolated;
pub use series::{DEFAULT_GRANULARITY, SampleSeries};
pub use state::{MatchState, MatchSummary, ParticipantSummary, TeamSummary};
pub use types::{
    Config, ConnectionRecord, GUN_TABLE, GameplayEvent, Gun, MatchMeta, PingSample, PosSample,
    TeamRecord, Timestamped,
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {

    pub use crate::{DemolensError, ProtocolDecoder, Result};

    pub use crate::{IntervalFilter, OffsetPolicy};

    pub use crate::{Interpolated, MatchState, SampleSeries};

    pub use crate::{Config, GameplayEvent, Gun, PingSample, PosSample, Timestamped};
}
