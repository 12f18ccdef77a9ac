//! Core types and configuration for demolens.
//!
//! This module provides the sample and event types produced by the decoder
//! together with the per-connection and per-team accumulators, and a small
//! serializable configuration struct.

use glam::DVec3;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::de::Error;
use serde::{Deserialize, Serialize};

use crate::series::SampleSeries;

/// Anything carrying a stream timestamp.
pub trait Timestamped {
    fn timestamp(&self) -> f64;
}

/// Engine configuration.
///
/// Designed to be easily serializable and loadable from JSON while keeping
/// complexity minimal.
///
/// # Example
///
/// ```rust
/// use demolens::Config;
///
/// // Create default config
/// let config = Config::default();
///
/// // Load from JSON
/// let json = r#"{
///     "granularity": 500.0,
///     "tick_interval": 34.0
/// }"#;
/// let config: Config = serde_json::from_str(json).unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Bucket width of the per-connection sample series, in stream time
    /// units. Bounds the scan length of a bracketing lookup.
    #[serde(default = "Config::default_granularity")]
    pub granularity: f64,

    /// Approximate server tick interval, in stream time units. Half of it
    /// is folded into the latency adjustment of observer-relative position
    /// queries. A heuristic, not a protocol-derived value.
    #[serde(default = "Config::default_tick_interval")]
    pub tick_interval: f64,

    /// Maximum nesting depth accepted when replaying history bursts.
    #[serde(default = "Config::default_max_burst_depth")]
    pub max_burst_depth: usize,
}

impl Config {
    const fn default_granularity() -> f64 {
        1000.0
    }

    const fn default_tick_interval() -> f64 {
        34.0
    }

    const fn default_max_burst_depth() -> usize {
        8
    }

    pub fn with_granularity(mut self, granularity: f64) -> Self {
        assert!(
            granularity.is_finite() && granularity > 0.0,
            "Bucket granularity must be positive"
        );
        self.granularity = granularity;
        self
    }

    pub fn with_tick_interval(mut self, tick_interval: f64) -> Self {
        assert!(
            tick_interval.is_finite() && tick_interval >= 0.0,
            "Tick interval must be non-negative"
        );
        self.tick_interval = tick_interval;
        self
    }

    pub fn with_max_burst_depth(mut self, depth: usize) -> Self {
        assert!(depth > 0, "Burst depth cap must be greater than zero");
        self.max_burst_depth = depth;
        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if !self.granularity.is_finite() || self.granularity <= 0.0 {
            return Err("Bucket granularity must be finite and positive".to_string());
        }

        if !self.tick_interval.is_finite() || self.tick_interval < 0.0 {
            return Err("Tick interval must be finite and non-negative".to_string());
        }

        if self.max_burst_depth == 0 {
            return Err("Burst depth cap must be greater than zero".to_string());
        }

        Ok(())
    }

    /// Load configuration from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let config: Config = serde_json::from_str(json)?;
        if let Err(e) = config.validate() {
            return Err(Error::custom(e));
        }
        Ok(config)
    }

    /// Save configuration as JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            granularity: Self::default_granularity(),
            tick_interval: Self::default_tick_interval(),
            max_burst_depth: Self::default_max_burst_depth(),
        }
    }
}

/// One position/orientation sample of a connection's continuous channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PosSample {
    pub timestamp: f64,
    /// Heading in degrees, [0, 360).
    pub yaw: f64,
    /// Elevation in degrees, clamped by the game to [-90, 90].
    pub pitch: f64,
    /// Lean in degrees.
    pub roll: f64,
    pub pos: DVec3,
    pub vel: DVec3,
}

impl Timestamped for PosSample {
    fn timestamp(&self) -> f64 {
        self.timestamp
    }
}

/// One latency sample of a connection's continuous channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PingSample {
    pub timestamp: f64,
    pub ping: f64,
}

impl Timestamped for PingSample {
    fn timestamp(&self) -> f64 {
        self.timestamp
    }
}

/// The protocol's fixed gun table, in wire index order.
pub const GUN_TABLE: [Gun; 7] = [
    Gun::Fist,
    Gun::Sg,
    Gun::Cg,
    Gun::Rl,
    Gun::Rifle,
    Gun::Gl,
    Gun::Pistol,
];

/// A weapon, resolved from the wire gun index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Gun {
    Fist,
    Sg,
    Cg,
    Rl,
    Rifle,
    Gl,
    Pistol,
}

impl Gun {
    /// Resolve a wire gun index against the fixed table.
    pub fn from_index(index: u32) -> Option<Self> {
        GUN_TABLE.get(index as usize).copied()
    }

    pub fn name(&self) -> &'static str {
        match self {
            Gun::Fist => "FIST",
            Gun::Sg => "SG",
            Gun::Cg => "CG",
            Gun::Rl => "RL",
            Gun::Rifle => "RIFLE",
            Gun::Gl => "GL",
            Gun::Pistol => "PISTOL",
        }
    }
}

/// A discrete gameplay event attributed to one connection.
///
/// Hit/Damage and Kill/Died are produced in pairs from one damage or death
/// message: the attacker's record receives the event tagged with the target
/// id, the target's record receives the event tagged with the attacker id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum GameplayEvent {
    Shot {
        timestamp: f64,
        gun: Gun,
        from: DVec3,
        to: DVec3,
    },
    Hit {
        timestamp: f64,
        /// Connection number of the player that was hit.
        target: u32,
        damage: i32,
    },
    Damage {
        timestamp: f64,
        /// Connection number of the player that dealt the damage.
        attacker: u32,
        damage: i32,
    },
    Kill {
        timestamp: f64,
        target: u32,
    },
    Died {
        timestamp: f64,
        attacker: u32,
    },
    Spawn {
        timestamp: f64,
    },
}

impl Timestamped for GameplayEvent {
    fn timestamp(&self) -> f64 {
        match self {
            GameplayEvent::Shot { timestamp, .. }
            | GameplayEvent::Hit { timestamp, .. }
            | GameplayEvent::Damage { timestamp, .. }
            | GameplayEvent::Kill { timestamp, .. }
            | GameplayEvent::Died { timestamp, .. }
            | GameplayEvent::Spawn { timestamp } => *timestamp,
        }
    }
}

/// Per-connection accumulator.
///
/// Mutable only while the decoder ingests the stream; after finalization it
/// is owned by the match state and exposed read-only.
#[derive(Debug, Clone)]
pub struct ConnectionRecord {
    pub(crate) pos: SampleSeries<PosSample>,
    pub(crate) ping: SampleSeries<PingSample>,
    pub(crate) events: Vec<GameplayEvent>,
    pub(crate) names: Vec<String>,
    pub(crate) teams: Vec<String>,
    pub(crate) frags: i32,
    pub(crate) score: i32,
}

impl ConnectionRecord {
    pub(crate) fn new(granularity: f64) -> Self {
        Self {
            pos: SampleSeries::with_granularity(granularity),
            ping: SampleSeries::with_granularity(granularity),
            events: Vec::new(),
            names: Vec::new(),
            teams: Vec::new(),
            frags: 0,
            score: 0,
        }
    }

    /// Position sample series, in arrival order.
    pub fn positions(&self) -> &SampleSeries<PosSample> {
        &self.pos
    }

    /// Ping sample series, in arrival order.
    pub fn pings(&self) -> &SampleSeries<PingSample> {
        &self.ping
    }

    /// Ordered discrete-event list.
    pub fn events(&self) -> &[GameplayEvent] {
        &self.events
    }

    /// Append-only name history, oldest first.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Append-only team history, oldest first.
    pub fn teams(&self) -> &[String] {
        &self.teams
    }

    pub fn frags(&self) -> i32 {
        self.frags
    }

    pub fn score(&self) -> i32 {
        self.score
    }
}

/// Per-team accumulator.
#[derive(Debug, Clone, Default)]
pub struct TeamRecord {
    pub(crate) frags: i32,
    pub(crate) score: i32,
    pub(crate) players: FxHashSet<String>,
}

impl TeamRecord {
    pub fn frags(&self) -> i32 {
        self.frags
    }

    pub fn score(&self) -> i32 {
        self.score
    }

    /// Player names that were ever on the team. Pruned at finalization to
    /// names belonging to a retained connection.
    pub fn players(&self) -> &FxHashSet<String> {
        &self.players
    }
}

/// Match-level metadata.
#[derive(Debug, Clone, Default)]
pub struct MatchMeta {
    pub(crate) map: String,
    pub(crate) mode: String,
    pub(crate) max_ts: f64,
    pub(crate) source: Option<String>,
    pub(crate) teams: FxHashMap<String, TeamRecord>,
}

impl MatchMeta {
    pub fn map(&self) -> &str {
        &self.map
    }

    pub fn mode(&self) -> &str {
        &self.mode
    }

    /// Largest timestamp observed anywhere in the stream.
    pub fn max_ts(&self) -> f64 {
        self.max_ts
    }

    /// Optional identifier of the recording this match was read from.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn team(&self, name: &str) -> Option<&TeamRecord> {
        self.teams.get(name)
    }

    pub fn teams(&self) -> impl Iterator<Item = (&str, &TeamRecord)> {
        self.teams.iter().map(|(name, team)| (name.as_str(), team))
    }
}
