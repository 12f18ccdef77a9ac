//! Stateful protocol decoding.
//!
//! The decoder consumes the ordered message stream of one recorded match,
//! maintaining per-connection and per-team accumulators, and feeds samples
//! and discrete events into the index structures. A single logical writer
//! drives it; once the stream ends, [`ProtocolDecoder::finalize`] freezes
//! everything into a read-only [`MatchState`].

use glam::DVec3;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{DemolensError, Result};
use crate::modes;
use crate::state::MatchState;
use crate::types::{Config, ConnectionRecord, GameplayEvent, Gun, MatchMeta, PingSample, PosSample};

/// Team names of the two flag-mode teams, in wire index order (1-based).
pub const FLAG_TEAMS: [&str; 2] = ["good", "evil"];

/// A decoded wire message, discriminated by the `msg` field.
///
/// Each wire record also carries a numeric `timestamp`, which the decoder
/// extracts before dispatching, so it is not repeated per variant here.
/// Unrecognized discriminators decode to [`Message::Unknown`].
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "msg")]
pub enum Message {
    #[serde(rename = "N_PAUSEGAME")]
    Pause {
        #[serde(rename = "isPause")]
        is_pause: bool,
    },
    /// History burst: embedded list of prior messages to replay.
    #[serde(rename = "N_WELCOME")]
    Welcome { data: Vec<Value> },
    #[serde(rename = "N_MAPCHANGE")]
    MapChange { map: String, mode: ModeField },
    #[serde(rename = "N_INITCLIENT")]
    InitClient { cn: u32, name: String, team: String },
    #[serde(rename = "N_SWITCHNAME")]
    Rename { cn: u32, name: String },
    #[serde(rename = "N_SETTEAM")]
    SetTeam { cn: u32, team: String },
    #[serde(rename = "N_SCOREFLAG")]
    ScoreFlag {
        cn: u32,
        team: u8,
        score: i32,
        flags: i32,
    },
    #[serde(rename = "N_POS")]
    Pos {
        cn: u32,
        yaw: f64,
        pitch: f64,
        roll: f64,
        pos: [f64; 3],
        vel: [f64; 3],
    },
    #[serde(rename = "N_PING")]
    Ping { cn: u32, ping: f64 },
    #[serde(rename = "N_SHOTFX")]
    Shot {
        cn: u32,
        gun: u32,
        from: [f64; 3],
        to: [f64; 3],
    },
    #[serde(rename = "N_DAMAGE")]
    Damage { tcn: u32, acn: u32, damage: i32 },
    #[serde(rename = "N_DIED")]
    Died {
        tcn: u32,
        acn: u32,
        frags: i32,
        #[serde(rename = "teamfrags")]
        team_frags: i32,
    },
    #[serde(rename = "N_SPAWN")]
    Spawn { cn: u32 },
    #[serde(other)]
    Unknown,
}

/// A map-change mode field: an integer in either protocol generation, or a
/// resolved mode name.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ModeField {
    Id(i64),
    Name(String),
}

/// Consumes the ordered message stream of one match.
#[derive(Debug)]
pub struct ProtocolDecoder {
    config: Config,
    records: FxHashMap<u32, ConnectionRecord>,
    spawned: FxHashSet<u32>,
    meta: MatchMeta,
    paused: bool,
}

impl ProtocolDecoder {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            records: FxHashMap::default(),
            spawned: FxHashSet::default(),
            meta: MatchMeta::default(),
            paused: false,
        }
    }

    /// Attach an identifier for the recording being ingested.
    pub fn set_source(&mut self, source: impl Into<String>) {
        self.meta.source = Some(source.into());
    }

    /// Ingest one wire record.
    ///
    /// A malformed record (missing `timestamp`, missing required fields,
    /// out-of-table gun or team index, over-deep burst) returns an error
    /// and leaves all decoder state untouched; ingestion of subsequent
    /// records can continue. Unrecognized discriminators are ignored.
    pub fn ingest_value(&mut self, value: &Value) -> Result<()> {
        self.ingest_nested(value, 0)
    }

    /// Ingest an already-decoded message stamped at `ts`.
    pub fn ingest_message(&mut self, ts: f64, message: Message) -> Result<()> {
        if ts > self.meta.max_ts {
            self.meta.max_ts = ts;
        }
        self.apply(ts, message, 0)
    }

    /// Ingest a whole stream, skipping malformed records with a warning.
    /// Returns the number of records skipped.
    pub fn ingest_all<'a, I>(&mut self, values: I) -> usize
    where
        I: IntoIterator<Item = &'a Value>,
    {
        let mut skipped = 0;
        for value in values {
            if let Err(err) = self.ingest_value(value) {
                skipped += 1;
                log::warn!("skipping malformed message: {err}");
            }
        }
        skipped
    }

    /// Freeze the decoder into a queryable match state.
    ///
    /// Connections that never produced a spawn are dropped, and every team
    /// roster is pruned to names belonging to a retained connection.
    pub fn finalize(mut self) -> MatchState {
        let mut records: FxHashMap<u32, ConnectionRecord> = FxHashMap::default();
        for cn in &self.spawned {
            if let Some(record) = self.records.remove(cn) {
                records.insert(*cn, record);
            }
        }

        let retained: FxHashSet<&str> = records
            .values()
            .flat_map(|record| record.names.iter().map(String::as_str))
            .collect();
        for team in self.meta.teams.values_mut() {
            team.players.retain(|name| retained.contains(name.as_str()));
        }

        MatchState::new(records, self.meta, self.config)
    }

    fn ingest_nested(&mut self, value: &Value, depth: usize) -> Result<()> {
        if depth > self.config.max_burst_depth {
            return Err(DemolensError::BurstTooDeep(depth));
        }

        let ts = value
            .get("timestamp")
            .and_then(Value::as_f64)
            .ok_or(DemolensError::MissingField("timestamp"))?;
        let message: Message = serde_json::from_value(value.clone())
            .map_err(|err| DemolensError::MalformedMessage(err.to_string()))?;

        if ts > self.meta.max_ts {
            self.meta.max_ts = ts;
        }
        self.apply(ts, message, depth)
    }

    fn apply(&mut self, ts: f64, message: Message, depth: usize) -> Result<()> {
        match message {
            Message::Pause { is_pause } => {
                self.paused = is_pause;
            }
            Message::Welcome { data } => {
                // Replay embedded history; each bad message skips alone.
                for nested in &data {
                    if let Err(err) = self.ingest_nested(nested, depth + 1) {
                        log::warn!("skipping message in history burst: {err}");
                    }
                }
            }
            Message::MapChange { map, mode } => {
                self.meta.map = map;
                self.meta.mode = match mode {
                    ModeField::Name(name) => name,
                    ModeField::Id(id) => modes::mode_name(id)
                        .map(str::to_owned)
                        .unwrap_or_else(|| id.to_string()),
                };
            }
            Message::InitClient { cn, name, team } => {
                self.record(cn).names.push(name);
                if !team.is_empty() {
                    self.join_team(cn, team);
                }
            }
            Message::Rename { cn, name } => {
                let team = {
                    let record = self.record(cn);
                    record.names.push(name.clone());
                    record.teams.last().cloned()
                };
                // The roster tracks names, so a rename joins the current
                // team's roster under the new name.
                if let Some(team) = team {
                    self.meta.teams.entry(team).or_default().players.insert(name);
                }
            }
            Message::SetTeam { cn, team } => {
                if !team.is_empty() {
                    self.join_team(cn, team);
                }
            }
            Message::ScoreFlag {
                cn,
                team,
                score,
                flags,
            } => {
                let team_name = usize::from(team)
                    .checked_sub(1)
                    .and_then(|idx| FLAG_TEAMS.get(idx))
                    .ok_or(DemolensError::InvalidTeam(team))?;
                self.meta
                    .teams
                    .entry((*team_name).to_owned())
                    .or_default()
                    .score = score;
                self.record(cn).score = flags;
            }
            Message::Pos {
                cn,
                yaw,
                pitch,
                roll,
                pos,
                vel,
            } => {
                if !self.paused {
                    self.record(cn).pos.push(PosSample {
                        timestamp: ts,
                        yaw,
                        pitch,
                        roll,
                        pos: DVec3::from_array(pos),
                        vel: DVec3::from_array(vel),
                    });
                }
            }
            Message::Ping { cn, ping } => {
                if !self.paused {
                    self.record(cn).ping.push(PingSample { timestamp: ts, ping });
                }
            }
            Message::Shot { cn, gun, from, to } => {
                let gun = Gun::from_index(gun).ok_or(DemolensError::InvalidGun(gun))?;
                self.record(cn).events.push(GameplayEvent::Shot {
                    timestamp: ts,
                    gun,
                    from: DVec3::from_array(from),
                    to: DVec3::from_array(to),
                });
            }
            Message::Damage { tcn, acn, damage } => {
                // The attacker's record gets the Hit tagged with the target,
                // the target's record the Damage tagged with the attacker.
                self.record(acn).events.push(GameplayEvent::Hit {
                    timestamp: ts,
                    target: tcn,
                    damage,
                });
                self.record(tcn).events.push(GameplayEvent::Damage {
                    timestamp: ts,
                    attacker: acn,
                    damage,
                });
            }
            Message::Died {
                tcn,
                acn,
                frags,
                team_frags,
            } => {
                let team = {
                    let attacker = self.record(acn);
                    attacker.events.push(GameplayEvent::Kill {
                        timestamp: ts,
                        target: tcn,
                    });
                    attacker.frags = frags;
                    attacker.teams.last().cloned()
                };
                if let Some(team) = team {
                    self.meta.teams.entry(team).or_default().frags = team_frags;
                }
                self.record(tcn).events.push(GameplayEvent::Died {
                    timestamp: ts,
                    attacker: acn,
                });
            }
            Message::Spawn { cn } => {
                self.spawned.insert(cn);
                self.record(cn)
                    .events
                    .push(GameplayEvent::Spawn { timestamp: ts });
            }
            Message::Unknown => {}
        }
        Ok(())
    }

    fn record(&mut self, cn: u32) -> &mut ConnectionRecord {
        let granularity = self.config.granularity;
        self.records
            .entry(cn)
            .or_insert_with(|| ConnectionRecord::new(granularity))
    }

    fn join_team(&mut self, cn: u32, team: String) {
        let name = {
            let record = self.record(cn);
            record.teams.push(team.clone());
            record.names.last().cloned()
        };
        let roster = self.meta.teams.entry(team).or_default();
        if let Some(name) = name {
            roster.players.insert(name);
        }
    }
}

impl Default for ProtocolDecoder {
    fn default() -> Self {
        Self::new()
    }
}
