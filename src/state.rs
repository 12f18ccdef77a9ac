//! Read-only query facade over a finalized match.
//!
//! `MatchState` owns every record the decoder retained. Nothing mutates
//! after finalization, so shared references to it can be handed to any
//! number of concurrent readers without synchronization.

use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::filter::{IntervalFilter, OffsetPolicy};
use crate::interp::{self, Interpolated};
use crate::types::{Config, ConnectionRecord, GameplayEvent, MatchMeta, PingSample, PosSample};

/// Finalized, immutable view of one recorded match.
pub struct MatchState {
    records: FxHashMap<u32, ConnectionRecord>,
    meta: MatchMeta,
    config: Config,
}

impl MatchState {
    pub(crate) fn new(
        records: FxHashMap<u32, ConnectionRecord>,
        meta: MatchMeta,
        config: Config,
    ) -> Self {
        Self {
            records,
            meta,
            config,
        }
    }

    pub fn meta(&self) -> &MatchMeta {
        &self.meta
    }

    pub fn connection(&self, cn: u32) -> Option<&ConnectionRecord> {
        self.records.get(&cn)
    }

    pub fn connections(&self) -> impl Iterator<Item = (u32, &ConnectionRecord)> {
        self.records.iter().map(|(cn, record)| (*cn, record))
    }

    /// Ordered discrete-event list of one connection.
    pub fn events(&self, cn: u32) -> Option<&[GameplayEvent]> {
        self.records.get(&cn).map(|record| record.events())
    }

    /// Interpolated ping of `cn` at `ts`.
    ///
    /// Absent for a connection that was never retained or a timestamp
    /// outside the sampled range.
    pub fn get_ping(&self, cn: u32, ts: f64) -> Option<Interpolated<PingSample>> {
        let record = self.records.get(&cn)?;
        let (start, end) = record.pings().bracket(ts)?;
        Some(Interpolated {
            value: interp::ping_between(ts, start, end),
            adjust: 0.0,
            bracket: (*start, *end),
        })
    }

    /// Interpolated position of `cn` at `ts`.
    pub fn get_pos(&self, cn: u32, ts: f64) -> Option<Interpolated<PosSample>> {
        self.pos_query(cn, ts, 0.0)
    }

    /// Interpolated position of `cn` at `ts` as perceived by `observer`.
    ///
    /// The lookup timestamp is shifted back by half of each side's
    /// interpolated ping plus half a server tick, approximating the remote
    /// observer's view of `cn` at that moment. The shift actually applied
    /// is reported in the result's `adjust`.
    pub fn get_pos_relative_to(
        &self,
        cn: u32,
        ts: f64,
        observer: u32,
    ) -> Option<Interpolated<PosSample>> {
        let adjust = self.latency_adjust(cn, observer, ts);
        self.pos_query(cn, ts, adjust)
    }

    /// Build an interval filter over one connection's event list.
    ///
    /// Absent for a connection that was never retained.
    pub fn build_filter<P, F>(
        &self,
        cn: u32,
        policy: OffsetPolicy,
        predicate: F,
    ) -> Option<IntervalFilter<P>>
    where
        F: FnMut(&GameplayEvent) -> Option<P>,
    {
        let record = self.records.get(&cn)?;
        Some(IntervalFilter::build(record.events(), policy, predicate))
    }

    /// Summarize the finalized match.
    pub fn summary(&self) -> MatchSummary {
        let mut participants: Vec<ParticipantSummary> = self
            .records
            .iter()
            .map(|(cn, record)| ParticipantSummary {
                id: *cn,
                names: record.names().to_vec(),
                frags: record.frags(),
                score: record.score(),
            })
            .collect();
        participants.sort_by_key(|participant| participant.id);

        let mut teams: Vec<TeamSummary> = self
            .meta
            .teams()
            .filter(|(_, team)| !team.players().is_empty())
            .map(|(name, team)| {
                let mut members: Vec<String> = team.players().iter().cloned().collect();
                members.sort();
                TeamSummary {
                    name: name.to_owned(),
                    members,
                    frags: team.frags(),
                    score: team.score(),
                }
            })
            .collect();
        teams.sort_by(|a, b| a.name.cmp(&b.name));

        MatchSummary {
            participants,
            map: self.meta.map().to_owned(),
            mode: self.meta.mode().to_owned(),
            duration_seconds: (self.meta.max_ts() / 1000.0).floor() as u64,
            teams: (teams.len() > 1).then_some(teams),
            source: self.meta.source().map(str::to_owned),
        }
    }

    fn pos_query(&self, cn: u32, ts: f64, adjust: f64) -> Option<Interpolated<PosSample>> {
        let record = self.records.get(&cn)?;
        let target = ts + adjust;
        let (start, end) = record.positions().bracket(target)?;
        Some(Interpolated {
            value: interp::pos_between(target, start, end),
            adjust,
            bracket: (start.clone(), end.clone()),
        })
    }

    fn latency_adjust(&self, cn: u32, observer: u32, ts: f64) -> f64 {
        if cn == observer {
            return 0.0;
        }
        let mut adjust = 0.0;
        if let Some(ping) = self.get_ping(cn, ts) {
            adjust -= ping.value.ping / 2.0;
        }
        if let Some(ping) = self.get_ping(observer, ts) {
            adjust -= ping.value.ping / 2.0;
        }
        adjust - self.config.tick_interval / 2.0
    }
}

/// One participant of the match summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParticipantSummary {
    pub id: u32,
    pub names: Vec<String>,
    pub frags: i32,
    pub score: i32,
}

/// One team of the match summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamSummary {
    pub name: String,
    pub members: Vec<String>,
    pub frags: i32,
    pub score: i32,
}

/// The match summary record.
///
/// `teams` is present only when more than one team has members; `source`
/// only when the decoder was told where the recording came from. Both are
/// omitted from the serialized form when absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchSummary {
    pub participants: Vec<ParticipantSummary>,
    pub map: String,
    pub mode: String,
    pub duration_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teams: Option<Vec<TeamSummary>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::ProtocolDecoder;
    use serde_json::json;

    fn pos_msg(cn: u32, ts: f64, yaw: f64) -> serde_json::Value {
        json!({"msg": "N_POS", "timestamp": ts, "cn": cn, "yaw": yaw, "pitch": 0.0,
               "roll": 0.0, "pos": [yaw, 0.0, 0.0], "vel": [0.0, 0.0, 0.0]})
    }

    fn ping_msg(cn: u32, ts: f64, ping: f64) -> serde_json::Value {
        json!({"msg": "N_PING", "timestamp": ts, "cn": cn, "ping": ping})
    }

    fn spawn_msg(cn: u32, ts: f64) -> serde_json::Value {
        json!({"msg": "N_SPAWN", "timestamp": ts, "cn": cn})
    }

    #[test]
    fn ping_queries_interpolate() {
        let mut decoder = ProtocolDecoder::new();
        decoder.ingest_all(
            [
                spawn_msg(1, 0.0),
                ping_msg(1, 100.0, 40.0),
                ping_msg(1, 200.0, 80.0),
            ]
            .iter(),
        );
        let state = decoder.finalize();

        let ping = state.get_ping(1, 150.0).expect("bracketed ping");
        assert!((ping.value.ping - 60.0).abs() < 1e-9);
        assert_eq!(ping.adjust, 0.0);
        assert_eq!(ping.bracket.0.ping, 40.0);
        assert_eq!(ping.bracket.1.ping, 80.0);

        assert!(state.get_ping(1, 250.0).is_none());
        assert!(state.get_ping(9, 150.0).is_none(), "unknown connection");
    }

    #[test]
    fn relative_position_shifts_lookup() {
        let mut decoder = ProtocolDecoder::new();
        decoder.ingest_all(
            [
                spawn_msg(1, 0.0),
                spawn_msg(2, 0.0),
                ping_msg(1, 0.0, 100.0),
                ping_msg(1, 1000.0, 100.0),
                ping_msg(2, 0.0, 100.0),
                ping_msg(2, 1000.0, 100.0),
                pos_msg(1, 0.0, 0.0),
                pos_msg(1, 500.0, 50.0),
            ]
            .iter(),
        );
        let state = decoder.finalize();

        // Both pings interpolate to 100, so the shift is 50 + 50 + 17.
        let seen = state.get_pos_relative_to(1, 300.0, 2).expect("in range");
        assert_eq!(seen.adjust, -117.0);
        assert!((seen.value.timestamp - 183.0).abs() < 1e-9);
        assert!((seen.value.yaw - 18.3).abs() < 1e-9);

        // Observing yourself applies no shift.
        let own = state.get_pos_relative_to(1, 300.0, 1).expect("in range");
        assert_eq!(own.adjust, 0.0);
        assert!((own.value.yaw - 30.0).abs() < 1e-9);
    }

    #[test]
    fn relative_position_with_missing_pings() {
        let mut decoder = ProtocolDecoder::new();
        decoder.ingest_all(
            [
                spawn_msg(1, 0.0),
                spawn_msg(2, 0.0),
                pos_msg(1, 0.0, 0.0),
                pos_msg(1, 500.0, 50.0),
            ]
            .iter(),
        );
        let state = decoder.finalize();

        // No ping data on either side: only the half-tick shift applies.
        let seen = state.get_pos_relative_to(1, 300.0, 2).expect("in range");
        assert_eq!(seen.adjust, -17.0);
        assert!((seen.value.timestamp - 283.0).abs() < 1e-9);
    }

    #[test]
    fn summary_includes_teams_only_when_contested() {
        let mut decoder = ProtocolDecoder::new();
        decoder.ingest_all(
            [
                json!({"msg": "N_MAPCHANGE", "timestamp": 0, "map": "forge", "mode": 11}),
                json!({"msg": "N_INITCLIENT", "timestamp": 0, "cn": 1, "name": "alpha", "team": "good"}),
                json!({"msg": "N_INITCLIENT", "timestamp": 0, "cn": 2, "name": "beta", "team": "evil"}),
                spawn_msg(1, 10.0),
                spawn_msg(2, 10.0),
                json!({"msg": "N_DIED", "timestamp": 60000, "tcn": 2, "acn": 1,
                       "frags": 1, "teamfrags": 1}),
            ]
            .iter(),
        );
        decoder.set_source("match.dmo");
        let state = decoder.finalize();
        let summary = state.summary();

        assert_eq!(summary.map, "forge");
        assert_eq!(summary.mode, "ctf");
        assert_eq!(summary.duration_seconds, 60);
        assert_eq!(summary.source.as_deref(), Some("match.dmo"));
        assert_eq!(summary.participants.len(), 2);
        assert_eq!(summary.participants[0].id, 1);
        assert_eq!(summary.participants[0].frags, 1);

        let teams = summary.teams.expect("two teams have members");
        assert_eq!(teams.len(), 2);
        assert_eq!(teams[0].name, "evil");
        assert_eq!(teams[1].name, "good");
        assert_eq!(teams[1].members, ["alpha"]);
        assert_eq!(teams[1].frags, 1);
    }

    #[test]
    fn summary_omits_absent_fields_in_json() {
        let mut decoder = ProtocolDecoder::new();
        decoder.ingest_all([spawn_msg(3, 100.0)].iter());
        let state = decoder.finalize();

        let value = serde_json::to_value(state.summary()).expect("serializable");
        assert!(value.get("teams").is_none());
        assert!(value.get("source").is_none());
        assert_eq!(value["participants"][0]["id"], 3);
        assert_eq!(value["duration_seconds"], 0);
    }

    #[test]
    fn filters_are_per_connection() {
        let mut decoder = ProtocolDecoder::new();
        decoder.ingest_all(
            [
                spawn_msg(1, 0.0),
                json!({"msg": "N_SHOTFX", "timestamp": 100, "cn": 1, "gun": 3,
                       "from": [0.0, 0.0, 0.0], "to": [1.0, 0.0, 0.0]}),
            ]
            .iter(),
        );
        let state = decoder.finalize();

        let shots = state
            .build_filter(1, OffsetPolicy::default(), |ev| match ev {
                GameplayEvent::Shot { gun, .. } => Some(*gun),
                _ => None,
            })
            .expect("known connection");
        assert_eq!(shots.len(), 1);
        assert!(
            state
                .build_filter::<(), _>(8, OffsetPolicy::default(), |_| None)
                .is_none()
        );
    }
}
