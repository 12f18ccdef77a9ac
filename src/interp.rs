//! Pure interpolation primitives.
//!
//! Scalar channels interpolate linearly, cyclic channels (yaw, roll) along
//! the shortest arc in degrees, and 3-vectors componentwise. All functions
//! are stateless; coincident bracketing timestamps deterministically yield
//! the start value instead of dividing by zero.

use glam::DVec3;

use crate::types::{PingSample, PosSample};

/// Linear interpolation of `y` at `x` between `(x0, y0)` and `(x1, y1)`.
///
/// Returns `y0` when `x1 == x0`.
pub fn lerp(x: f64, x0: f64, y0: f64, x1: f64, y1: f64) -> f64 {
    if x1 == x0 {
        return y0;
    }
    (y0 * (x1 - x) + y1 * (x - x0)) / (x1 - x0)
}

/// Interpolation of a cyclic quantity in degrees, along the shortest arc.
///
/// The signed delta is reduced into (-180, 180] before scaling by the time
/// fraction, so interpolating across the 0/360 boundary takes the short way
/// around. The result is normalized into [0, 360).
pub fn circle_lerp(x: f64, x0: f64, y0: f64, x1: f64, y1: f64) -> f64 {
    let delta = ((y1 - y0).rem_euclid(360.0) + 540.0).rem_euclid(360.0) - 180.0;
    let t = if x1 == x0 { 0.0 } else { (x - x0) / (x1 - x0) };
    (y0 + delta * t).rem_euclid(360.0)
}

/// Componentwise linear interpolation of a 3-vector.
pub fn lerp_vec(x: f64, x0: f64, v0: DVec3, x1: f64, v1: DVec3) -> DVec3 {
    if x1 == x0 {
        return v0;
    }
    v0.lerp(v1, (x - x0) / (x1 - x0))
}

/// Reconstruct a position sample at `ts` from its bracketing pair.
///
/// Yaw and roll wrap and interpolate circularly; pitch is clamped by the
/// game and must keep its sign, so it interpolates linearly.
pub fn pos_between(ts: f64, start: &PosSample, end: &PosSample) -> PosSample {
    PosSample {
        timestamp: ts,
        yaw: circle_lerp(ts, start.timestamp, start.yaw, end.timestamp, end.yaw),
        pitch: lerp(ts, start.timestamp, start.pitch, end.timestamp, end.pitch),
        roll: circle_lerp(ts, start.timestamp, start.roll, end.timestamp, end.roll),
        pos: lerp_vec(ts, start.timestamp, start.pos, end.timestamp, end.pos),
        vel: lerp_vec(ts, start.timestamp, start.vel, end.timestamp, end.vel),
    }
}

/// Reconstruct a ping sample at `ts` from its bracketing pair.
pub fn ping_between(ts: f64, start: &PingSample, end: &PingSample) -> PingSample {
    PingSample {
        timestamp: ts,
        ping: lerp(ts, start.timestamp, start.ping, end.timestamp, end.ping),
    }
}

/// An interpolated query result.
///
/// Carries the reconstructed value, the timestamp adjustment that was
/// applied before the lookup (0 if none), and the exact raw bracketing
/// pair the value was derived from.
#[derive(Debug, Clone)]
pub struct Interpolated<T> {
    pub value: T,
    pub adjust: f64,
    pub bracket: (T, T),
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn pos(ts: f64, yaw: f64, pitch: f64, roll: f64) -> PosSample {
        PosSample {
            timestamp: ts,
            yaw,
            pitch,
            roll,
            pos: DVec3::new(ts, 0.0, 0.0),
            vel: DVec3::ZERO,
        }
    }

    #[test]
    fn lerp_midpoint() {
        assert!((lerp(150.0, 100.0, 0.0, 200.0, 10.0) - 5.0).abs() < EPS);
    }

    #[test]
    fn lerp_degenerate_returns_start() {
        assert_eq!(lerp(100.0, 100.0, 7.0, 100.0, 99.0), 7.0);
    }

    #[test]
    fn circle_lerp_crosses_zero_boundary() {
        // Midpoint between 350 and 10 is 0, not 180.
        assert!((circle_lerp(0.5, 0.0, 350.0, 1.0, 10.0) - 0.0).abs() < EPS);
        // And a quarter of the way is 355.
        assert!((circle_lerp(0.25, 0.0, 350.0, 1.0, 10.0) - 355.0).abs() < EPS);
    }

    #[test]
    fn circle_lerp_plain_arc() {
        assert!((circle_lerp(150.0, 100.0, 0.0, 200.0, 90.0) - 45.0).abs() < EPS);
    }

    #[test]
    fn circle_lerp_normalizes_into_turn() {
        // Negative inputs land back in [0, 360).
        let out = circle_lerp(0.0, 0.0, -10.0, 1.0, 10.0);
        assert!((out - 350.0).abs() < EPS);
        let out = circle_lerp(0.5, 0.0, -10.0, 1.0, 10.0);
        assert!((out - 0.0).abs() < EPS);
    }

    #[test]
    fn circle_lerp_degenerate_returns_start() {
        assert!((circle_lerp(5.0, 5.0, 90.0, 5.0, 270.0) - 90.0).abs() < EPS);
    }

    #[test]
    fn lerp_vec_midpoint() {
        let v = lerp_vec(
            0.5,
            0.0,
            DVec3::new(0.0, 10.0, -4.0),
            1.0,
            DVec3::new(10.0, 20.0, 4.0),
        );
        assert!((v - DVec3::new(5.0, 15.0, 0.0)).length() < EPS);
    }

    #[test]
    fn pos_between_channels() {
        let a = pos(100.0, 350.0, -10.0, 0.0);
        let b = pos(200.0, 10.0, 10.0, 0.0);
        let mid = pos_between(150.0, &a, &b);
        assert_eq!(mid.timestamp, 150.0);
        assert!((mid.yaw - 0.0).abs() < EPS, "yaw takes the short arc");
        assert!((mid.pitch - 0.0).abs() < EPS, "pitch keeps its sign range");
        assert!((mid.pos.x - 150.0).abs() < EPS);
    }

    #[test]
    fn pos_between_degenerate_timestamps() {
        let a = pos(100.0, 30.0, 5.0, 1.0);
        let b = pos(100.0, 120.0, -5.0, 2.0);
        let out = pos_between(100.0, &a, &b);
        assert!((out.yaw - 30.0).abs() < EPS);
        assert_eq!(out.pitch, 5.0);
        assert_eq!(out.pos, a.pos);
    }

    #[test]
    fn ping_between_midpoint() {
        let a = PingSample {
            timestamp: 0.0,
            ping: 40.0,
        };
        let b = PingSample {
            timestamp: 100.0,
            ping: 80.0,
        };
        assert!((ping_between(25.0, &a, &b).ping - 50.0).abs() < EPS);
    }
}
