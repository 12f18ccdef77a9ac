//! Game-mode name resolution.
//!
//! Two protocol generations exist: one sends the mode as an ordinal into a
//! fixed mode list, the other as a packed bitmask of mode flags. Both are
//! supported; ordinals are tried first, then known flag combinations.

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;

const M_TEAM: u32 = 1 << 0;
const M_NOITEMS: u32 = 1 << 1;
const M_NOAMMO: u32 = 1 << 2;
const M_INSTA: u32 = 1 << 3;
const M_EFFICIENCY: u32 = 1 << 4;
const M_TACTICS: u32 = 1 << 5;
const M_CAPTURE: u32 = 1 << 6;
const M_REGEN: u32 = 1 << 7;
const M_CTF: u32 = 1 << 8;
const M_PROTECT: u32 = 1 << 9;
const M_HOLD: u32 = 1 << 10;
const M_EDIT: u32 = 1 << 12;
const M_DEMO: u32 = 1 << 13;
const M_LOCAL: u32 = 1 << 14;
const M_LOBBY: u32 = 1 << 15;
const M_DMSP: u32 = 1 << 16;
const M_CLASSICSP: u32 = 1 << 17;
const M_COLLECT: u32 = 1 << 19;

/// Mode names in wire ordinal order.
pub const ORDINAL_MODES: [&str; 23] = [
    "ffa",
    "coop edit",
    "teamplay",
    "instagib",
    "insta team",
    "efficiency",
    "effic team",
    "tactics",
    "tac team",
    "capture",
    "regen capture",
    "ctf",
    "insta ctf",
    "protect",
    "insta protect",
    "hold",
    "insta hold",
    "effic ctf",
    "effic protect",
    "effic hold",
    "collect",
    "insta collect",
    "effic collect",
];

/// Known mode-flag combinations for the bitmask protocol generation.
static MASK_MODES: Lazy<FxHashMap<u32, &'static str>> = Lazy::new(|| {
    let mut table = FxHashMap::default();
    table.insert(M_LOCAL | M_CLASSICSP, "SP");
    table.insert(M_LOCAL | M_DMSP, "DMSP");
    table.insert(M_DEMO | M_LOCAL, "demo");
    table.insert(M_LOBBY, "ffa");
    table.insert(M_EDIT, "coop edit");
    table.insert(M_TEAM, "teamplay");
    table.insert(M_NOITEMS | M_INSTA, "instagib");
    table.insert(M_NOITEMS | M_INSTA | M_TEAM, "insta team");
    table.insert(M_NOITEMS | M_EFFICIENCY, "efficiency");
    table.insert(M_NOITEMS | M_EFFICIENCY | M_TEAM, "effic team");
    table.insert(M_NOITEMS | M_TACTICS, "tactics");
    table.insert(M_NOITEMS | M_TACTICS | M_TEAM, "tac team");
    table.insert(M_NOAMMO | M_TACTICS | M_CAPTURE | M_TEAM, "capture");
    table.insert(M_NOITEMS | M_CAPTURE | M_REGEN | M_TEAM, "regen capture");
    table.insert(M_CTF | M_TEAM, "ctf");
    table.insert(M_NOITEMS | M_INSTA | M_CTF | M_TEAM, "insta ctf");
    table.insert(M_CTF | M_PROTECT | M_TEAM, "protect");
    table.insert(M_NOITEMS | M_INSTA | M_CTF | M_PROTECT | M_TEAM, "insta protect");
    table.insert(M_CTF | M_HOLD | M_TEAM, "hold");
    table.insert(M_NOITEMS | M_INSTA | M_CTF | M_HOLD | M_TEAM, "insta hold");
    table.insert(M_NOITEMS | M_EFFICIENCY | M_CTF | M_TEAM, "effic ctf");
    table.insert(
        M_NOITEMS | M_EFFICIENCY | M_CTF | M_PROTECT | M_TEAM,
        "effic protect",
    );
    table.insert(
        M_NOITEMS | M_EFFICIENCY | M_CTF | M_HOLD | M_TEAM,
        "effic hold",
    );
    table.insert(M_COLLECT | M_TEAM, "collect");
    table.insert(M_NOITEMS | M_INSTA | M_COLLECT | M_TEAM, "insta collect");
    table.insert(M_NOITEMS | M_EFFICIENCY | M_COLLECT | M_TEAM, "effic collect");
    table
});

/// Resolve an integer mode against the ordinal table, then against the
/// known flag combinations.
pub fn mode_name(mode: i64) -> Option<&'static str> {
    if (0..ORDINAL_MODES.len() as i64).contains(&mode) {
        return Some(ORDINAL_MODES[mode as usize]);
    }
    u32::try_from(mode).ok().and_then(|bits| MASK_MODES.get(&bits).copied())
}
