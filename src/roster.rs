//! Roster and standings
//!
//! The Controller keeps one row per contestant, keyed by the
//! server-assigned player id. Joining again under the same id renames the
//! existing row rather than adding a second one. Totals come straight from
//! the server's `results` points; the client never scores anything itself.

use std::{cmp::Reverse, collections::HashMap};

use itertools::Itertools;

use crate::protocol::{Player, Points};

/// One row of the standings table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Standing {
    /// Zero-based rank; tied totals share a position
    pub position: usize,
    /// The contestant
    pub player: Player,
    /// Total points
    pub total: i64,
}

/// Ranks totals highest first
///
/// Ties keep their input order and share the position of the first of them.
pub fn standings<I>(totals: I) -> Vec<Standing>
where
    I: IntoIterator<Item = (Player, i64)>,
{
    let ranked = totals
        .into_iter()
        .sorted_by_key(|(_, total)| Reverse(*total))
        .collect_vec();

    let mut position = 0;
    let mut previous = None;

    ranked
        .into_iter()
        .enumerate()
        .map(|(index, (player, total))| {
            if previous != Some(total) {
                position = index;
                previous = Some(total);
            }
            Standing {
                position,
                player,
                total,
            }
        })
        .collect_vec()
}

/// Outcome of [`Roster::upsert`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// A new row was added
    Added,
    /// An existing row changed its name
    Renamed,
    /// The row already matched
    Unchanged,
}

/// Contestants in the room, in join order
#[derive(Debug, Clone, Default)]
pub struct Roster {
    players: Vec<Player>,
    positions: HashMap<String, usize>,
    totals: HashMap<String, i64>,
}

impl Roster {
    /// Adds a contestant or updates the name of an existing one
    ///
    /// # Arguments
    ///
    /// * `player` - The contestant as reported by the server
    ///
    /// # Returns
    ///
    /// What happened to the roster
    pub fn upsert(&mut self, player: Player) -> Upsert {
        if let Some(&index) = self.positions.get(&player.id) {
            let row = &mut self.players[index];
            if row.name == player.name {
                return Upsert::Unchanged;
            }
            row.name = player.name;
            return Upsert::Renamed;
        }

        self.positions.insert(player.id.clone(), self.players.len());
        self.players.push(player);
        Upsert::Added
    }

    /// Replaces every total with the server's latest figures
    ///
    /// Contestants the roster has not seen yet are added.
    pub fn apply_points(&mut self, points: &[Points]) {
        self.totals.clear();
        for Points { player, total } in points {
            self.upsert(player.clone());
            self.totals.insert(player.id.clone(), *total);
        }
    }

    /// Contestants in join order
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// Number of contestants
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// Whether nobody has joined
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Total points of one contestant, zero if none were reported
    pub fn total(&self, id: &str) -> i64 {
        self.totals.get(id).copied().unwrap_or_default()
    }

    /// Every contestant ranked by total points
    pub fn standings(&self) -> Vec<Standing> {
        standings(
            self.players
                .iter()
                .map(|player| (player.clone(), self.total(&player.id))),
        )
    }

    /// Forgets everyone
    pub fn clear(&mut self) {
        self.players.clear();
        self.positions.clear();
        self.totals.clear();
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn player(id: &str, name: &str) -> Player {
        Player {
            id: id.to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn test_upsert_adds_in_join_order() {
        let mut roster = Roster::default();

        assert_eq!(roster.upsert(player("a", "Alice")), Upsert::Added);
        assert_eq!(roster.upsert(player("b", "Bob")), Upsert::Added);

        assert_eq!(roster.len(), 2);
        assert_eq!(roster.players()[0].name, "Alice");
        assert_eq!(roster.players()[1].name, "Bob");
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let mut roster = Roster::default();

        roster.upsert(player("a", "Alice"));
        assert_eq!(roster.upsert(player("a", "Alice")), Upsert::Unchanged);

        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn test_upsert_renames_in_place() {
        let mut roster = Roster::default();
        roster.upsert(player("a", "Alice"));
        roster.upsert(player("b", "Bob"));

        assert_eq!(roster.upsert(player("a", "Alicia")), Upsert::Renamed);

        assert_eq!(roster.len(), 2);
        assert_eq!(roster.players()[0], player("a", "Alicia"));
    }

    #[test]
    fn test_standings_sorted_descending() {
        let mut roster = Roster::default();
        roster.upsert(player("a", "Alice"));
        roster.upsert(player("b", "Bob"));
        roster.upsert(player("c", "Carol"));

        roster.apply_points(&[
            Points {
                player: player("a", "Alice"),
                total: 500,
            },
            Points {
                player: player("b", "Bob"),
                total: 1500,
            },
        ]);

        let standings = roster.standings();
        assert_eq!(standings[0].player.name, "Bob");
        assert_eq!(standings[0].total, 1500);
        assert_eq!(standings[1].player.name, "Alice");
        assert_eq!(standings[2].player.name, "Carol");
        assert_eq!(standings[2].total, 0);
    }

    #[test]
    fn test_standings_ties_share_position() {
        let table = standings(vec![
            (player("a", "Alice"), 100),
            (player("b", "Bob"), 300),
            (player("c", "Carol"), 100),
        ]);

        assert_eq!(table[0].position, 0);
        assert_eq!(table[1].player.name, "Alice");
        assert_eq!(table[1].position, 1);
        assert_eq!(table[2].player.name, "Carol");
        assert_eq!(table[2].position, 1);
    }

    #[test]
    fn test_apply_points_adds_unknown_players() {
        let mut roster = Roster::default();

        roster.apply_points(&[Points {
            player: player("z", "Zed"),
            total: 42,
        }]);

        assert_eq!(roster.len(), 1);
        assert_eq!(roster.total("z"), 42);
    }

    #[test]
    fn test_clear() {
        let mut roster = Roster::default();
        roster.upsert(player("a", "Alice"));
        roster.apply_points(&[Points {
            player: player("a", "Alice"),
            total: 10,
        }]);

        roster.clear();

        assert!(roster.is_empty());
        assert_eq!(roster.total("a"), 0);
        assert_eq!(roster.upsert(player("a", "Alice")), Upsert::Added);
    }
}
