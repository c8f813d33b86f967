//! Turn models: deadlock-avoidance disciplines expressed as forbidden turns.
//!
//! A turn is a pair of consecutive links `(into, out_of)` meeting at a router.
//! Every model forbids 180° reversals; each also forbids the turns its
//! discipline needs to break channel-dependency cycles on a mesh.

use crate::ids::LinkId;
use crate::topology::{LinkDirection, NocTopology};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use LinkDirection::{East, North, South, West};

/// A routing discipline that forbids certain consecutive link directions.
pub trait TurnModel: Send + Sync {
    /// Short name of the model, as used in configuration files.
    fn name(&self) -> &'static str;

    /// Returns `true` if a flow travelling `from` may continue travelling `to`.
    ///
    /// Reversals are rejected by [`illegal_turns`](Self::illegal_turns)
    /// independently of this method.
    fn is_turn_legal(&self, from: LinkDirection, to: LinkDirection) -> bool;

    /// Lists every forbidden `(incoming, outgoing)` link pair in `topology`.
    ///
    /// Pairs are grouped by router in index order, then by incoming and
    /// outgoing link order. Links whose direction cannot be classified only
    /// contribute reversals.
    fn illegal_turns(&self, topology: &NocTopology) -> Vec<(LinkId, LinkId)> {
        let mut turns = Vec::new();
        for router in topology.router_ids() {
            for &into in topology.incoming_links(router) {
                for &out in topology.outgoing_links(router) {
                    if topology.link(out).sink == topology.link(into).source {
                        turns.push((into, out));
                        continue;
                    }
                    let dirs = (topology.link_direction(into), topology.link_direction(out));
                    if let (Some(from), Some(to)) = dirs {
                        if !self.is_turn_legal(from, to) {
                            turns.push((into, out));
                        }
                    }
                }
            }
        }
        turns
    }
}

/// Dimension-ordered routing: all horizontal hops before any vertical hop.
#[derive(Debug, Clone, Copy, Default)]
pub struct XyRouting;

impl TurnModel for XyRouting {
    fn name(&self) -> &'static str {
        "xy"
    }

    fn is_turn_legal(&self, from: LinkDirection, to: LinkDirection) -> bool {
        from.is_horizontal() || !to.is_horizontal()
    }
}

/// West-first: westward hops must come first, so no turn leads into west.
#[derive(Debug, Clone, Copy, Default)]
pub struct WestFirst;

impl TurnModel for WestFirst {
    fn name(&self) -> &'static str {
        "west_first"
    }

    fn is_turn_legal(&self, from: LinkDirection, to: LinkDirection) -> bool {
        !(matches!(from, North | South) && to == West)
    }
}

/// North-last: once travelling north, a flow may not turn.
#[derive(Debug, Clone, Copy, Default)]
pub struct NorthLast;

impl TurnModel for NorthLast {
    fn name(&self) -> &'static str {
        "north_last"
    }

    fn is_turn_legal(&self, from: LinkDirection, to: LinkDirection) -> bool {
        !(from == North && matches!(to, East | West))
    }
}

/// Negative-first: hops in negative directions (west, south) come first.
#[derive(Debug, Clone, Copy, Default)]
pub struct NegativeFirst;

impl TurnModel for NegativeFirst {
    fn name(&self) -> &'static str {
        "negative_first"
    }

    fn is_turn_legal(&self, from: LinkDirection, to: LinkDirection) -> bool {
        !matches!((from, to), (East, South) | (North, West))
    }
}

/// Selects one of the built-in turn models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnModelKind {
    /// [`XyRouting`].
    Xy,
    /// [`WestFirst`].
    #[default]
    WestFirst,
    /// [`NorthLast`].
    NorthLast,
    /// [`NegativeFirst`].
    NegativeFirst,
}

impl TurnModelKind {
    /// All built-in models.
    pub const ALL: [TurnModelKind; 4] = [
        TurnModelKind::Xy,
        TurnModelKind::WestFirst,
        TurnModelKind::NorthLast,
        TurnModelKind::NegativeFirst,
    ];

    /// Returns the model implementation.
    pub fn model(self) -> &'static dyn TurnModel {
        match self {
            TurnModelKind::Xy => &XyRouting,
            TurnModelKind::WestFirst => &WestFirst,
            TurnModelKind::NorthLast => &NorthLast,
            TurnModelKind::NegativeFirst => &NegativeFirst,
        }
    }
}

impl fmt::Display for TurnModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.model().name())
    }
}

impl FromStr for TurnModelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.model().name() == s)
            .ok_or_else(|| {
                format!("unknown turn model '{s}' (expected xy, west_first, north_last or negative_first)")
            })
    }
}
