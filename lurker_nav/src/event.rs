// Notifications the navigator emits to its collaborators.
//
// The navigator never calls out to audio, UI, or game-over handling. Instead
// each notable transition is pushed onto an outbox as a `NavEvent`, and
// `Navigator::tick` hands the accumulated events back in its `StepResult`.
// Events raised between ticks (a beacon dropped, a sound that flips the
// vocalization) wait in the outbox and ride along with the next tick's
// result. Every event fires once per occurrence.
//
// See also: `navigator.rs` for where each kind is raised, `agent.rs` for the
// `Vocalization` and `Quarry` payloads.

use crate::agent::{Quarry, Vocalization};
use crate::types::{NodeId, Vec3};
use serde::{Deserialize, Serialize};

/// A notification stamped with the simulation time it was raised at.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NavEvent {
    pub time: f32,
    pub kind: NavEventKind,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum NavEventKind {
    /// The creature reached the player. The navigator halts afterwards.
    AttackedPlayer { position: Vec3 },
    /// The creature destroyed the active beacon and is locked in its attack.
    BeaconAttacked { node: NodeId, position: Vec3 },
    /// The creature reached the node nearest its quarry and left the graph
    /// to close in directly.
    LeftGraph { node: NodeId, quarry: Quarry },
    /// The creature made it back onto its node after an off-graph chase.
    ReturnedToGraph { node: NodeId },
    /// The creature switched between ambient growling and hunting roars.
    VocalizationChanged { vocalization: Vocalization },
}

/// Everything one `Navigator::tick` produced.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub events: Vec<NavEvent>,
}

impl StepResult {
    /// Whether any event of the given shape fired.
    pub fn contains(&self, pred: impl Fn(&NavEventKind) -> bool) -> bool {
        self.events.iter().any(|e| pred(&e.kind))
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
