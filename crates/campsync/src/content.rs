//! Location-gated festival content.
//!
//! Art installations and theme camps can be marked hidden. A hidden entry is
//! only listed for a viewer standing within the entry's own gate radius, or once
//! the entry's reveal time has passed. Without a viewer position no hidden entry
//! is ever listed.

use serde::{Deserialize, Serialize};

use crate::geo::Coordinate;
use crate::EpochMs;

/// Default gate radius for art installations (50 m)
pub const ART_UNLOCK_RADIUS_KM: f64 = 0.05;

/// Default gate radius for theme camps
pub const CAMP_UNLOCK_RADIUS_KM: f64 = 5.0;

/// Proximity/time rule guarding a hidden entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContentGate {
    /// Radius around the entry within which it is revealed
    pub radius_km: f64,
    /// Instant after which the entry is revealed to anyone with a position
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reveal_at_ms: Option<EpochMs>,
}

impl ContentGate {
    /// Gate opening within `radius_km`
    #[must_use]
    pub const fn within(radius_km: f64) -> Self {
        Self {
            radius_km,
            reveal_at_ms: None,
        }
    }

    /// Also open the gate from `reveal_at_ms` onwards
    #[must_use]
    pub const fn revealed_at(mut self, reveal_at_ms: EpochMs) -> Self {
        self.reveal_at_ms = Some(reveal_at_ms);
        self
    }

    /// Whether a viewer at `viewer` may see an entry located at `location`
    #[must_use]
    pub fn is_open(&self, location: &Coordinate, viewer: &Coordinate, now_ms: EpochMs) -> bool {
        if self.reveal_at_ms.is_some_and(|at| now_ms >= at) {
            return true;
        }
        location.distance_km_to(viewer) <= self.radius_km
    }
}

/// Content that may be hidden behind a [`ContentGate`].
pub trait Gated {
    /// Where the entry is
    fn location(&self) -> Coordinate;
    /// Whether the entry is hidden by default
    fn is_hidden(&self) -> bool;
    /// The rule that reveals it
    fn gate(&self) -> ContentGate;

    /// Whether the entry should be listed for a viewer
    fn is_visible_to(&self, viewer: Option<&Coordinate>, now_ms: EpochMs) -> bool {
        if !self.is_hidden() {
            return true;
        }
        viewer.is_some_and(|viewer| self.gate().is_open(&self.location(), viewer, now_ms))
    }
}

/// An art installation on the playa.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtInstallation {
    /// Unique id
    pub id: String,
    /// Title of the piece
    pub name: String,
    /// Artist or collective
    #[serde(default)]
    pub artist: String,
    /// Short description
    #[serde(default)]
    pub description: String,
    /// Position
    pub location: Coordinate,
    /// Hidden until the gate opens
    #[serde(default)]
    pub hidden: bool,
    /// Reveal rule
    #[serde(default = "default_art_gate")]
    pub gate: ContentGate,
}

fn default_art_gate() -> ContentGate {
    ContentGate::within(ART_UNLOCK_RADIUS_KM)
}

impl Gated for ArtInstallation {
    fn location(&self) -> Coordinate {
        self.location
    }

    fn is_hidden(&self) -> bool {
        self.hidden
    }

    fn gate(&self) -> ContentGate {
        self.gate
    }
}

/// A theme camp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeCamp {
    /// Unique id
    pub id: String,
    /// Camp name
    pub name: String,
    /// Short description
    #[serde(default)]
    pub description: String,
    /// Position
    pub location: Coordinate,
    /// Hidden until the gate opens
    #[serde(default)]
    pub hidden: bool,
    /// Reveal rule
    #[serde(default = "default_camp_gate")]
    pub gate: ContentGate,
}

fn default_camp_gate() -> ContentGate {
    ContentGate::within(CAMP_UNLOCK_RADIUS_KM)
}

impl Gated for ThemeCamp {
    fn location(&self) -> Coordinate {
        self.location
    }

    fn is_hidden(&self) -> bool {
        self.hidden
    }

    fn gate(&self) -> ContentGate {
        self.gate
    }
}

/// Entries visible to a viewer, in their original order
#[must_use]
pub fn visible_entries<T: Gated + Clone>(
    entries: &[T],
    viewer: Option<&Coordinate>,
    now_ms: EpochMs,
) -> Vec<T> {
    entries
        .iter()
        .filter(|entry| entry.is_visible_to(viewer, now_ms))
        .cloned()
        .collect()
}
