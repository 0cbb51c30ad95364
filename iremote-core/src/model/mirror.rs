//! In-memory snapshot of the controller's entities.

use std::sync::{Mutex, PoisonError};

use serde::Serialize;

use super::change::ChangedItem;
use super::items::{
    Alarm, AudioSource, AudioZone, Dimmer, Light, LogVar, Room, Scenario, Shutter, Socket, Timer,
};
use super::kinds::EntityKind;
use crate::error::{IRemoteError, Result};

/// Everything downloaded from the controller, kept current by polling.
///
/// Indices equal positions in each collection for as long as the
/// connection that built the mirror stays up.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Mirror {
    pub sockets: Vec<Socket>,
    pub lights: Vec<Light>,
    pub logvars: Vec<LogVar>,
    pub dimmers: Vec<Dimmer>,
    pub shutters: Vec<Shutter>,
    pub rooms: Vec<Room>,
    pub alarms: Vec<Alarm>,
    pub audio_zones: Vec<AudioZone>,
    pub audio_sources: Vec<AudioSource>,
    pub scenarios: Vec<Scenario>,
    pub timers: Vec<Timer>,
    /// Last controller clock tick, `(hour, minute)`.
    pub clock: Option<(u8, u8)>,
    pub audio_init_ok: bool,
}

impl Mirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every entity and the controller extras.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Number of entities of `kind`; curve steps are counted across
    /// all rooms.
    pub fn count(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Socket => self.sockets.len(),
            EntityKind::Light => self.lights.len(),
            EntityKind::LogVar => self.logvars.len(),
            EntityKind::Dimmer => self.dimmers.len(),
            EntityKind::Shutter => self.shutters.len(),
            EntityKind::Room => self.rooms.len(),
            EntityKind::Alarm => self.alarms.len(),
            EntityKind::AudioZone => self.audio_zones.len(),
            EntityKind::AudioSource => self.audio_sources.len(),
            EntityKind::Scenario => self.scenarios.len(),
            EntityKind::Timer => self.timers.len(),
            EntityKind::CurveStep => self.rooms.iter().map(|r| r.curve_steps.len()).sum(),
        }
    }

    /// Mutable entity at a controller-supplied index.
    ///
    /// Fails with [`IRemoteError::ProtocolInconsistency`] when the index
    /// is negative or past the end of the collection.
    pub fn entity_mut<T: Entity>(&mut self, index: i64) -> Result<&mut T> {
        let items = T::collection_mut(self);
        let len = items.len();
        match usize::try_from(index) {
            Ok(i) if i < len => Ok(&mut items[i]),
            _ => Err(IRemoteError::ProtocolInconsistency {
                kind: T::KIND.name(),
                index,
                len,
            }),
        }
    }
}

// ── SharedMirror ─────────────────────────────────────────────────

/// The mirror as shared between a session and its callers; `None` once
/// the session is disposed.
pub type SharedMirror = Mutex<Option<Mirror>>;

/// Run `f` against the live mirror.
///
/// The lock is released before returning, so `f` must not await.
pub fn with_mirror<R>(shared: &SharedMirror, f: impl FnOnce(&mut Mirror) -> R) -> Result<R> {
    let mut guard = shared.lock().unwrap_or_else(PoisonError::into_inner);
    match guard.as_mut() {
        Some(mirror) => Ok(f(mirror)),
        None => Err(IRemoteError::Disposed),
    }
}

// ── Entity ───────────────────────────────────────────────────────

/// A top-level mirrored collection member.
pub trait Entity: Clone + Sized {
    const KIND: EntityKind;

    fn collection(mirror: &Mirror) -> &Vec<Self>;
    fn collection_mut(mirror: &mut Mirror) -> &mut Vec<Self>;

    /// Wrap a snapshot for a change notification.
    fn changed(&self) -> ChangedItem;
}

macro_rules! impl_entity {
    ($ty:ident, $kind:ident, $field:ident) => {
        impl Entity for $ty {
            const KIND: EntityKind = EntityKind::$kind;

            fn collection(mirror: &Mirror) -> &Vec<Self> {
                &mirror.$field
            }

            fn collection_mut(mirror: &mut Mirror) -> &mut Vec<Self> {
                &mut mirror.$field
            }

            fn changed(&self) -> ChangedItem {
                ChangedItem::$kind(self.clone())
            }
        }
    };
}

/// Entities that carry a controller-side name.
pub trait Named {
    fn name_mut(&mut self) -> &mut String;
}

macro_rules! impl_named {
    ($($ty:ident),*) => {
        $(impl Named for $ty {
            fn name_mut(&mut self) -> &mut String {
                &mut self.name
            }
        })*
    };
}

impl_named!(
    Socket,
    Light,
    LogVar,
    Dimmer,
    Shutter,
    Room,
    Alarm,
    AudioZone,
    AudioSource,
    Scenario
);

impl_entity!(Socket, Socket, sockets);
impl_entity!(Light, Light, lights);
impl_entity!(LogVar, LogVar, logvars);
impl_entity!(Dimmer, Dimmer, dimmers);
impl_entity!(Shutter, Shutter, shutters);
impl_entity!(Room, Room, rooms);
impl_entity!(Alarm, Alarm, alarms);
impl_entity!(AudioZone, AudioZone, audio_zones);
impl_entity!(AudioSource, AudioSource, audio_sources);
impl_entity!(Scenario, Scenario, scenarios);
impl_entity!(Timer, Timer, timers);

#[cfg(test)]
mod tests {
    use super::*;

    fn mirror_with_sockets(n: usize) -> Mirror {
        let mut mirror = Mirror::new();
        mirror.sockets = (0..n)
            .map(|index| Socket {
                index,
                name: format!("S{index}"),
                state: false,
            })
            .collect();
        mirror
    }

    #[test]
    fn entity_lookup_in_range() {
        let mut mirror = mirror_with_sockets(3);
        let socket = mirror.entity_mut::<Socket>(2).unwrap();
        assert_eq!(socket.name, "S2");
    }

    #[test]
    fn entity_lookup_out_of_range() {
        let mut mirror = mirror_with_sockets(3);
        let err = mirror.entity_mut::<Socket>(3).unwrap_err();
        assert!(matches!(
            err,
            IRemoteError::ProtocolInconsistency {
                kind: "socket",
                index: 3,
                len: 3
            }
        ));
        assert!(mirror.entity_mut::<Socket>(-1).is_err());
        assert!(mirror.entity_mut::<Light>(0).is_err());
    }

    #[test]
    fn disposed_mirror_is_reported() {
        let shared: SharedMirror = Mutex::new(Some(mirror_with_sockets(1)));
        assert_eq!(with_mirror(&shared, |m| m.sockets.len()).unwrap(), 1);

        *shared.lock().unwrap() = None;
        assert!(matches!(
            with_mirror(&shared, |m| m.sockets.len()),
            Err(IRemoteError::Disposed)
        ));
    }

    #[test]
    fn clear_resets_extras() {
        let mut mirror = mirror_with_sockets(2);
        mirror.clock = Some((12, 30));
        mirror.audio_init_ok = true;
        mirror.clear();
        assert_eq!(mirror.count(EntityKind::Socket), 0);
        assert!(mirror.clock.is_none());
        assert!(!mirror.audio_init_ok);
    }
}
