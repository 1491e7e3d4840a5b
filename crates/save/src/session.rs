// ---------------------------------------------------------------------------
// session – whole-session save built from the SaveableRegistry
// ---------------------------------------------------------------------------

use std::collections::BTreeMap;
use std::path::Path;

use bevy::prelude::*;
use bitcode::{Decode, Encode};
use simulation::{SaveableRegistry, TickCounter};

use crate::atomic_write::atomic_write;
use crate::file_header::{read_payload, wrap_with_header, SaveKind};
use crate::save_error::SaveError;

/// Current session payload version. Bump when the payload layout changes.
pub const SESSION_VERSION: u32 = 1;

/// Payload of a session save: one opaque blob per registered `Saveable`.
#[derive(Debug, Clone, Default, PartialEq, Encode, Decode)]
pub struct SessionData {
    pub version: u32,
    pub tick: u64,
    pub extensions: BTreeMap<String, Vec<u8>>,
}

/// Collect every registered saveable from the world.
pub fn collect_session(world: &mut World) -> SessionData {
    let tick = world.get_resource::<TickCounter>().map_or(0, |t| t.0);
    let extensions = world.resource_scope(|world, registry: Mut<SaveableRegistry>| {
        registry.save_all(world)
    });
    SessionData {
        version: SESSION_VERSION,
        tick,
        extensions,
    }
}

/// Reset every registered saveable, then load whatever the session holds.
/// Keys the session lacks stay at their defaults.
pub fn apply_session(world: &mut World, data: &SessionData) {
    world.resource_scope(|world, registry: Mut<SaveableRegistry>| {
        registry.reset_all(world);
        registry.load_all(world, &data.extensions);
    });
    if let Some(mut tick) = world.get_resource_mut::<TickCounter>() {
        tick.0 = data.tick;
    }
}

pub fn encode_session(data: &SessionData) -> Vec<u8> {
    wrap_with_header(&bitcode::encode(data), SaveKind::Session, data.tick, true)
}

pub fn decode_session(bytes: &[u8]) -> Result<SessionData, SaveError> {
    let (_, payload) = read_payload(bytes, SaveKind::Session)?;
    let data: SessionData = bitcode::decode(&payload)?;
    if data.version > SESSION_VERSION {
        return Err(SaveError::VersionMismatch {
            expected_max: SESSION_VERSION,
            found: data.version,
        });
    }
    Ok(data)
}

/// Save the session to `path`. Returns the number of bytes written.
pub fn save_session(world: &mut World, path: impl AsRef<Path>) -> Result<usize, SaveError> {
    let bytes = encode_session(&collect_session(world));
    atomic_write(path, &bytes)?;
    Ok(bytes.len())
}

/// Load a session from `path`. The world is only touched once the file has
/// been fully read and decoded. Returns the restored tick.
pub fn load_session(world: &mut World, path: impl AsRef<Path>) -> Result<u64, SaveError> {
    let bytes = std::fs::read(path)?;
    let data = decode_session(&bytes)?;
    apply_session(world, &data);
    Ok(data.tick)
}

#[cfg(test)]
mod tests {
    use super::*;
    use simulation::brake_settings::BrakeSimSettings;
    use simulation::test_harness::TestTrain;

    #[test]
    fn test_session_round_trip_restores_roster_and_tick() {
        let (mut sim, id) = TestTrain::with_freight(3);
        sim.run_seconds(2.0);
        let data = collect_session(sim.world_mut());
        assert_eq!(data.tick, sim.tick_count());

        let decoded = decode_session(&encode_session(&data)).unwrap();
        assert_eq!(decoded, data);

        let mut restored = TestTrain::new();
        apply_session(restored.world_mut(), &decoded);
        assert_eq!(restored.train(id), sim.train(id));
        assert_eq!(restored.tick_count(), sim.tick_count());
    }

    #[test]
    fn test_apply_resets_keys_missing_from_session() {
        let (mut sim, _) = TestTrain::with_freight(2);
        sim.world_mut().resource_mut::<BrakeSimSettings>().max_substeps = 7;

        apply_session(sim.world_mut(), &SessionData::default());
        assert!(sim.roster().is_empty());
        assert_eq!(*sim.resource::<BrakeSimSettings>(), BrakeSimSettings::default());
        assert_eq!(sim.tick_count(), 0);
    }

    #[test]
    fn test_newer_session_version_rejected() {
        let data = SessionData {
            version: SESSION_VERSION + 1,
            ..Default::default()
        };
        let err = decode_session(&encode_session(&data)).unwrap_err();
        assert!(matches!(err, SaveError::VersionMismatch { .. }), "{err}");
    }

    #[test]
    fn test_snapshot_file_is_not_a_session() {
        let bytes = wrap_with_header(&[0, 0, 0, 0], SaveKind::BrakeSnapshot, 0, false);
        assert!(matches!(
            decode_session(&bytes),
            Err(SaveError::WrongKind { .. })
        ));
    }

    #[test]
    fn test_failed_load_leaves_world_untouched() {
        let (mut sim, id) = TestTrain::with_freight(2);
        let before = sim.train(id).clone();
        let path = std::env::temp_dir().join(format!(
            "railbrake_missing_session_{}.rbrk",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);

        assert!(matches!(
            load_session(sim.world_mut(), &path),
            Err(SaveError::Io(_))
        ));
        assert_eq!(sim.train(id), &before);
    }
}
