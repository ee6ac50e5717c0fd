//! Timer-driven key rotation.
//!
//! The scheduler is checked opportunistically on every event-loop iteration
//! rather than running a dedicated thread: [`RotationScheduler::tick`]
//! advances whichever groups are due and returns immediately. Rotation is a
//! purely local operation - it makes a new current key visible to future
//! batch reads but pushes nothing to clients, who must poll to observe it.

use std::collections::HashMap;

use crate::{
    env::Environment,
    error::StorageError,
    key_material::KeyMaterial,
    registry::{SecurityGroupId, SharedRegistry},
};

/// Result of one group's rotation attempt during a tick.
#[derive(Debug)]
pub struct RotationOutcome {
    /// The rotated group.
    pub group: SecurityGroupId,
    /// New current key id, or why rotation failed.
    ///
    /// A failure (key id exhaustion) is fatal to this group's rotation
    /// cycle and must reach an operator - a group stuck without a future
    /// key strands late-joining clients.
    pub result: Result<u32, StorageError>,
}

/// Advances every registered group's lineage once per key lifetime.
///
/// Tracks per-group rotation deadlines against the environment clock.
/// Groups are discovered from the registry on each tick, so provisioning a
/// group automatically arms its timer (first rotation one lifetime after
/// first sight).
pub struct RotationScheduler<E: Environment> {
    env: E,
    registry: SharedRegistry,
    last_rotation: HashMap<SecurityGroupId, E::Instant>,
}

impl<E: Environment> RotationScheduler<E> {
    /// Create a scheduler over the process's canonical registry.
    pub fn new(env: E, registry: SharedRegistry) -> Self {
        Self { env, registry, last_rotation: HashMap::new() }
    }

    /// Rotate every group whose key lifetime has elapsed.
    ///
    /// Returns an outcome per rotated group (empty when nothing was due).
    /// The registry lock is held for the duration of the scan and the
    /// rotations themselves - one atomic read/modify/write, no I/O inside.
    pub fn tick(&mut self) -> Vec<RotationOutcome> {
        let now = self.env.now();
        let env = &self.env;
        let last_rotation = &mut self.last_rotation;

        self.registry.with_mut(|reg| {
            let mut outcomes = Vec::new();

            for id in reg.group_ids() {
                let Some(group) = reg.group_mut(&id) else { continue };
                let lifetime = group.config().key_lifetime;

                let due = match last_rotation.get(&id) {
                    Some(&last) => now - last >= lifetime,
                    None => {
                        // First sight: arm the timer, rotate a lifetime later.
                        last_rotation.insert(id.clone(), now);
                        false
                    },
                };
                if !due {
                    continue;
                }

                let result = group
                    .storage_mut()
                    .rotate(|| env.fresh_secret())
                    .map(KeyMaterial::key_id);
                match &result {
                    Ok(key_id) => {
                        tracing::debug!(group = %id, current = key_id, "key rotated");
                    },
                    Err(err) => {
                        tracing::error!(group = %id, %err, "key rotation failed");
                    },
                }

                last_rotation.insert(id.clone(), now);
                outcomes.push(RotationOutcome { group: id, result });
            }

            // Forget deadlines of deregistered groups.
            last_rotation.retain(|id, _| reg.contains(id));

            outcomes
        })
    }
}
