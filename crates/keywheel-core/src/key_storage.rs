//! Rotating key window for one security group.
//!
//! The lineage is an index-addressed ordered sequence (`VecDeque`) with the
//! current key tracked by position: advancing the window and pruning the
//! oldest past key are both O(1) end operations, and there is no pointer
//! lifetime management anywhere.

use std::collections::VecDeque;

use keywheel_crypto::SECRET_SIZE;

use crate::{error::StorageError, key_material::KeyMaterial};

/// One batch of keys read from a lineage: the current key plus bounded
/// past/future windows, each ordered by ascending key id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBatch {
    /// Keys strictly before current, ascending.
    pub past: Vec<KeyMaterial>,
    /// The key presently in active use.
    pub current: KeyMaterial,
    /// Keys strictly after current, ascending.
    pub future: Vec<KeyMaterial>,
}

impl KeyBatch {
    /// All key ids in the batch, ascending.
    pub fn key_ids(&self) -> Vec<u32> {
        self.past
            .iter()
            .map(KeyMaterial::key_id)
            .chain(std::iter::once(self.current.key_id()))
            .chain(self.future.iter().map(KeyMaterial::key_id))
            .collect()
    }

    /// Total number of keys in the batch.
    pub fn len(&self) -> usize {
        self.past.len() + 1 + self.future.len()
    }

    /// A batch always contains at least the current key.
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Ordered key lineage with a movable current position and bounded
/// past/future windows.
///
/// One canonical copy lives at the security keys service per group; each
/// client process holds a mirror that is replaced wholesale on every
/// successful pull.
///
/// # Invariants
///
/// - `lineage.len() <= max_past_key_count + 1 + max_future_key_count`
/// - Key ids are strictly increasing and, in steady state, gap-free
/// - Exactly one element is current whenever the lineage is non-empty
///
/// Callers share a storage through the registry lock; every method here
/// completes its read/modify/write synchronously, so readers observe either
/// the pre- or post-rotation lineage, never a partial one.
#[derive(Debug, Clone)]
pub struct KeyStorage {
    lineage: VecDeque<KeyMaterial>,
    current_index: usize,
    max_past_key_count: u32,
    max_future_key_count: u32,
}

impl KeyStorage {
    /// Create an empty storage with the given window bounds.
    pub fn new(max_past_key_count: u32, max_future_key_count: u32) -> Self {
        Self {
            lineage: VecDeque::with_capacity(
                max_past_key_count as usize + 1 + max_future_key_count as usize,
            ),
            current_index: 0,
            max_past_key_count,
            max_future_key_count,
        }
    }

    /// Initialize the lineage with one current key and freshly minted
    /// future keys, one per provided secret.
    ///
    /// Future key ids continue sequentially from the initial key.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if more future secrets are provided than
    /// `max_future_key_count` allows, or if the storage is already seeded.
    pub fn seed(
        &mut self,
        initial: KeyMaterial,
        future_secrets: &[[u8; SECRET_SIZE]],
    ) -> Result<(), StorageError> {
        if !self.lineage.is_empty() {
            return Err(StorageError::InvalidConfig {
                reason: "storage is already seeded".to_string(),
            });
        }
        if future_secrets.len() > self.max_future_key_count as usize {
            return Err(StorageError::InvalidConfig {
                reason: format!(
                    "{} future keys requested, window allows {}",
                    future_secrets.len(),
                    self.max_future_key_count
                ),
            });
        }

        let base = initial.key_id();
        self.lineage.push_back(initial);
        self.current_index = 0;

        for (offset, secret) in future_secrets.iter().enumerate() {
            let key_id = base
                .checked_add(offset as u32 + 1)
                .ok_or_else(|| StorageError::KeyIdExhausted { newest: base + offset as u32 })?;
            self.lineage.push_back(KeyMaterial::generate(key_id, *secret));
        }

        Ok(())
    }

    /// Advance the current position to the next key by ascending id.
    ///
    /// If no future key exists beyond the new current, one is minted from
    /// `fresh_secret`; if the past window then exceeds its bound, the
    /// oldest keys are pruned. Returns the new current key.
    ///
    /// # Errors
    ///
    /// - `NotSeeded` if the lineage is empty
    /// - `KeyIdExhausted` if the successor id would wrap
    pub fn rotate(
        &mut self,
        mut fresh_secret: impl FnMut() -> [u8; SECRET_SIZE],
    ) -> Result<&KeyMaterial, StorageError> {
        if self.lineage.is_empty() {
            return Err(StorageError::NotSeeded);
        }

        let newest = self.lineage[self.lineage.len() - 1].key_id();
        let remaining_future = self.lineage.len() - self.current_index - 1;

        // Successors this rotation must mint: one to advance onto if the
        // future side is drained, plus one so a future key exists beyond
        // the new current. Checked before any mutation so a failed rotation
        // leaves the lineage untouched.
        let minted: u32 = match remaining_future {
            0 => 2,
            1 => 1,
            _ => 0,
        };
        if newest.checked_add(minted).is_none() {
            return Err(StorageError::KeyIdExhausted { newest });
        }

        for offset in 1..=minted {
            self.lineage.push_back(KeyMaterial::generate(newest + offset, fresh_secret()));
        }

        self.current_index += 1;

        while self.current_index > self.max_past_key_count as usize {
            self.lineage.pop_front();
            self.current_index -= 1;
        }

        Ok(&self.lineage[self.current_index])
    }

    /// Read up to `min(requested, available)` keys on each side of current.
    ///
    /// Never fails for a seeded storage; a window smaller than the request
    /// simply yields fewer keys.
    pub fn read_batch(
        &self,
        requested_past_count: u32,
        requested_future_count: u32,
    ) -> Result<KeyBatch, StorageError> {
        let current = self.current().ok_or(StorageError::NotSeeded)?.clone();

        let past_len = (requested_past_count as usize).min(self.current_index);
        let past = self
            .lineage
            .range(self.current_index - past_len..self.current_index)
            .cloned()
            .collect();

        let available_future = self.lineage.len() - self.current_index - 1;
        let future_len = (requested_future_count as usize).min(available_future);
        let future = self
            .lineage
            .range(self.current_index + 1..self.current_index + 1 + future_len)
            .cloned()
            .collect();

        Ok(KeyBatch { past, current, future })
    }

    /// Replace the lineage wholesale with a pulled batch.
    ///
    /// Mirror-side only. Unconditional: the latest authoritative batch
    /// always wins over whatever the mirror held, including its own
    /// scheduling state.
    pub fn install_batch(&mut self, batch: KeyBatch) {
        self.current_index = batch.past.len();
        self.lineage.clear();
        self.lineage.extend(batch.past);
        self.lineage.push_back(batch.current);
        self.lineage.extend(batch.future);
    }

    /// The key presently in active use. `None` until seeded or installed.
    pub fn current(&self) -> Option<&KeyMaterial> {
        self.lineage.get(self.current_index)
    }

    /// Look up any retained key by id (past, current, or future).
    ///
    /// Decoding traffic tagged with an older key works until pruning drops
    /// that key out of the window.
    pub fn key_by_id(&self, key_id: u32) -> Option<&KeyMaterial> {
        // Lineage is sorted by key id; the window is small enough that a
        // scan beats maintaining a side index.
        self.lineage.iter().find(|key| key.key_id() == key_id)
    }

    /// All retained key ids, ascending.
    pub fn key_ids(&self) -> Vec<u32> {
        self.lineage.iter().map(KeyMaterial::key_id).collect()
    }

    /// Number of retained keys.
    pub fn len(&self) -> usize {
        self.lineage.len()
    }

    /// Whether the storage holds no keys yet.
    pub fn is_empty(&self) -> bool {
        self.lineage.is_empty()
    }

    /// Number of keys strictly before current.
    pub fn past_count(&self) -> usize {
        self.current_index
    }

    /// Number of keys strictly after current.
    pub fn future_count(&self) -> usize {
        self.lineage.len() - self.current_index - 1
    }

    /// Configured bound on the past window.
    pub fn max_past_key_count(&self) -> u32 {
        self.max_past_key_count
    }

    /// Configured bound on the future window.
    pub fn max_future_key_count(&self) -> u32 {
        self.max_future_key_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret(fill: u8) -> [u8; SECRET_SIZE] {
        [fill; SECRET_SIZE]
    }

    fn seeded(max_past: u32, max_future: u32) -> KeyStorage {
        let mut storage = KeyStorage::new(max_past, max_future);
        let futures: Vec<_> = (0..max_future).map(|i| secret(0x10 + i as u8)).collect();
        storage.seed(KeyMaterial::generate(1, secret(0x01)), &futures).unwrap();
        storage
    }

    #[test]
    fn seed_creates_current_and_future_keys() {
        let storage = seeded(1, 1);

        assert_eq!(storage.key_ids(), vec![1, 2]);
        assert_eq!(storage.current().unwrap().key_id(), 1);
        assert_eq!(storage.past_count(), 0);
        assert_eq!(storage.future_count(), 1);
    }

    #[test]
    fn seed_rejects_oversized_future_window() {
        let mut storage = KeyStorage::new(1, 1);
        let result =
            storage.seed(KeyMaterial::generate(1, secret(0x01)), &[secret(2), secret(3)]);

        assert!(matches!(result, Err(StorageError::InvalidConfig { .. })));
    }

    #[test]
    fn seed_twice_is_rejected() {
        let mut storage = seeded(1, 1);
        let result = storage.seed(KeyMaterial::generate(9, secret(0x09)), &[]);

        assert!(matches!(result, Err(StorageError::InvalidConfig { .. })));
    }

    #[test]
    fn rotation_walks_the_window_of_three() {
        // maxPast=1, maxFuture=1: seeded with current K1 and future K2.
        let mut storage = seeded(1, 1);
        let mut fill = 0x20u8;
        let mut fresh = move || {
            fill += 1;
            secret(fill)
        };

        // First rotation: current becomes the pre-existing future key,
        // a new future key appears, K1 is retained as the sole past key.
        let new_current = storage.rotate(&mut fresh).unwrap().key_id();
        assert_eq!(new_current, 2);
        assert_eq!(storage.key_ids(), vec![1, 2, 3]);

        // Second rotation: K1 is pruned, current becomes K2's successor.
        let new_current = storage.rotate(&mut fresh).unwrap().key_id();
        assert_eq!(new_current, 3);
        assert_eq!(storage.key_ids(), vec![2, 3, 4]);
    }

    #[test]
    fn rotate_unseeded_fails() {
        let mut storage = KeyStorage::new(1, 1);

        let result = storage.rotate(|| secret(0));
        assert!(matches!(result, Err(StorageError::NotSeeded)));
    }

    #[test]
    fn rotate_exhausts_at_key_id_max() {
        let mut storage = KeyStorage::new(0, 1);
        storage.seed(KeyMaterial::generate(u32::MAX - 1, secret(1)), &[secret(2)]).unwrap();

        // Advancing onto u32::MAX needs a successor beyond it.
        let result = storage.rotate(|| secret(3));
        assert!(matches!(result, Err(StorageError::KeyIdExhausted { newest: u32::MAX })));
    }

    #[test]
    fn read_batch_clamps_to_available_window() {
        let mut storage = seeded(2, 2);
        let mut fill = 0x40u8;
        let mut fresh = move || {
            fill += 1;
            secret(fill)
        };
        storage.rotate(&mut fresh).unwrap();

        // One past key exists; asking for five yields one.
        let batch = storage.read_batch(5, 5).unwrap();
        assert_eq!(batch.past.len(), 1);
        assert_eq!(batch.current.key_id(), 2);
        assert_eq!(batch.future.len(), storage.future_count());
    }

    #[test]
    fn read_batch_orders_keys_ascending() {
        let mut storage = seeded(2, 2);
        let mut fill = 0x50u8;
        let mut fresh = move || {
            fill += 1;
            secret(fill)
        };
        storage.rotate(&mut fresh).unwrap();
        storage.rotate(&mut fresh).unwrap();

        let batch = storage.read_batch(2, 2).unwrap();
        let ids = batch.key_ids();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn install_batch_replaces_the_mirror_wholesale() {
        let source = seeded(1, 1);
        let batch = source.read_batch(1, 1).unwrap();

        let mut mirror = KeyStorage::new(1, 1);
        mirror.install_batch(batch.clone());

        assert_eq!(mirror.current().unwrap(), source.current().unwrap());
        assert_eq!(mirror.key_ids(), source.key_ids());

        // A later batch overwrites everything, including keys the mirror
        // thought it still needed.
        let mut newer = seeded(1, 1);
        let mut fill = 0x60u8;
        newer
            .rotate(move || {
                fill += 1;
                secret(fill)
            })
            .unwrap();
        mirror.install_batch(newer.read_batch(1, 1).unwrap());

        assert_eq!(mirror.current().unwrap().key_id(), 2);
    }

    #[test]
    fn key_by_id_finds_past_keys_until_pruned() {
        let mut storage = seeded(1, 1);
        let mut fill = 0x70u8;
        let mut fresh = move || {
            fill += 1;
            secret(fill)
        };

        storage.rotate(&mut fresh).unwrap();
        assert!(storage.key_by_id(1).is_some(), "K1 still in the past window");

        storage.rotate(&mut fresh).unwrap();
        assert!(storage.key_by_id(1).is_none(), "K1 pruned after second rotation");
    }
}
