//! Growable packed storage for fixed-layout records.
//!
//! A [`RecordBacking`] keeps its live records densely packed at the front of
//! one `f32` array so the whole array can be uploaded as a vertex buffer.
//! Releasing a record swaps the last live record into the freed slot.
//!
//! Records are addressed through [`Record`] handles that stay valid across
//! those swaps: each handle names a stable record id, and the backing keeps
//! an id-to-slot table that it updates on every swap.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{GraphicsError, GraphicsResult};

use super::schema::{FieldId, RecordSchema};

/// Capacity multiplier applied when a backing grows.
pub const GROW_FACTOR: usize = 2;

static NEXT_BACKING_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a [`RecordBacking`], used to reject foreign handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BackingId(u64);

impl BackingId {
    fn next() -> Self {
        Self(NEXT_BACKING_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Handle to one live record.
///
/// A handle is not `Clone`: releasing it consumes it, so a record cannot be
/// released twice through the same handle.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct Record {
    backing: BackingId,
    id: u32,
    generation: u32,
}

impl Record {
    /// The backing this record belongs to.
    pub fn backing(&self) -> BackingId {
        self.backing
    }
}

/// Dense, growable array of records sharing one [`RecordSchema`].
#[derive(Debug)]
pub struct RecordBacking {
    id: BackingId,
    schema: Arc<RecordSchema>,
    data: Vec<f32>,
    capacity: usize,
    live: usize,
    next_size: usize,
    /// Record id to slot.
    slot_of: Vec<u32>,
    /// Slot to record id.
    id_at: Vec<u32>,
    /// Bumped whenever a record id is released, so stale handles stop matching.
    generation: Vec<u32>,
}

impl RecordBacking {
    /// Create a backing with room for `reserve` records.
    pub fn new(schema: Arc<RecordSchema>, reserve: usize) -> Self {
        let mut backing = Self {
            id: BackingId::next(),
            schema,
            data: Vec::new(),
            capacity: 0,
            live: 0,
            next_size: (reserve * GROW_FACTOR).max(1),
            slot_of: Vec::new(),
            id_at: Vec::new(),
            generation: Vec::new(),
        };
        backing.resize(reserve);
        backing
    }

    pub fn id(&self) -> BackingId {
        self.id
    }

    pub fn schema(&self) -> &Arc<RecordSchema> {
        &self.schema
    }

    /// Number of records the current allocation holds.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Hand out a fresh record, growing the backing if it is full.
    ///
    /// The record's contents are whatever was last stored in its slot.
    pub fn acquire(&mut self) -> Record {
        if self.live == self.capacity {
            self.grow(self.live + 1);
        }
        let id = self.id_at[self.live];
        self.live += 1;
        Record {
            backing: self.id,
            id,
            generation: self.generation[id as usize],
        }
    }

    /// Release a record, moving the last live record into its slot.
    ///
    /// Other handles stay valid. Handles from another backing are rejected.
    /// Releasing a stale handle, such as one outstanding across a
    /// [`clear`](Self::clear), leaves the backing untouched.
    pub fn release(&mut self, record: Record) -> GraphicsResult<()> {
        if record.backing != self.id {
            return Err(GraphicsError::ForeignRecord);
        }
        let Ok(slot) = self.validate(&record) else {
            log::warn!(
                "Ignoring release of record {} with {} live records: handle is stale",
                record.id,
                self.live
            );
            return Ok(());
        };
        let last = self.live - 1;
        if slot != last {
            self.swap_slots(slot, last);
        }
        self.generation[record.id as usize] = self.generation[record.id as usize].wrapping_add(1);
        self.live -= 1;
        Ok(())
    }

    /// Release every record. Outstanding handles become stale.
    pub fn clear(&mut self) {
        for slot in 0..self.live {
            let id = self.id_at[slot] as usize;
            self.generation[id] = self.generation[id].wrapping_add(1);
        }
        self.live = 0;
    }

    /// Whether `record` is a live record of this backing.
    pub fn contains(&self, record: &Record) -> bool {
        self.validate(record).is_ok()
    }

    /// Current slot of a live record.
    pub fn slot_of(&self, record: &Record) -> Option<usize> {
        self.validate(record).ok()
    }

    /// The full contents of a live record.
    pub fn get(&self, record: &Record) -> Option<&[f32]> {
        let slot = self.validate(record).ok()?;
        Some(self.slot(slot))
    }

    pub fn get_mut(&mut self, record: &Record) -> Option<&mut [f32]> {
        let slot = self.validate(record).ok()?;
        let range = self.slot_range(slot);
        Some(&mut self.data[range])
    }

    /// One field of a live record.
    pub fn field(&self, record: &Record, field: FieldId) -> Option<&[f32]> {
        let info = self.schema.field_info(field)?;
        let record = self.get(record)?;
        Some(&record[info.offset..info.offset + info.size])
    }

    pub fn field_mut(&mut self, record: &Record, field: FieldId) -> Option<&mut [f32]> {
        let (offset, size) = {
            let info = self.schema.field_info(field)?;
            (info.offset, info.size)
        };
        let record = self.get_mut(record)?;
        Some(&mut record[offset..offset + size])
    }

    /// Contents of the record stored in `slot`, live or not.
    ///
    /// # Panics
    ///
    /// Panics if `slot >= capacity`.
    pub fn slot(&self, slot: usize) -> &[f32] {
        &self.data[self.slot_range(slot)]
    }

    /// The whole allocation, including slots past the live count.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Only the live records.
    pub fn live_slice(&self) -> &[f32] {
        &self.data[..self.schema.elements_for(self.live)]
    }

    /// The whole allocation as bytes, ready for upload.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.data.as_slice())
    }

    fn validate(&self, record: &Record) -> GraphicsResult<usize> {
        if record.backing != self.id {
            return Err(GraphicsError::ForeignRecord);
        }
        let id = record.id as usize;
        let slot = self.slot_of[id] as usize;
        if slot >= self.live || self.generation[id] != record.generation {
            return Err(GraphicsError::InvalidParameter(format!(
                "record {id} is no longer live"
            )));
        }
        Ok(slot)
    }

    fn slot_range(&self, slot: usize) -> std::ops::Range<usize> {
        let stride = self.schema.stride();
        slot * stride..(slot + 1) * stride
    }

    fn swap_slots(&mut self, a: usize, b: usize) {
        let stride = self.schema.stride();
        let (low, high) = (a.min(b), a.max(b));
        let (head, tail) = self.data.split_at_mut(high * stride);
        head[low * stride..(low + 1) * stride].swap_with_slice(&mut tail[..stride]);

        let (id_a, id_b) = (self.id_at[a], self.id_at[b]);
        self.id_at.swap(a, b);
        self.slot_of[id_a as usize] = b as u32;
        self.slot_of[id_b as usize] = a as u32;
    }

    fn grow(&mut self, min_count: usize) {
        let target = min_count.max(self.next_size);
        self.next_size = target * GROW_FACTOR;
        log::debug!(
            "Growing record backing from {} to {} records ({} bytes each)",
            self.capacity,
            target,
            self.schema.stride_bytes()
        );
        self.resize(target);
    }

    fn resize(&mut self, capacity: usize) {
        self.data.resize(self.schema.elements_for(capacity), 0.0);
        for id in self.capacity..capacity {
            self.slot_of.push(id as u32);
            self.id_at.push(id as u32);
            self.generation.push(0);
        }
        self.capacity = capacity;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::types::AttributeType;
    use crate::vertex::{AttributeInfo, AttributeSchema};
    use rstest::rstest;

    fn record_schema() -> Arc<RecordSchema> {
        let attributes = AttributeSchema::new([
            AttributeInfo::new("position", AttributeType::FloatVec2, 0),
            AttributeInfo::new("value", AttributeType::Float, 1),
        ])
        .unwrap();
        Arc::new(RecordSchema::new(&attributes).unwrap())
    }

    fn write_value(backing: &mut RecordBacking, record: &Record, value: f32) {
        let field = backing.schema().field("value").unwrap();
        backing.field_mut(record, field).unwrap()[0] = value;
    }

    fn read_value(backing: &RecordBacking, record: &Record) -> f32 {
        let field = backing.schema().field("value").unwrap();
        backing.field(record, field).unwrap()[0]
    }

    #[rstest]
    #[case::empty(0, 1)]
    #[case::reserved(4, 4)]
    fn test_initial_capacity(#[case] reserve: usize, #[case] after_first: usize) {
        let mut backing = RecordBacking::new(record_schema(), reserve);
        assert_eq!(backing.capacity(), reserve);
        let _record = backing.acquire();
        assert_eq!(backing.capacity(), after_first);
        assert_eq!(backing.as_slice().len(), after_first * 3);
    }

    #[test]
    fn test_capacity_at_least_doubles() {
        let mut backing = RecordBacking::new(record_schema(), 2);
        let mut held = Vec::new();
        let mut capacities = vec![backing.capacity()];
        for _ in 0..40 {
            held.push(backing.acquire());
            if backing.capacity() != *capacities.last().unwrap() {
                capacities.push(backing.capacity());
            }
        }
        for pair in capacities.windows(2) {
            assert!(pair[1] >= pair[0] * 2, "{capacities:?}");
        }
        assert_eq!(backing.len(), 40);
    }

    #[test]
    fn test_release_moves_last_record() {
        let mut backing = RecordBacking::new(record_schema(), 4);
        let records: Vec<Record> = (0..4).map(|_| backing.acquire()).collect();
        for (i, record) in records.iter().enumerate() {
            write_value(&mut backing, record, i as f32);
        }

        let mut records = records.into_iter();
        let first = records.next().unwrap();
        let rest: Vec<Record> = records.collect();
        backing.release(first).unwrap();

        assert_eq!(backing.len(), 3);
        // The last record now lives in slot 0.
        assert_eq!(backing.slot_of(&rest[2]), Some(0));
        assert_eq!(backing.slot(0)[2], 3.0);
        for (i, record) in rest.iter().enumerate() {
            assert_eq!(read_value(&backing, record), (i + 1) as f32);
        }
    }

    #[test]
    fn test_live_slots_match_held_handles() {
        let mut backing = RecordBacking::new(record_schema(), 0);
        let mut held: Vec<Record> = (0..10).map(|_| backing.acquire()).collect();
        for index in [7, 0, 3, 3] {
            let record = held.remove(index);
            backing.release(record).unwrap();
        }
        let slots: HashSet<usize> = held.iter().map(|r| backing.slot_of(r).unwrap()).collect();
        assert_eq!(slots, (0..backing.len()).collect());
    }

    #[test]
    fn test_foreign_record_rejected() {
        let mut a = RecordBacking::new(record_schema(), 1);
        let mut b = RecordBacking::new(record_schema(), 1);
        let _kept = a.acquire();
        let record = b.acquire();
        assert_eq!(a.release(record), Err(GraphicsError::ForeignRecord));
        assert_eq!(a.len(), 1);
    }

    #[test]
    fn test_clear_makes_handles_stale() {
        let mut backing = RecordBacking::new(record_schema(), 2);
        let stale = backing.acquire();
        backing.clear();
        assert!(backing.is_empty());
        let fresh = backing.acquire();
        assert!(backing.contains(&fresh));
        assert!(!backing.contains(&stale));
        assert_eq!(backing.release(stale), Ok(()));
        assert_eq!(backing.len(), 1);
        assert!(backing.contains(&fresh));
    }

    #[test]
    fn test_release_after_clear_is_noop() {
        let mut backing = RecordBacking::new(record_schema(), 1);
        let stale = backing.acquire();
        write_value(&mut backing, &stale, 4.0);
        backing.clear();
        let before = backing.as_slice().to_vec();

        assert_eq!(backing.release(stale), Ok(()));
        assert_eq!(backing.len(), 0);
        assert_eq!(backing.as_slice(), &before[..]);
    }

    #[test]
    fn test_growth_preserves_contents() {
        let mut backing = RecordBacking::new(record_schema(), 1);
        let early: Vec<Record> = (0..3).map(|_| backing.acquire()).collect();
        for (i, record) in early.iter().enumerate() {
            write_value(&mut backing, record, 10.0 + i as f32);
        }
        let first_capacity = backing.capacity();

        let mut growths = 0;
        let mut late = Vec::new();
        while growths < 2 {
            let capacity = backing.capacity();
            late.push(backing.acquire());
            if backing.capacity() != capacity {
                growths += 1;
            }
        }
        assert!(backing.capacity() >= first_capacity * 4);

        let values: Vec<f32> = early.iter().map(|r| read_value(&backing, r)).collect();
        assert_eq!(values, [10.0, 11.0, 12.0]);
        assert_eq!(backing.len(), early.len() + late.len());
    }

    #[test]
    fn test_reacquired_slot_keeps_old_contents() {
        let mut backing = RecordBacking::new(record_schema(), 1);
        let record = backing.acquire();
        write_value(&mut backing, &record, 9.0);
        backing.release(record).unwrap();
        let again = backing.acquire();
        assert_eq!(read_value(&backing, &again), 9.0);
    }

    #[test]
    fn test_bytes_cover_whole_allocation() {
        let backing = RecordBacking::new(record_schema(), 5);
        assert_eq!(backing.as_bytes().len(), 5 * 12);
        assert!(backing.live_slice().is_empty());
    }
}
