//! Per-instance data for the instanced item draw.

use std::ops::Range;

use bytemuck::{Pod, Zeroable};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

/// Per-instance vertex attributes, consumed at binding 1.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct InstanceRecord {
    /// Added to every vertex position
    pub translate: [f32; 3],
    /// Added to the material's diffuse color
    pub diffuse_adjust: [f32; 3],
}

static_assertions::const_assert_eq!(std::mem::size_of::<InstanceRecord>(), 24);

/// Bytes per instance in the instance buffer.
pub const INSTANCE_STRIDE: usize = std::mem::size_of::<InstanceRecord>();

/// Generates instance records on demand and keeps them for the process
/// lifetime.
///
/// Records are generated once per index, in index order. Growing never
/// touches records that already exist, so a device buffer rebuilt after a
/// surface loss gets the same data back.
pub struct InstanceDataGenerator {
    records: Vec<InstanceRecord>,
    requested: usize,
    max: usize,
    rng: Pcg32,
}

impl InstanceDataGenerator {
    /// `seed` makes the jitter reproducible; `None` draws a random seed.
    pub fn new(initial: usize, max: usize, seed: Option<u64>) -> Self {
        let seed = seed.unwrap_or_else(rand::random::<u64>);
        let mut generator = Self {
            records: Vec::new(),
            requested: 0,
            max,
            rng: Pcg32::seed_from_u64(seed),
        };
        generator.set_requested(initial);
        generator
    }

    /// Number of instances to draw.
    pub fn requested(&self) -> usize {
        self.requested
    }

    /// Number of records generated so far.
    pub fn prepared(&self) -> usize {
        self.records.len()
    }

    pub fn max(&self) -> usize {
        self.max
    }

    /// Request `count` instances, clamped to the maximum.
    pub fn set_requested(&mut self, count: usize) {
        if count > self.max {
            log::warn!(
                "Requested {count} instances, clamping to the maximum of {}",
                self.max
            );
        }
        self.requested = count.min(self.max);
    }

    /// Request `step` more instances, clamped to the maximum.
    pub fn grow(&mut self, step: usize) -> usize {
        self.requested = self.requested.saturating_add(step).min(self.max);
        self.requested
    }

    /// Generate records up to the requested count.
    ///
    /// Returns the range of indices generated by this call, empty when
    /// nothing was missing.
    pub fn generate(&mut self) -> Range<usize> {
        let start = self.records.len();
        if self.requested <= start {
            return start..start;
        }

        log::debug!("Preparing instances {}..{}", start, self.requested - 1);
        self.records.reserve(self.requested - start);
        for _ in start..self.requested {
            let record = self.next_record();
            self.records.push(record);
        }
        start..self.requested
    }

    fn next_record(&mut self) -> InstanceRecord {
        let rng = &mut self.rng;
        let translate = [
            rng.random_range(-5.0f32..5.0),
            rng.random_range(-4.0f32..6.0),
            rng.random_range(-30.0f32..5.0),
        ];
        let mut diffuse = || rng.random_range(-6.0f32..3.0) / 10.0;
        let diffuse_adjust = [diffuse(), diffuse(), diffuse()];
        InstanceRecord {
            translate,
            diffuse_adjust,
        }
    }

    pub fn records(&self) -> &[InstanceRecord] {
        &self.records
    }

    /// Bytes of the records to draw, ready to upload.
    pub fn as_bytes(&self) -> &[u8] {
        let count = self.requested.min(self.records.len());
        bytemuck::cast_slice(&self.records[..count])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_request_is_clamped() {
        let generator = InstanceDataGenerator::new(100, 64, Some(1));
        assert_eq!(generator.requested(), 64);
        assert_eq!(generator.prepared(), 0);
    }

    #[test]
    fn test_grow_never_exceeds_max() {
        let mut generator = InstanceDataGenerator::new(128, 200, Some(1));
        assert_eq!(generator.grow(16), 144);
        for _ in 0..100 {
            generator.grow(16);
        }
        assert_eq!(generator.requested(), 200);
        assert_eq!(generator.grow(usize::MAX), 200);
    }

    #[test]
    fn test_generate_is_incremental() {
        let mut generator = InstanceDataGenerator::new(4, 64, Some(7));
        assert_eq!(generator.generate(), 0..4);
        let first: Vec<InstanceRecord> = generator.records().to_vec();

        assert_eq!(generator.generate(), 4..4);
        assert_eq!(generator.records(), first.as_slice());

        generator.grow(4);
        assert_eq!(generator.generate(), 4..8);
        assert_eq!(&generator.records()[..4], first.as_slice());
        assert_eq!(generator.as_bytes().len(), 8 * INSTANCE_STRIDE);
    }

    #[test]
    fn test_jitter_ranges() {
        let mut generator = InstanceDataGenerator::new(2048, 2048, Some(42));
        generator.generate();
        for record in generator.records() {
            let [x, y, z] = record.translate;
            assert!((-5.0..5.0).contains(&x));
            assert!((-4.0..6.0).contains(&y));
            assert!((-30.0..5.0).contains(&z));
            for d in record.diffuse_adjust {
                assert!((-0.6..=0.3).contains(&d), "diffuse adjust {d}");
            }
        }
    }

    #[test]
    fn test_same_seed_same_records() {
        let mut a = InstanceDataGenerator::new(32, 64, Some(99));
        let mut b = InstanceDataGenerator::new(32, 64, Some(99));
        a.generate();
        b.generate();
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn test_shrinking_request_keeps_records() {
        let mut generator = InstanceDataGenerator::new(16, 64, Some(3));
        generator.generate();
        generator.set_requested(8);
        assert_eq!(generator.generate(), 16..16);
        assert_eq!(generator.prepared(), 16);
        assert_eq!(generator.as_bytes().len(), 8 * INSTANCE_STRIDE);
    }
}
