//! Device memory alignment arithmetic.

use ash::vk;

/// Round `size` up to the next multiple of `alignment`.
///
/// `alignment` must be a power of two, which is what Vulkan guarantees for
/// every alignment it reports (memory requirements, uniform offset limits).
#[inline]
pub fn aligned(size: vk::DeviceSize, alignment: vk::DeviceSize) -> vk::DeviceSize {
    debug_assert!(alignment.is_power_of_two(), "alignment {alignment} is not a power of two");
    (size + alignment - 1) & !(alignment - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aligned_rounds_up() {
        assert_eq!(aligned(0, 256), 0);
        assert_eq!(aligned(1, 256), 256);
        assert_eq!(aligned(176, 256), 256);
        assert_eq!(aligned(256, 256), 256);
        assert_eq!(aligned(257, 256), 512);
        assert_eq!(aligned(116, 16), 128);
    }

    #[test]
    fn test_aligned_properties() {
        for shift in 0..12 {
            let alignment = 1u64 << shift;
            for size in 0..2048u64 {
                let result = aligned(size, alignment);
                assert_eq!(result % alignment, 0);
                assert!(result >= size);
                assert!(result < size + alignment);
            }
        }
    }

    #[test]
    fn test_alignment_of_one_is_identity() {
        assert_eq!(aligned(12345, 1), 12345);
    }
}
