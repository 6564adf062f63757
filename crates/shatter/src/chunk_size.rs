const MIB: u64 = 1024 * 1024;
const GIB: u64 = 1024 * MIB;

/// Chooses a chunk size once per file from plaintext size (§4.3). The
/// result is baked into the manifest, never recomputed at reassembly time.
#[must_use]
pub fn choose_chunk_size(file_size: u64) -> u64 {
    if file_size < 100 * MIB {
        MIB
    } else if file_size < GIB {
        5 * MIB
    } else if file_size < 10 * GIB {
        20 * MIB
    } else {
        50 * MIB
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries_pick_the_documented_tier() {
        assert_eq!(choose_chunk_size(0), MIB);
        assert_eq!(choose_chunk_size(100 * MIB - 1), MIB);
        assert_eq!(choose_chunk_size(100 * MIB), 5 * MIB);
        assert_eq!(choose_chunk_size(GIB - 1), 5 * MIB);
        assert_eq!(choose_chunk_size(GIB), 20 * MIB);
        assert_eq!(choose_chunk_size(10 * GIB - 1), 20 * MIB);
        assert_eq!(choose_chunk_size(10 * GIB), 50 * MIB);
        assert_eq!(choose_chunk_size(100 * GIB), 50 * MIB);
    }
}
