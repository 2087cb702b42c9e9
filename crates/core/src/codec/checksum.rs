/// 64-bit cyrb64 hash of a script body, seeded with zero.
///
/// The bytes are packed into little-endian u32 words, zero-padded to a
/// multiple of four, which is the exact layout recorded in saved headers.
/// An empty body hashes to zero.
pub(crate) fn body_checksum(body: &[u8]) -> u64 {
    if body.is_empty() {
        return 0;
    }
    let mut h1: u32 = 0xdead_beef;
    let mut h2: u32 = 0x41c6_ce57;
    for chunk in body.chunks(4) {
        let mut word = [0u8; 4];
        word[..chunk.len()].copy_from_slice(chunk);
        let w = u32::from_le_bytes(word);
        h1 = (h1 ^ w).wrapping_mul(2_654_435_761);
        h2 = (h2 ^ w).wrapping_mul(1_597_334_677);
    }
    h1 = (h1 ^ (h1 >> 16)).wrapping_mul(2_246_822_507);
    h1 ^= (h2 ^ (h2 >> 13)).wrapping_mul(3_266_489_909);
    h2 = (h2 ^ (h2 >> 16)).wrapping_mul(2_246_822_507);
    h2 ^= (h1 ^ (h1 >> 13)).wrapping_mul(3_266_489_909);
    (u64::from(h2) << 32) | u64::from(h1)
}
