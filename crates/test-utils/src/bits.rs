//! Reference bit packers used as test oracles.
//!
//! These work one bit at a time on a plain `Vec<bool>` so they share no
//! shift-and-mask logic with the decoders they check.

/// Pack `fields` of `nbits` each, most significant bit first, into 32-bit
/// words. The last word is zero-padded.
pub fn pack_msb_words(fields: &[u32], nbits: usize) -> Vec<u32> {
    let bits = msb_bits(fields, nbits);
    bits.chunks(32)
        .map(|chunk| {
            let mut word = 0u32;
            for (i, bit) in chunk.iter().enumerate() {
                if *bit {
                    word |= 1 << (31 - i);
                }
            }
            word
        })
        .collect()
}

/// Pack `fields` of `nbits` each, most significant bit first, into bytes.
pub fn pack_msb_bytes(fields: &[u32], nbits: usize) -> Vec<u8> {
    let bits = msb_bits(fields, nbits);
    bits.chunks(8)
        .map(|chunk| {
            let mut byte = 0u8;
            for (i, bit) in chunk.iter().enumerate() {
                if *bit {
                    byte |= 1 << (7 - i);
                }
            }
            byte
        })
        .collect()
}

fn msb_bits(fields: &[u32], nbits: usize) -> Vec<bool> {
    let mut bits = Vec::with_capacity(fields.len() * nbits);
    for field in fields {
        for b in (0..nbits).rev() {
            bits.push((field >> b) & 1 == 1);
        }
    }
    bits
}

/// Pack `(value, width)` fields back to back starting at the least
/// significant bit of the first word, the way GEMPAK packs real data.
pub fn pack_lsb_words(fields: &[(u32, usize)]) -> Vec<u32> {
    let mut bits = Vec::new();
    for (value, width) in fields {
        for b in 0..*width {
            bits.push((value >> b) & 1 == 1);
        }
    }
    bits.chunks(32)
        .map(|chunk| {
            let mut word = 0u32;
            for (i, bit) in chunk.iter().enumerate() {
                if *bit {
                    word |= 1 << i;
                }
            }
            word
        })
        .collect()
}

/// Place a single `width`-bit `value` at LSB-first bit `offset` in a
/// buffer of `nwords` zeroed words.
pub fn place_lsb_field(value: u32, offset: usize, width: usize, nwords: usize) -> Vec<u32> {
    let mut words = vec![0u32; nwords];
    for b in 0..width {
        if (value >> b) & 1 == 1 {
            let pos = offset + b;
            words[pos / 32] |= 1 << (pos % 32);
        }
    }
    words
}

/// Place a single `width`-bit `value` at MSB-first bit `offset` in a
/// buffer of `nwords` zeroed words.
pub fn place_msb_field(value: u32, offset: usize, width: usize, nwords: usize) -> Vec<u32> {
    let mut words = vec![0u32; nwords];
    for b in 0..width {
        if (value >> (width - 1 - b)) & 1 == 1 {
            let pos = offset + b;
            words[pos / 32] |= 1 << (31 - pos % 32);
        }
    }
    words
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_msb_words() {
        assert_eq!(pack_msb_words(&[0x5], 4), vec![0x5000_0000]);
        assert_eq!(pack_msb_words(&[1, 2, 3], 8), vec![0x0102_0300]);
    }

    #[test]
    fn test_msb_bytes() {
        assert_eq!(pack_msb_bytes(&[0xA, 0x5], 4), vec![0xA5]);
    }

    #[test]
    fn test_lsb_words() {
        assert_eq!(pack_lsb_words(&[(0x5, 4)]), vec![0x5]);
        assert_eq!(pack_lsb_words(&[(0x1, 4), (0x2, 4)]), vec![0x21]);
        // 30 + 4 bits crosses into a second word
        let words = pack_lsb_words(&[(0, 30), (0xF, 4)]);
        assert_eq!(words, vec![0xC000_0000, 0x3]);
    }

    #[test]
    fn test_place_fields() {
        assert_eq!(place_lsb_field(0b11, 31, 2, 2), vec![0x8000_0000, 0x1]);
        assert_eq!(place_msb_field(0b11, 31, 2, 2), vec![0x1, 0x8000_0000]);
    }
}
