/// PalmDOC LZ77 decompression
///
/// The compression scheme is byte oriented:
/// - 0x00: literal zero
/// - 0x01-0x08: copy the next 'n' bytes verbatim
/// - 0x09-0x7F: literal character
/// - 0x80-0xBF: back-reference, combined with the next byte:
///   distance = (val & 0x3FFF) >> 3, length = (val & 7) + 3
/// - 0xC0-0xFF: space + (byte ^ 0x80)
///
/// Truncated input stops cleanly with whatever was decoded so far. Back-references
/// pointing before the start of the output are dropped.
pub fn decompress(input: &[u8]) -> Vec<u8> {
    let mut output = Vec::with_capacity(input.len() * 2);
    let mut i = 0;

    while i < input.len() {
        let c = input[i];
        i += 1;

        match c {
            0x00 | 0x09..=0x7F => output.push(c),
            0x01..=0x08 => {
                let end = (i + c as usize).min(input.len());
                output.extend_from_slice(&input[i..end]);
                i = end;
            }
            0x80..=0xBF => {
                let Some(&next) = input.get(i) else {
                    break;
                };
                i += 1;

                let combined = ((c as u16) << 8) | next as u16;
                let distance = ((combined & 0x3FFF) >> 3) as usize;
                let length = ((combined & 7) + 3) as usize;

                if distance == 0 || distance > output.len() {
                    continue;
                }
                // Byte at a time: the copy may read what it just wrote.
                for _ in 0..length {
                    let byte = output[output.len() - distance];
                    output.push(byte);
                }
            }
            0xC0..=0xFF => {
                output.push(b' ');
                output.push(c ^ 0x80);
            }
        }
    }

    output
}

/// Largest distance a back-reference can encode (11 bits).
pub const MAX_DISTANCE: usize = 2047;

/// PalmDOC LZ77 compression, the reference encoder for [`decompress`].
pub fn compress(input: &[u8]) -> Vec<u8> {
    let mut output = Vec::with_capacity(input.len());
    let mut i = 0;

    while i < input.len() {
        if i > 10 && (input.len() - i) > 10 {
            let found = (3..=10).rev().find_map(|chunk_len| {
                find_match(input, i, chunk_len).map(|dist| (dist, chunk_len))
            });
            if let Some((dist, chunk_len)) = found {
                let compound = (dist << 3) | (chunk_len - 3);
                output.push(0x80 | ((compound >> 8) as u8));
                output.push((compound & 0xFF) as u8);
                i += chunk_len;
                continue;
            }
        }

        let c = input[i];
        i += 1;

        // Space + ASCII 0x40-0x7F folds into one byte
        if c == b' ' && i < input.len() {
            let next = input[i];
            if (0x40..=0x7F).contains(&next) {
                output.push(next ^ 0x80);
                i += 1;
                continue;
            }
        }

        if c == 0 || (0x09..0x80).contains(&c) {
            output.push(c);
        } else {
            // Bytes 1-8 or >= 0x80 go through a verbatim run of up to 8
            let mut run = vec![c];
            while i < input.len() && run.len() < 8 {
                let next = input[i];
                if next == 0 || (0x09..0x80).contains(&next) {
                    break;
                }
                run.push(next);
                i += 1;
            }
            output.push(run.len() as u8);
            output.extend_from_slice(&run);
        }
    }

    output
}

fn find_match(data: &[u8], pos: usize, len: usize) -> Option<usize> {
    if pos < len {
        return None;
    }

    let pattern = &data[pos..pos + len];
    let window_start = pos.saturating_sub(MAX_DISTANCE);
    (window_start..=pos - len)
        .rev()
        .find(|&i| &data[i..i + len] == pattern)
        .map(|i| pos - i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_decompress_literal() {
        assert_eq!(decompress(b"Hello"), b"Hello");
        assert_eq!(decompress(&[0x00, b'a']), b"\0a");
    }

    #[test]
    fn test_decompress_verbatim_run() {
        assert_eq!(decompress(&[0x03, 0x80, 0x01, 0xFF, b'x']), &[0x80, 0x01, 0xFF, b'x']);
    }

    #[test]
    fn test_decompress_space_ascii() {
        // 0xC1 ^ 0x80 = 'A'
        assert_eq!(decompress(&[0xC1]), b" A");
    }

    #[test]
    fn test_decompress_distance_one_repeats() {
        // 'a' then distance 1, length 3+7: run-length expansion of the last byte
        let compound: u16 = (1 << 3) | 7;
        let input = [b'a', 0x80 | (compound >> 8) as u8, (compound & 0xFF) as u8];
        assert_eq!(decompress(&input), b"aaaaaaaaaaa");
    }

    #[test]
    fn test_decompress_max_distance() {
        let mut input = Vec::new();
        let mut expected = Vec::new();
        // 2047 distinct-ish literal bytes, then copy the first three back
        for n in 0..MAX_DISTANCE {
            let byte = b'A' + (n % 26) as u8;
            input.push(byte);
            expected.push(byte);
        }
        let compound = (MAX_DISTANCE << 3) as u16; // length 3
        input.push(0x80 | (compound >> 8) as u8);
        input.push((compound & 0xFF) as u8);
        expected.extend_from_slice(b"ABC");
        assert_eq!(decompress(&input), expected);
    }

    #[test]
    fn test_decompress_truncated_is_tolerated() {
        // Verbatim run announcing 5 bytes with only 2 present
        assert_eq!(decompress(&[b'x', 0x05, b'a', b'b']), b"xab");
        // Back-reference missing its second byte
        assert_eq!(decompress(&[b'x', 0x80]), b"x");
        // Back-reference before the start of output
        assert_eq!(decompress(&[0x80, 0x50, b'y']), b"y");
    }

    #[test]
    fn test_roundtrip() {
        let original = b"Hello, World! This is a test of PalmDOC compression. \
                         Hello, World! This is a test of PalmDOC compression.";
        let compressed = compress(original);
        assert!(compressed.len() < original.len());
        assert_eq!(decompress(&compressed), original);
    }

    #[test]
    fn test_roundtrip_binary_bytes() {
        let original: Vec<u8> = (0u8..=255).chain(0u8..=255).collect();
        assert_eq!(decompress(&compress(&original)), original);
    }

    proptest! {
        #[test]
        fn prop_compress_roundtrips(data in prop::collection::vec(any::<u8>(), 0..4096)) {
            prop_assert_eq!(decompress(&compress(&data)), data);
        }

        #[test]
        fn prop_decompress_never_panics(data in prop::collection::vec(any::<u8>(), 0..512)) {
            let _ = decompress(&data);
        }
    }
}
