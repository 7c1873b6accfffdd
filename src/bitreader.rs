use std::io;

// Read big-endian bit fields of up to 32 bits from a byte buffer.
pub(crate) struct BitReader<'a> {
    data:   &'a [u8],
    pos:    usize,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> BitReader<'a> {
        BitReader { data, pos: 0 }
    }

    pub fn read_bits(&mut self, count: u8) -> io::Result<u32> {
        if count > 32 || self.pos + count as usize > self.data.len() * 8 {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
        // Byte-aligned fields are the common case (stz2 with 8/16/32 bits).
        if self.pos % 8 == 0 && count % 8 == 0 {
            let start = self.pos / 8;
            let r = self.data[start..start + count as usize / 8]
                .iter()
                .fold(0u32, |acc, &b| acc << 8 | b as u32);
            self.pos += count as usize;
            return Ok(r);
        }
        let mut r = 0u32;
        for _ in 0..count {
            let byte = self.data[self.pos / 8];
            let bit = (byte >> (7 - self.pos % 8)) & 1;
            r = r << 1 | bit as u32;
            self.pos += 1;
        }
        Ok(r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nibbles_and_words() {
        let data = [0xab, 0x12, 0x34, 0x56, 0x78, 0x9a];
        let mut r = BitReader::new(&data);
        assert_eq!(r.read_bits(4).unwrap(), 0xa);
        assert_eq!(r.read_bits(4).unwrap(), 0xb);
        assert_eq!(r.read_bits(16).unwrap(), 0x1234);
        assert_eq!(r.read_bits(4).unwrap(), 0x5);
        assert_eq!(r.read_bits(12).unwrap(), 0x678);
        assert_eq!(r.read_bits(8).unwrap(), 0x9a);
        assert!(r.read_bits(1).is_err());
    }
}
