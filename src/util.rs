pub trait U8IterExt: Iterator<Item = u8> + Sized {
    fn to_u32_iter(self) -> U8ToU32Iterator<Self>;
}

impl<I: Iterator<Item = u8>> U8IterExt for I {
    fn to_u32_iter(self) -> U8ToU32Iterator<Self> {
        U8ToU32Iterator { iter: self }
    }
}

/// Packs bytes into little-endian words. A trailing partial word is dropped.
pub struct U8ToU32Iterator<I: Iterator<Item = u8>> {
    iter: I,
}

impl<I: Iterator<Item = u8>> Iterator for U8ToU32Iterator<I> {
    type Item = u32;

    fn next(&mut self) -> Option<Self::Item> {
        let mut chunk = [0; 4];
        for byte in &mut chunk {
            *byte = self.iter.next()?;
        }
        Some(u32::from_le_bytes(chunk))
    }
}

#[test]
fn bytes_to_words() {
    let words: Vec<u32> = [0x03, 0x02, 0x23, 0x07, 0x00, 0x00, 0x01, 0x00, 0xff]
        .into_iter()
        .to_u32_iter()
        .collect();
    assert_eq!(words, [spirv::MAGIC_NUMBER, 0x0001_0000]);
}
