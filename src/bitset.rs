use std::fmt::Debug;

use smallvec::SmallVec;

/// A growable set of small indices, used for vertex attribute usage and bind group masks.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Bitset {
    words: SmallVec<[u64; 1]>,
    len: usize,
}

impl Bitset {
    pub fn new(len: usize) -> Self {
        Self {
            words: std::iter::repeat(0)
                .take(Self::compute_word_len(len))
                .collect(),
            len,
        }
    }

    /// A set of `len` bits with the first `count` set.
    pub fn with_prefix(len: usize, count: usize) -> Self {
        let mut bitset = Self::new(len);
        for index in 0..count {
            bitset.insert(index);
        }
        bitset
    }

    /// Number of bits the set can hold without growing.
    pub fn capacity(&self) -> usize {
        self.len
    }

    /// Whether no bit is set, whatever the capacity.
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&word| word == 0)
    }

    /// Number of set bits.
    pub fn count(&self) -> usize {
        self.words.iter().map(|word| word.count_ones() as usize).sum()
    }

    fn resize(&mut self, len: usize) {
        if len <= self.len {
            return;
        }

        let old_word_len = self.word_len();
        let new_word_len = Self::compute_word_len(len);
        for _ in old_word_len..new_word_len {
            self.words.push(0);
        }
        self.len = len;
    }

    fn word_len(&self) -> usize {
        Self::compute_word_len(self.len)
    }

    fn compute_word_len(len: usize) -> usize {
        len / 64 + if len % 64 != 0 { 1 } else { 0 }
    }

    pub fn contains(&self, index: usize) -> Option<bool> {
        if index >= self.len {
            return None;
        }

        let word = self.words[index / 64];
        let bit = word & ((1 << 63) >> (index % 64));
        Some(bit != 0)
    }

    pub fn insert(&mut self, index: usize) {
        if index >= self.len {
            self.resize(index + 1);
        }

        let word = &mut self.words[index / 64];
        let mask = (1 << 63) >> (index % 64);
        *word |= mask;
    }

    pub fn iter(&self) -> Iter {
        Iter {
            bitset: self,
            index: 0,
        }
    }
}

impl Debug for Bitset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut bitstring = String::with_capacity(self.len);
        for index in 0..self.len {
            bitstring.push(if self.contains(index) == Some(true) {
                '1'
            } else {
                '0'
            });
        }
        f.write_fmt(format_args!("Bitset {{ {} }}", bitstring))
    }
}

impl FromIterator<usize> for Bitset {
    fn from_iter<T: IntoIterator<Item = usize>>(iter: T) -> Self {
        let mut bitset = Bitset::new(0);
        for index in iter {
            bitset.insert(index);
        }
        bitset
    }
}

pub struct Iter<'a> {
    bitset: &'a Bitset,
    index: usize,
}

impl Iterator for Iter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.bitset.contains(self.index) {
                Some(val) => {
                    if val {
                        self.index += 1;
                        return Some(self.index - 1);
                    }
                }
                None => return None,
            }
            self.index += 1;
        }
    }
}

#[test]
fn bitset_fmt() {
    let mut bitset = Bitset::new(8);
    bitset.insert(0);
    bitset.insert(5);
    bitset.insert(7);
    assert_eq!(&format!("{bitset:?}")[..], "Bitset { 10000101 }");
}

#[test]
fn bitset_grows() {
    let mut bitset = Bitset::new(4);
    bitset.insert(1);
    bitset.insert(70);

    assert_eq!(bitset.capacity(), 71);
    assert_eq!(bitset.count(), 2);
    assert_eq!(bitset.contains(70), Some(true));
    assert_eq!(bitset.contains(71), None);
}

#[test]
fn bitset_prefix() {
    let mask = Bitset::with_prefix(4, 2);
    assert_eq!(&format!("{mask:?}")[..], "Bitset { 1100 }");
    assert!(!mask.is_empty());
    assert_eq!(mask.count(), 2);

    let empty = Bitset::new(16);
    assert_eq!(empty.capacity(), 16);
    assert!(empty.is_empty());
    assert_eq!(empty.count(), 0);
}

#[test]
fn bitset_iter() {
    let bitset: Bitset = [0, 2, 5, 6, 7].into_iter().collect();

    let mut string = "".to_string();
    for elem in bitset.iter() {
        string.push_str(&elem.to_string()[..]);
    }

    assert_eq!(&string[..], "02567");
}
