/// Assembled program: `words[i]` lives at `origin + i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledImage {
    origin: u16,
    words: Vec<u16>,
}

impl AssembledImage {
    pub fn new(origin: u16, words: Vec<u16>) -> Self {
        Self { origin, words }
    }

    pub fn origin(&self) -> u16 {
        self.origin
    }

    pub fn words(&self) -> &[u16] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// One past the last occupied address. May be `0x10000` when the
    /// image reaches the top of memory.
    pub fn end(&self) -> u32 {
        u32::from(self.origin) + self.words.len() as u32
    }

    pub fn word_at(&self, address: u16) -> Option<u16> {
        let offset = address.checked_sub(self.origin)?;
        self.words.get(usize::from(offset)).copied()
    }

    /// `(address, word)` pairs in address order.
    pub fn iter(&self) -> impl Iterator<Item = (u16, u16)> + '_ {
        (self.origin..=u16::MAX).zip(self.words.iter().copied())
    }

    /// Object file layout: the origin, then every word, all big-endian.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(2 * (self.words.len() + 1));
        out.extend_from_slice(&self.origin.to_be_bytes());
        for word in &self.words {
            out.extend_from_slice(&word.to_be_bytes());
        }
        out
    }
}
