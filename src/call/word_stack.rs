use super::{CallCodecError, check_stack_len};

/// An ordered argument stack of 64-bit words.
///
/// The first word pushed sits at the bottom of the stack and is the first
/// word written on the wire. The length limit is checked whenever the stack
/// grows, so an oversized stack can never reach the encoder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct WordStack {
    words: Vec<u64>,
}

impl WordStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a stack from `words`, bottom first.
    pub fn from_words(words: Vec<u64>) -> Result<Self, CallCodecError> {
        check_stack_len(words.len())?;
        Ok(Self { words })
    }

    /// Builds a stack from an iterator, bottom first.
    ///
    /// Iterators that report a lower size bound beyond the limit are rejected
    /// before anything is collected.
    pub fn try_from_iter<I>(iter: I) -> Result<Self, CallCodecError>
    where
        I: IntoIterator<Item = u64>,
    {
        let iter = iter.into_iter();
        check_stack_len(iter.size_hint().0)?;

        let mut stack = Self::new();
        for word in iter {
            stack.push(word)?;
        }
        Ok(stack)
    }

    pub fn push(&mut self, word: u64) -> Result<(), CallCodecError> {
        check_stack_len(self.words.len() + 1)?;
        self.words.push(word);
        Ok(())
    }

    pub fn pop(&mut self) -> Option<u64> {
        self.words.pop()
    }

    /// The word at the top of the stack (the last one pushed).
    pub fn peek(&self) -> Option<u64> {
        self.words.last().copied()
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.words
    }

    pub fn iter(&self) -> impl Iterator<Item = &u64> {
        self.words.iter()
    }

    pub fn into_vec(self) -> Vec<u64> {
        self.words
    }
}

impl TryFrom<Vec<u64>> for WordStack {
    type Error = CallCodecError;

    fn try_from(words: Vec<u64>) -> Result<Self, Self::Error> {
        WordStack::from_words(words)
    }
}

impl AsRef<[u64]> for WordStack {
    fn as_ref(&self) -> &[u64] {
        &self.words
    }
}
