//! Tag sequences parsed from comma-delimited text.

use std::fmt;

/// An ordered list of non-empty, trimmed tags.
///
/// Parsing splits on commas, trims every part and drops empties; the
/// canonical text form joins with `", "`. Parsing the canonical form gives
/// back the same tags, so parse/serialize is a fixed point after one pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TagSequence {
    tags: Vec<String>,
}

impl TagSequence {
    /// Parses `" a, b ,c"` into `["a", "b", "c"]`.
    pub fn parse(text: &str) -> Self {
        Self {
            tags: text
                .split(',')
                .map(str::trim)
                .filter(|tag| !tag.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    /// Builds a sequence from already-split tags, normalizing each one.
    pub fn from_tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            tags: tags
                .into_iter()
                .map(|tag| tag.as_ref().trim().to_string())
                .filter(|tag| !tag.is_empty())
                .collect(),
        }
    }

    /// Canonical text form: tags joined with `", "`.
    pub fn serialize(&self) -> String {
        self.tags.join(", ")
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.tags.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.tags
    }

    /// Mutable access for the reorder engine's splice.
    pub(crate) fn tags_mut(&mut self) -> &mut Vec<String> {
        &mut self.tags
    }

    /// Removes the tag at `index`, returning it.
    pub fn remove(&mut self, index: usize) -> Option<String> {
        (index < self.tags.len()).then(|| self.tags.remove(index))
    }

    /// Replaces the tag at `index`. An edit that trims to nothing removes
    /// the tag instead; text containing commas is split into several tags.
    ///
    /// Returns false if `index` is out of range.
    pub fn replace(&mut self, index: usize, text: &str) -> bool {
        if index >= self.tags.len() {
            return false;
        }
        let replacement = Self::parse(text).tags;
        self.tags.splice(index..=index, replacement);
        true
    }

    /// Inserts tags parsed from `text` at `index` (clamped to the end).
    pub fn insert(&mut self, index: usize, text: &str) {
        let index = index.min(self.tags.len());
        let new_tags = Self::parse(text).tags;
        self.tags.splice(index..index, new_tags);
    }
}

impl fmt::Display for TagSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}
