//! Display order of a fixed set of items.
//!
//! The backing content never moves; an `OrderedList` is a permutation that
//! maps display slots to content indices.

use super::ReorderError;

/// Moves the element at `source` so that it lands at `insertion`.
///
/// `insertion` is expressed against the list *before* removal (an index in
/// `0..=len`), so it is shifted down by one when it lies after `source`.
/// Returns the final position of the moved element, or `None` when nothing
/// changed (out-of-range source, or the move resolves to the same place).
pub fn move_element<T>(items: &mut Vec<T>, source: usize, insertion: usize) -> Option<usize> {
    if source >= items.len() {
        return None;
    }
    let mut dest = insertion.min(items.len());
    if source < dest {
        dest -= 1;
    }
    if dest == source {
        return None;
    }
    let element = items.remove(source);
    let dest = dest.min(items.len());
    items.insert(dest, element);
    Some(dest)
}

/// A permutation of `0..len` giving the display order of content items.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderedList {
    order: Vec<usize>,
}

impl OrderedList {
    /// The identity order `[0, 1, .., len - 1]`.
    pub fn identity(len: usize) -> Self {
        Self {
            order: (0..len).collect(),
        }
    }

    /// Builds an order from an explicit permutation.
    pub fn from_order(order: Vec<usize>) -> Result<Self, ReorderError> {
        validate_permutation(&order, order.len())?;
        Ok(Self { order })
    }

    /// Parses a comma-separated order such as `"2, 0, 1, 3"` for `len` items.
    pub fn parse_csv(text: &str, len: usize) -> Result<Self, ReorderError> {
        let order = text
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| {
                part.parse::<usize>()
                    .map_err(|_| ReorderError::InvalidIndex(part.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        validate_permutation(&order, len)?;
        Ok(Self { order })
    }

    /// Like [`parse_csv`](Self::parse_csv) but falls back to the identity
    /// order on malformed input.
    pub fn parse_or_identity(text: &str, len: usize) -> Self {
        Self::parse_csv(text, len).unwrap_or_else(|err| {
            log::warn!("ignoring item order {:?}: {}", text, err);
            Self::identity(len)
        })
    }

    /// Serializes as `"2,0,1,3"`.
    pub fn to_csv(&self) -> String {
        self.order
            .iter()
            .map(|index| index.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if there are no slots.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Content index shown in display slot `slot`.
    pub fn content_at(&self, slot: usize) -> Option<usize> {
        self.order.get(slot).copied()
    }

    /// Display slot currently showing content index `content`.
    pub fn slot_of(&self, content: usize) -> Option<usize> {
        self.order.iter().position(|&c| c == content)
    }

    /// The permutation as a slice.
    pub fn as_slice(&self) -> &[usize] {
        &self.order
    }

    /// Mutable access for the reorder engine's splice.
    pub(crate) fn order_mut(&mut self) -> &mut Vec<usize> {
        &mut self.order
    }

    /// Moves the slot at `source` to `insertion` (pre-removal index).
    ///
    /// Returns the new slot of the moved entry, or `None` for a no-op.
    pub fn move_slot(&mut self, source: usize, insertion: usize) -> Option<usize> {
        move_element(&mut self.order, source, insertion)
    }
}

fn validate_permutation(order: &[usize], len: usize) -> Result<(), ReorderError> {
    if order.len() != len {
        return Err(ReorderError::LengthMismatch {
            found: order.len(),
            expected: len,
        });
    }
    let mut seen = vec![false; len];
    for &index in order {
        match seen.get_mut(index) {
            Some(slot) if !*slot => *slot = true,
            Some(_) => return Err(ReorderError::DuplicateIndex(index)),
            None => return Err(ReorderError::InvalidIndex(index.to_string())),
        }
    }
    Ok(())
}
