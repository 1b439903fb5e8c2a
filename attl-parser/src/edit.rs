use std::iter::once;
use std::ops::Range;

/// Edits of a source text, all addressed by offsets into the original text.
///
/// Edits are recorded in any order and applied in one pass, so no edit has to care about the
/// shifts introduced by other edits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditList {
    removals: Vec<Range<usize>>,
    insertions: Vec<(usize, String)>,
}

impl EditList {
    #[allow(missing_docs)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the text in `range`. Overlapping removals are merged.
    pub fn remove(&mut self, range: Range<usize>) {
        self.removals.push(range);
    }

    /// Insert `text` before the original character at `pos`.
    ///
    /// Insertions at the same position keep the order they were recorded in. An insertion inside
    /// a removed range lands at the end of the range.
    pub fn insert(&mut self, pos: usize, text: impl Into<String>) {
        self.insertions.push((pos, text.into()));
    }

    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.removals.is_empty() && self.insertions.is_empty()
    }

    /// Produce the edited text.
    ///
    /// All offsets must be on character boundaries of `source`; offsets past its end are clamped.
    pub fn apply(&self, source: &str) -> String {
        let len = source.len();

        let mut removals = self
            .removals
            .iter()
            .map(|r| r.start.min(len)..r.end.min(len))
            .filter(|r| !r.is_empty())
            .collect::<Vec<_>>();
        removals.sort_by_key(|r| r.start);
        let mut merged: Vec<Range<usize>> = Vec::with_capacity(removals.len());
        for range in removals {
            match merged.last_mut() {
                Some(last) if range.start <= last.end => last.end = last.end.max(range.end),
                _ => merged.push(range),
            }
        }

        let mut insertions = self.insertions.iter().collect::<Vec<_>>();
        insertions.sort_by_key(|(pos, _)| *pos);
        let mut insertions = insertions.into_iter().peekable();

        let mut result = String::with_capacity(len + len / 4);
        let mut cursor = 0;
        for removal in merged.into_iter().chain(once(len..len)) {
            while let Some((pos, text)) = insertions.next_if(|(pos, _)| *pos <= removal.start) {
                let pos = (*pos).max(cursor);
                result.push_str(&source[cursor..pos]);
                result.push_str(text);
                cursor = pos;
            }
            result.push_str(&source[cursor..removal.start]);
            cursor = removal.end;
        }
        for (_, text) in insertions {
            result.push_str(text);
        }
        result
    }
}
