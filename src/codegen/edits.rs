use std::ops::Range;

/// A change to the original source, addressed in original byte offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    /// overwrite with spaces, keeping newlines and other control characters
    Blank(Range<usize>),
    Insert { at: usize, text: String },
}

/// Edits collected while scanning and applied in a single pass at the end,
/// so positions recorded during the scan never shift.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditList {
    edits: Vec<Edit>,
}

impl EditList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blank(&mut self, range: Range<usize>) {
        if !range.is_empty() {
            self.edits.push(Edit::Blank(range));
        }
    }

    /// Inserts at the same offset keep the order they were added in.
    pub fn insert(&mut self, at: usize, text: impl Into<String>) {
        self.edits.push(Edit::Insert {
            at,
            text: text.into(),
        });
    }

    fn inserts(&self) -> impl Iterator<Item = (usize, &str)> {
        self.edits.iter().filter_map(|edit| match edit {
            Edit::Insert { at, text } => Some((*at, text.as_str())),
            Edit::Blank(_) => None,
        })
    }

    pub fn apply(&self, source: &str) -> String {
        let mut blanked = vec![false; source.len()];
        for edit in &self.edits {
            if let Edit::Blank(range) = edit {
                let end = range.end.min(source.len());
                let start = range.start.min(end);
                blanked[start..end].fill(true);
            }
        }

        // replacement keeps every byte offset, so insert positions stay valid
        let mut text = String::with_capacity(source.len());
        for (offset, ch) in source.char_indices() {
            if blanked[offset] && !ch.is_control() {
                text.extend(std::iter::repeat_n(' ', ch.len_utf8()));
            } else {
                text.push(ch);
            }
        }

        let mut inserts: Vec<(usize, &str)> = self.inserts().collect();
        inserts.sort_by_key(|(at, _)| *at);

        let extra: usize = inserts.iter().map(|(_, inserted)| inserted.len()).sum();
        let mut output = String::with_capacity(text.len() + extra);
        let mut copied = 0;
        for (at, inserted) in inserts {
            let at = at.clamp(copied, text.len());
            output.push_str(&text[copied..at]);
            output.push_str(inserted);
            copied = at;
        }
        output.push_str(&text[copied..]);
        output
    }

    /// Output offset of the first original byte at or after `pos`, skipping
    /// over text inserted at `pos`.
    pub fn map_start(&self, pos: usize) -> usize {
        pos + self
            .inserts()
            .filter(|(at, _)| *at < pos)
            .map(|(_, text)| text.len())
            .sum::<usize>()
    }

    /// Output offset just past text inserted at `pos`, for the exclusive end
    /// of a range.
    pub fn map_end(&self, pos: usize) -> usize {
        pos + self
            .inserts()
            .filter(|(at, _)| *at <= pos)
            .map(|(_, text)| text.len())
            .sum::<usize>()
    }
}
