//! Punctuation-based sentence segmentation.

/// Characters that may end a sentence.
const TERMINALS: [char; 3] = ['.', '!', '?'];

/// Lazy iterator over the sentences of a text.
///
/// Created by [`split_sentences`]. Line breaks are collapsed to spaces, and a
/// boundary is any run of whitespace directly after `.`, `!` or `?`. The
/// punctuation stays attached to the sentence it ends; fragments are trimmed
/// and empty fragments are skipped.
#[derive(Debug, Clone)]
pub struct Sentences {
    text: String,
    pos: usize,
}

/// Split `text` into sentences.
pub fn split_sentences(text: &str) -> Sentences {
    Sentences {
        text: text.replace('\n', " "),
        pos: 0,
    }
}

impl Sentences {
    /// Byte range of the next raw fragment and the offset where the one after starts.
    fn next_fragment(&self) -> (usize, usize) {
        let rest = &self.text[self.pos..];
        let mut prev: Option<char> = None;

        for (i, c) in rest.char_indices() {
            if c.is_whitespace() && prev.is_some_and(|p| TERMINALS.contains(&p)) {
                let ws_len: usize = rest[i..]
                    .chars()
                    .take_while(|c| c.is_whitespace())
                    .map(char::len_utf8)
                    .sum();
                return (self.pos + i, self.pos + i + ws_len);
            }
            prev = Some(c);
        }

        (self.text.len(), self.text.len())
    }
}

impl Iterator for Sentences {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        while self.pos < self.text.len() {
            let start = self.pos;
            let (end, next) = self.next_fragment();
            self.pos = next;

            let fragment = self.text[start..end].trim();
            if !fragment.is_empty() {
                return Some(fragment.to_string());
            }
        }
        None
    }
}

impl std::iter::FusedIterator for Sentences {}
