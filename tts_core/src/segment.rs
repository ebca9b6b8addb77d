//! Sentence-aware text chunking.
//!
//! Text is normalised, cut into sentence candidates and then packed greedily
//! into chunks whose word count stays between a minimum and a maximum. Each
//! chunk is synthesized on its own, so chunk boundaries always fall between
//! sentences and never inside one.
//!
//! The sentence boundary rule is a heuristic. A boundary is a `.`, `!` or `?`
//! followed by whitespace and an uppercase ASCII letter, unless the text just
//! before it looks like a dotted abbreviation ("U.S.", "e.g.") or a short
//! title ("Mr.", "Dr."). Longer titles ("Mrs."), quotes closing a sentence and
//! non-English punctuation are known to mis-split or under-split.

/// Default upper bound on words per chunk.
pub const DEFAULT_MAX_WORDS: usize = 20;
/// Default lower bound on words per chunk (the final chunk may fall short).
pub const DEFAULT_MIN_WORDS: usize = 10;

/// Chunking parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segmenter {
    max_words: usize,
    min_words: usize,
}

impl Default for Segmenter {
    fn default() -> Self {
        Self {
            max_words: DEFAULT_MAX_WORDS,
            min_words: DEFAULT_MIN_WORDS,
        }
    }
}

impl Segmenter {
    /// `max_words` is raised to at least 1 and `min_words` is capped at `max_words`.
    pub fn new(max_words: usize, min_words: usize) -> Self {
        let max_words = max_words.max(1);
        Self {
            max_words,
            min_words: min_words.min(max_words),
        }
    }

    pub fn max_words(&self) -> usize {
        self.max_words
    }

    pub fn min_words(&self) -> usize {
        self.min_words
    }

    /// Lazily split `text` into speakable chunks.
    ///
    /// Calling this twice on the same input yields the same sequence.
    pub fn segment(&self, text: &str) -> Chunks {
        let normalized = normalize(text);
        Chunks {
            sentences: split_sentences(&normalized).into_iter(),
            buffer: Vec::new(),
            max_words: self.max_words,
            min_words: self.min_words,
        }
    }
}

/// Segment with the default word bounds.
pub fn segment(text: &str) -> Chunks {
    Segmenter::default().segment(text)
}

/// Collapse ellipses into `" - "`, turn line breaks into spaces and trim.
///
/// Whitespace on either side of an ellipsis is swallowed with it.
pub fn normalize(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());

    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '.' {
            let mut end = i;
            while end < chars.len() && chars[end] == '.' {
                end += 1;
            }
            if end - i >= 2 {
                let kept = out.trim_end().len();
                out.truncate(kept);
                out.push_str(" - ");
                while end < chars.len() && chars[end].is_whitespace() {
                    end += 1;
                }
            } else {
                out.push('.');
            }
            i = end;
            continue;
        }

        match chars[i] {
            '\n' | '\r' => out.push(' '),
            c => out.push(c),
        }
        i += 1;
    }

    out.trim().to_string()
}

/// Split already-normalised text into sentence candidates.
///
/// The whitespace separating two sentences is dropped; everything else is
/// kept verbatim, so a candidate may still carry inner whitespace runs.
pub fn split_sentences(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut sentences = Vec::new();
    let mut start = 0;

    let mut i = 0;
    while i < chars.len() {
        if !chars[i].is_whitespace() {
            i += 1;
            continue;
        }

        let mut run_end = i;
        while run_end < chars.len() && chars[run_end].is_whitespace() {
            run_end += 1;
        }

        let after_terminal = i > 0 && matches!(chars[i - 1], '.' | '!' | '?');
        let before_capital = run_end < chars.len() && chars[run_end].is_ascii_uppercase();
        if after_terminal && before_capital && !is_abbreviation(&chars, i) {
            sentences.push(chars[start..i].iter().collect());
            start = run_end;
        }
        i = run_end;
    }

    if start < chars.len() {
        sentences.push(chars[start..].iter().collect());
    }
    sentences
}

/// Whether the punctuation ending just before `at` belongs to an abbreviation.
fn is_abbreviation(chars: &[char], at: usize) -> bool {
    let dotted = at >= 4
        && is_word_char(chars[at - 4])
        && chars[at - 3] == '.'
        && is_word_char(chars[at - 2]);
    let title = at >= 3
        && chars[at - 3].is_ascii_uppercase()
        && chars[at - 2].is_ascii_lowercase()
        && chars[at - 1] == '.';
    dotted || title
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Iterator over the chunks of one input text.
#[derive(Debug, Clone)]
pub struct Chunks {
    sentences: std::vec::IntoIter<String>,
    buffer: Vec<String>,
    max_words: usize,
    min_words: usize,
}

impl Iterator for Chunks {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        for sentence in self.sentences.by_ref() {
            let words: Vec<String> = sentence.split_whitespace().map(str::to_owned).collect();
            if words.is_empty() {
                continue;
            }

            if self.buffer.len() + words.len() <= self.max_words {
                self.buffer.extend(words);
            } else if self.buffer.len() >= self.min_words {
                let ready = std::mem::replace(&mut self.buffer, words);
                return Some(ready.join(" "));
            } else {
                // Too short to stand alone: accept the overflow.
                self.buffer.extend(words);
            }
        }

        if self.buffer.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.buffer).join(" "))
        }
    }
}

impl std::iter::FusedIterator for Chunks {}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn words(text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_owned).collect()
    }

    #[test]
    fn test_ellipsis_becomes_dash() {
        assert_eq!(
            normalize("Hello there. This is a test... of the system."),
            "Hello there. This is a test - of the system."
        );
        assert_eq!(normalize("Wait ..what"), "Wait - what");
        assert_eq!(normalize("  line one\nline two\r\n"), "line one line two");
    }

    #[test]
    fn test_short_text_is_single_chunk() {
        let chunks: Vec<String> = segment("Hello there. This is a test... of the system.").collect();
        assert_eq!(chunks, vec!["Hello there. This is a test - of the system.".to_string()]);
    }

    #[test]
    fn test_empty_and_whitespace_yield_nothing() {
        assert_eq!(segment("").count(), 0);
        assert_eq!(segment("   \n\t  ").count(), 0);
    }

    #[test]
    fn test_sentence_boundaries() {
        assert_eq!(
            split_sentences("It works. Does it? Yes! fine. Done"),
            vec!["It works.", "Does it?", "Yes! fine.", "Done"]
        );
    }

    #[test]
    fn test_abbreviations_do_not_split() {
        assert_eq!(
            split_sentences("Ask Mr. Smith about it. He lives in the U.S. Now he works."),
            vec!["Ask Mr. Smith about it.", "He lives in the U.S. Now he works."]
        );
        // Known approximation: three-letter titles are not recognised.
        assert_eq!(split_sentences("Ask Mrs. Smith."), vec!["Ask Mrs.", "Smith."]);
    }

    #[test]
    fn test_greedy_packing_flushes_at_max() {
        let segmenter = Segmenter::new(6, 3);
        let chunks: Vec<String> = segmenter
            .segment("One two three. Four five six. Seven eight nine. Ten.")
            .collect();
        assert_eq!(
            chunks,
            vec![
                "One two three. Four five six.".to_string(),
                "Seven eight nine. Ten.".to_string(),
            ]
        );
    }

    #[test]
    fn test_short_buffer_accepts_overflow() {
        let segmenter = Segmenter::new(5, 3);
        let chunks: Vec<String> = segmenter
            .segment("Hi there. This sentence is rather long for the limit. End of story here.")
            .collect();
        assert_eq!(
            chunks,
            vec![
                "Hi there. This sentence is rather long for the limit.".to_string(),
                "End of story here.".to_string(),
            ]
        );
    }

    #[test]
    fn test_long_sentence_is_never_split() {
        let sentence = "word ".repeat(45);
        let chunks: Vec<String> = segment(&sentence).collect();
        assert_eq!(chunks.len(), 1);
        assert_eq!(words(&chunks[0]).len(), 45);
    }

    #[test]
    fn test_segmenting_is_restartable() {
        let text = "First part here. Second part follows. Third one ends it all for now.";
        let segmenter = Segmenter::new(5, 2);
        let first: Vec<String> = segmenter.segment(text).collect();
        let second: Vec<String> = segmenter.segment(text).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_bounds_are_sanitised() {
        let segmenter = Segmenter::new(0, 10);
        assert_eq!(segmenter.max_words(), 1);
        assert_eq!(segmenter.min_words(), 1);
    }

    fn sentence_strategy(max_len: usize) -> impl Strategy<Value = String> {
        (
            "[A-Z][a-z]{2,6}",
            prop::collection::vec("[a-z]{1,7}", 0..max_len),
            prop::sample::select(vec!['.', '!', '?']),
        )
            .prop_map(|(head, tail, end)| {
                let mut sentence = head;
                for word in tail {
                    sentence.push(' ');
                    sentence.push_str(&word);
                }
                sentence.push(end);
                sentence
            })
    }

    proptest! {
        #[test]
        fn prop_words_survive_in_order(text in "[a-zA-Z .!?,\n]{0,300}") {
            let joined: Vec<String> = segment(&text).collect();
            prop_assert_eq!(words(&joined.join(" ")), words(&normalize(&text)));
        }

        #[test]
        fn prop_chunks_are_non_empty_and_respect_minimum(
            sentences in prop::collection::vec(sentence_strategy(25), 0..20),
        ) {
            let text = sentences.join(" ");
            let chunks: Vec<String> = segment(&text).collect();
            for (i, chunk) in chunks.iter().enumerate() {
                let count = words(chunk).len();
                prop_assert!(count > 0);
                if i + 1 < chunks.len() {
                    prop_assert!(count >= DEFAULT_MIN_WORDS);
                }
            }
        }

        #[test]
        fn prop_short_sentences_never_overflow(
            sentences in prop::collection::vec(sentence_strategy(10), 1..30),
        ) {
            // Sentences of at most 11 words can never push a buffer past 20
            // while it is still below the 10-word minimum.
            let text = sentences.join(" ");
            for chunk in segment(&text) {
                prop_assert!(words(&chunk).len() <= DEFAULT_MAX_WORDS);
            }
        }
    }
}
