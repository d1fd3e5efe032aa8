// ============================================================
// Layer 4 — Sentence Windower
// ============================================================
// Splits a sentence into fixed-width context windows, one per
// word, each centred on that word.
//
// Why windows?
//   The model only ever sees WINDOW_SIZE (= 5) source tokens.
//   To translate a whole sentence we slide a 5-token window
//   over it and decode each window separately.
//
// The windower is a small state machine:
//
//   Seed     seq = [_BOS, _BOS]
//   Words    append words until seq is full, then for every
//            further word: emit seq, drop its head, append word
//   Pad      right-pad seq with _EOS to WINDOW_SIZE, emit it
//   Trailing slide seq once more per remaining word (at most
//            WINDOW_SIZE / 2 times), appending _EOS, emitting
//            after each slide
//   Done
//
// Example with "a b c d e f":
//   _BOS _BOS a    b    c        (centre: a)
//   _BOS a    b    c    d        (centre: b)
//   a    b    c    d    e        (centre: c)
//   b    c    d    e    f        (centre: d, padded window)
//   c    d    e    f    _EOS     (centre: e, trailing)
//   d    e    f    _EOS _EOS     (centre: f, trailing)
//
// The decoder reproduces reference output only if this order
// and these fillers are reproduced exactly.
//
// Reference: Rust Book §13 (Iterators)

use std::collections::VecDeque;
use std::fmt;

use crate::domain::tokens::{BOS_TOKEN, EOS_TOKEN, WINDOW_SIZE};

/// Exactly WINDOW_SIZE tokens of one decoding context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    tokens: Vec<String>,
}

impl Window {
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// The window as a space-joined sentence, ready for id lookup.
    pub fn to_sentence(&self) -> String {
        self.tokens.join(" ")
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sentence())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Words,
    Trailing { remaining: usize },
    Done,
}

/// Iterator over the windows of one sentence. Consumed once.
pub struct Windower<'a> {
    words:      std::vec::IntoIter<&'a str>,
    word_count: usize,
    seq:        VecDeque<String>,
    phase:      Phase,
}

/// Segment `sentence` into context windows.
pub fn segment(sentence: &str) -> Windower<'_> {
    let words: Vec<&str> = sentence.split_whitespace().collect();
    let word_count = words.len();

    let mut seq = VecDeque::with_capacity(WINDOW_SIZE + 1);
    seq.push_back(BOS_TOKEN.to_string());
    seq.push_back(BOS_TOKEN.to_string());

    Windower { words: words.into_iter(), word_count, seq, phase: Phase::Words }
}

impl Windower<'_> {
    fn snapshot(&self) -> Window {
        Window { tokens: self.seq.iter().cloned().collect() }
    }

    /// Drop the head of the window and append `token`.
    fn slide(&mut self, token: &str) {
        self.seq.pop_front();
        self.seq.push_back(token.to_string());
    }

    fn trailing_count(&self) -> usize {
        self.word_count.saturating_sub(1).min(WINDOW_SIZE / 2)
    }
}

impl Iterator for Windower<'_> {
    type Item = Window;

    fn next(&mut self) -> Option<Window> {
        match self.phase {
            Phase::Words => {
                while let Some(word) = self.words.next() {
                    if self.seq.len() < WINDOW_SIZE {
                        self.seq.push_back(word.to_string());
                    } else {
                        let full = self.snapshot();
                        self.slide(word);
                        return Some(full);
                    }
                }
                // Words exhausted: pad and emit the final window
                while self.seq.len() < WINDOW_SIZE {
                    self.seq.push_back(EOS_TOKEN.to_string());
                }
                self.phase = Phase::Trailing { remaining: self.trailing_count() };
                Some(self.snapshot())
            }
            Phase::Trailing { remaining: 0 } => {
                self.phase = Phase::Done;
                None
            }
            Phase::Trailing { remaining } => {
                self.slide(EOS_TOKEN);
                self.phase = Phase::Trailing { remaining: remaining - 1 };
                Some(self.snapshot())
            }
            Phase::Done => None,
        }
    }
}
