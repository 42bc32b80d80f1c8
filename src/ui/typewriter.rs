//! Timed word-by-word replay of a finished reply.

use std::time::Duration;

const DELIMITERS: &[char] = &[' ', '\n', '\t', '.', ',', '!', '?', ';', ':'];

fn is_delimiter(c: char) -> bool {
    DELIMITERS.contains(&c)
}

/// Splits text into tokens of a word followed by its run of delimiters.
/// Consecutive delimiters stay together, so the tokens concatenate back to
/// the input.
pub fn tokenize(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut in_delims = false;
    for (i, c) in text.char_indices() {
        let delim = is_delimiter(c);
        if in_delims && !delim {
            tokens.push(&text[start..i]);
            start = i;
        }
        in_delims = delim;
    }
    if start < text.len() {
        tokens.push(&text[start..]);
    }
    tokens
}

/// Reveals a text one token at a time.
#[derive(Debug, Clone)]
pub struct Typewriter<'a> {
    text: &'a str,
    ends: Vec<usize>,
    shown: usize,
}

impl<'a> Typewriter<'a> {
    pub fn new(text: &'a str) -> Self {
        let mut end = 0;
        let ends = tokenize(text)
            .into_iter()
            .map(|token| {
                end += token.len();
                end
            })
            .collect();
        Self {
            text,
            ends,
            shown: 0,
        }
    }

    /// The text revealed so far.
    pub fn revealed(&self) -> &'a str {
        match self.shown {
            0 => "",
            n => &self.text[..self.ends[n - 1]],
        }
    }

    pub fn is_done(&self) -> bool {
        self.shown >= self.ends.len()
    }

    /// Reveals the next token and returns it.
    pub fn advance(&mut self) -> Option<&'a str> {
        if self.is_done() {
            return None;
        }
        let start = self.revealed().len();
        self.shown += 1;
        Some(&self.text[start..self.ends[self.shown - 1]])
    }
}

/// Feeds `text` to `sink` one token per `interval`. A zero interval reveals
/// everything at once.
pub async fn replay<F>(text: &str, interval: Duration, mut sink: F)
where
    F: FnMut(&str),
{
    let mut typewriter = Typewriter::new(text);
    if interval.is_zero() {
        while let Some(token) = typewriter.advance() {
            sink(token);
        }
        return;
    }
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    while let Some(token) = typewriter.advance() {
        ticker.tick().await;
        sink(token);
    }
}
