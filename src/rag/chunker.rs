//! Paragraph-aware chunking of page text.
//!
//! Each page is split on blank lines. Paragraphs that fit within
//! `max_chars` become one chunk; longer ones are word-wrapped and every
//! wrapped segment after the first is prefixed with the tail of the
//! previous segment.

use std::collections::VecDeque;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::config::ChunkingConfig;
use crate::pdf::Page;

/// A retrieval unit cut from a single page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChunk {
    pub id: usize,
    pub text: String,
    pub page: u32,
}

fn paragraph_break() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\n\s*\n").expect("paragraph pattern is valid"))
}

pub fn split_into_chunks_by_page(pages: &[Page], config: &ChunkingConfig) -> Vec<TextChunk> {
    let mut chunks = Vec::new();

    for page in pages {
        let paragraphs = paragraph_break()
            .split(&page.text)
            .map(str::trim)
            .filter(|para| !para.is_empty());

        for para in paragraphs {
            if para.chars().count() <= config.max_chars {
                chunks.push(TextChunk {
                    id: chunks.len(),
                    text: para.to_string(),
                    page: page.number,
                });
                continue;
            }

            let segments = wrap(para, config.max_chars);
            for (index, segment) in segments.iter().enumerate() {
                let text = if index > 0 && config.overlap > 0 {
                    format!("{} {}", tail_chars(&segments[index - 1], config.overlap), segment)
                } else {
                    segment.clone()
                };
                chunks.push(TextChunk {
                    id: chunks.len(),
                    text,
                    page: page.number,
                });
            }
        }
    }

    chunks
}

/// Last `count` characters of `text`, or all of it when shorter.
fn tail_chars(text: &str, count: usize) -> &str {
    let total = text.chars().count();
    if total <= count {
        return text;
    }
    let start = text
        .char_indices()
        .nth(total - count)
        .map(|(offset, _)| offset)
        .unwrap_or(0);
    &text[start..]
}

const TAB_SIZE: usize = 8;

/// Greedy word wrap with `textwrap.wrap` semantics: tabs expand to 8-column
/// stops, hyphenated words may break after a hyphen, other whitespace is
/// kept verbatim and whitespace at line edges is dropped. Words are never
/// broken, so a word longer than `width` gets a line of its own.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let expanded = expand_tabs(text);
    let mut pending: VecDeque<&str> = split_chunks(&expanded).into();
    let mut lines = Vec::new();

    while !pending.is_empty() {
        if !lines.is_empty() && pending.front().is_some_and(|chunk| is_blank(chunk)) {
            pending.pop_front();
        }

        let mut line: Vec<&str> = Vec::new();
        let mut line_len = 0usize;
        while let Some(&chunk) = pending.front() {
            let len = chunk.chars().count();
            if line_len + len > width {
                break;
            }
            line.push(chunk);
            line_len += len;
            pending.pop_front();
        }

        if line.is_empty() {
            if let Some(chunk) = pending.pop_front() {
                line.push(chunk);
            }
        }
        if line.last().is_some_and(|chunk| is_blank(chunk)) {
            line.pop();
        }
        if !line.is_empty() {
            lines.push(line.concat());
        }
    }
    lines
}

fn is_blank(chunk: &str) -> bool {
    chunk.chars().all(char::is_whitespace)
}

/// Replaces tabs with spaces up to the next tab stop. Columns restart after
/// `\n` and `\r`.
fn expand_tabs(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut column = 0usize;
    for ch in text.chars() {
        match ch {
            '\t' => {
                let pad = TAB_SIZE - column % TAB_SIZE;
                out.extend(std::iter::repeat(' ').take(pad));
                column += pad;
            }
            '\n' | '\r' => {
                out.push(ch);
                column = 0;
            }
            _ => {
                out.push(ch);
                column += 1;
            }
        }
    }
    out
}

/// Whitespace runs and words, with hyphenated words split after each
/// breakable hyphen.
fn split_chunks(text: &str) -> Vec<&str> {
    let mut chunks = Vec::new();
    for (is_space, run) in runs(text) {
        if is_space {
            chunks.push(run);
        } else {
            chunks.extend(split_hyphenated(run));
        }
    }
    chunks
}

/// A hyphen is breakable when it follows two letters (or `letter-letter`)
/// and precedes `letter letter` or `letter-letter`.
fn split_hyphenated(word: &str) -> Vec<&str> {
    let chars: Vec<(usize, char)> = word.char_indices().collect();
    let is_letter = |i: usize| {
        chars
            .get(i)
            .is_some_and(|&(_, c)| c.is_alphabetic() || c == '_')
    };
    let is_hyphen = |i: usize| chars.get(i).is_some_and(|&(_, c)| c == '-');

    let mut pieces = Vec::new();
    let mut start = 0usize;
    for (i, &(offset, ch)) in chars.iter().enumerate() {
        if ch != '-' {
            continue;
        }
        let after_word = i >= 2 && is_letter(i - 1) && is_letter(i - 2);
        let after_compound = i >= 3 && is_letter(i - 1) && is_hyphen(i - 2) && is_letter(i - 3);
        let before_word =
            is_letter(i + 1) && (is_letter(i + 2) || (is_hyphen(i + 2) && is_letter(i + 3)));

        if (after_word || after_compound) && before_word {
            let end = offset + ch.len_utf8();
            pieces.push(&word[start..end]);
            start = end;
        }
    }
    pieces.push(&word[start..]);
    pieces
}

/// Splits text into alternating runs of whitespace and non-whitespace.
fn runs(text: &str) -> impl Iterator<Item = (bool, &str)> {
    let mut rest = text;
    std::iter::from_fn(move || {
        let first = rest.chars().next()?;
        let is_space = first.is_whitespace();
        let end = rest
            .char_indices()
            .find(|(_, c)| c.is_whitespace() != is_space)
            .map(|(offset, _)| offset)
            .unwrap_or(rest.len());
        let (run, remaining) = rest.split_at(end);
        rest = remaining;
        Some((is_space, run))
    })
}
