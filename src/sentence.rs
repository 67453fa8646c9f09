// src/sentence.rs

//! Sentence-boundary detection over a growing answer buffer.
//!
//! `split_text` decides how much of a partially generated answer is safe to
//! show a client: the revealed prefix always ends at a sentence boundary and,
//! when the text holds more than one sentence, is at least
//! [`MIN_REVEAL_CHARS`] long. The boundary scan is a heuristic tuned for
//! mixed Chinese/English chat output, not a grammatical sentence splitter.

/// Minimum number of characters a multi-sentence reveal must reach.
pub const MIN_REVEAL_CHARS: usize = 20;

/// Characters that end a sentence on their own.
const BREAKERS: [char; 4] = ['。', '！', '？', '?'];

/// Closing quotes that belong to the sentence they follow.
const CLOSING_QUOTES: [char; 2] = ['”', '’'];

/// After a terminator+quote pair, these keep the sentence going.
const NO_BREAK_AFTER_QUOTE: [char; 5] = ['，', '。', '！', '？', '?'];

/// Whether the text currently ends on sentence-final punctuation.
///
/// Wider than the break set: a buffer ending in `.`, `;` or `:` counts as
/// finished even though those characters never split the middle of the text.
pub fn is_sentence_ended(text: &str) -> bool {
    matches!(
        text.chars().last(),
        Some('.' | '?' | '!' | ';' | ':' | '。' | '？' | '！' | '；' | '：')
    )
}

/// Split accumulated text into a revealable prefix and the remainder.
///
/// Returns `None` while nothing can be shown yet. Otherwise returns
/// `(chunk, rest)` where `chunk` ends at a sentence boundary. A text that
/// segments into a single candidate is revealed whole, and only once its
/// final character is sentence-ending; with several candidates, whole
/// sentences are taken in order until at least [`MIN_REVEAL_CHARS`]
/// characters are covered.
///
/// Calling this repeatedly on growing prefixes of the same text keeps the
/// reveal from shrinking in the common case (the cut point only depends on
/// already-complete sentences), but that is a property of the heuristic, not
/// a guarantee: a short leading sentence can be revealed whole and then
/// withheld again once more text arrives behind it.
pub fn split_text(text: &str) -> Option<(&str, &str)> {
    if text.is_empty() {
        return None;
    }
    let text = text.trim_start();
    let mut sentences = segment(text.trim_end());

    if sentences.len() == 1 {
        if is_sentence_ended(text) {
            return Some((text, ""));
        }
        return None;
    }

    // The trailing candidate is still being generated unless it already ends
    // on sentence-final punctuation.
    if let Some(last) = sentences.last() {
        if !is_sentence_ended(last) {
            sentences.pop();
        }
    }

    let mut chars_taken = 0;
    let mut bytes_taken = 0;
    for sentence in &sentences {
        chars_taken += sentence.chars().count();
        bytes_taken += sentence.len();
        if chars_taken >= MIN_REVEAL_CHARS {
            return Some((&text[..bytes_taken], &text[bytes_taken..]));
        }
    }
    None
}

/// Cut text into sentence candidates.
///
/// A break is inserted after every breaker character, after a run of six
/// ASCII dots, and after a doubled ellipsis. A closing quote right behind a
/// breaker is absorbed into the sentence, deferring the break past the quote
/// unless yet more punctuation follows it. No break is ever inserted at the
/// very end of the text, so the returned slices re-concatenate to the input.
fn segment(text: &str) -> Vec<&str> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut segments = Vec::new();
    let mut start = 0;
    let mut dot_run = 0;
    let mut ellipsis_run = 0;

    let mut i = 0;
    while i < chars.len() {
        let (pos, c) = chars[i];
        match c {
            '.' => dot_run += 1,
            '…' => ellipsis_run += 1,
            _ => {
                dot_run = 0;
                ellipsis_run = 0;
            }
        }

        let next = chars.get(i + 1).map(|&(_, n)| n);
        let mut break_end = None;

        if BREAKERS.contains(&c) {
            match next {
                Some(q) if CLOSING_QUOTES.contains(&q) => {
                    let after_quote = chars.get(i + 2).map(|&(_, n)| n);
                    if let Some(f) = after_quote {
                        if !NO_BREAK_AFTER_QUOTE.contains(&f) {
                            // Break after the quote, keeping it with its
                            // sentence.
                            let (qpos, qc) = chars[i + 1];
                            break_end = Some(qpos + qc.len_utf8());
                            i += 1;
                        }
                    }
                }
                Some(_) => break_end = Some(pos + c.len_utf8()),
                None => {}
            }
        } else if dot_run == 6 || ellipsis_run == 2 {
            match next {
                Some(q) if CLOSING_QUOTES.contains(&q) => {}
                Some(_) => {
                    break_end = Some(pos + c.len_utf8());
                    dot_run = 0;
                    ellipsis_run = 0;
                }
                None => {}
            }
        }

        if let Some(end) = break_end {
            segments.push(&text[start..end]);
            start = end;
            dot_run = 0;
            ellipsis_run = 0;
        }
        i += 1;
    }

    if start < text.len() {
        segments.push(&text[start..]);
    }
    if segments.is_empty() {
        segments.push(text);
    }
    segments
}
