//! Text cleanup applied after extraction.
//!
//! Pages rendered from one template often leave the same boilerplate at the
//! start or end of every extracted text (a blog name, a share bar, a
//! signature). [`remove_common_text`] strips whatever prefix and suffix all
//! texts share.

use crate::blog::Article;

/// Sentence-closing marks kept when they follow the trimmed suffix closely.
const SENTENCE_CLOSERS: [char; 5] = ['。', '！', '♪', '」', '）'];

/// How far past the suffix cut a sentence-closing mark is looked for.
const MAX_TAIL_OF_SENTENCE_LEN: usize = 5;

fn can_ignore(c: char) -> bool {
    matches!(c, ' ' | '\u{3000}' | '。')
}

/// Next position after `current` that holds a non-ignorable character.
///
/// Returns `chars.len()` when none is left. Start from `-1` to find the
/// first position.
pub fn next_index(current: isize, chars: &[char]) -> isize {
    let mut next = current + 1;
    while let Some(&c) = usize::try_from(next).ok().and_then(|i| chars.get(i))
        && can_ignore(c)
    {
        next += 1;
    }
    next
}

/// Previous position before `current` that holds a non-ignorable character.
///
/// Returns `-1` when none is left. Start from `chars.len()` to find the last
/// position.
pub fn prev_index(current: isize, chars: &[char]) -> isize {
    let mut prev = current - 1;
    while let Some(&c) = usize::try_from(prev).ok().and_then(|i| chars.get(i))
        && can_ignore(c)
    {
        prev -= 1;
    }
    prev
}

fn char_at(chars: &[char], index: isize) -> Option<char> {
    usize::try_from(index).ok().and_then(|i| chars.get(i)).copied()
}

/// Walks all texts in lockstep while they agree.
///
/// Returns the per-text cursor where they stopped agreeing and the number of
/// characters matched.
fn common_cursor(texts: &[Vec<char>], start: impl Fn(&[char]) -> isize, step: fn(isize, &[char]) -> isize) -> (Vec<isize>, usize) {
    let mut cursors: Vec<isize> = texts
        .iter()
        .map(|text| step(start(text.as_slice()), text.as_slice()))
        .collect();
    let mut count = 0;

    loop {
        let Some(c) = char_at(&texts[0], cursors[0]) else { break };
        let agree = texts
            .iter()
            .zip(&cursors)
            .all(|(text, &cursor)| char_at(text, cursor) == Some(c));
        if !agree {
            break;
        }
        for (cursor, text) in cursors.iter_mut().zip(texts) {
            *cursor = step(*cursor, text.as_slice());
        }
        count += 1;
    }

    (cursors, count)
}

/// Removes the prefix and suffix shared by all `texts`.
///
/// Spaces, ideographic spaces and ideographic full stops are skipped while
/// matching and removed along with the affix. An affix is only stripped when
/// more than `min_common_characters` characters matched. A sentence-closing
/// mark within a few characters after the suffix cut is kept.
///
/// # Example
///
/// ```rust
/// use blogsift_core::postprocess::remove_common_text;
///
/// let texts = ["My Blog: first post. Share", "My Blog: second post. Share"];
/// assert_eq!(remove_common_text(&texts, 0), vec!["first", "second"]);
/// ```
pub fn remove_common_text<S: AsRef<str>>(texts: &[S], min_common_characters: usize) -> Vec<String> {
    if texts.len() <= 1 {
        return texts.iter().map(|text| text.as_ref().to_string()).collect();
    }

    let chars: Vec<Vec<char>> = texts.iter().map(|text| text.as_ref().chars().collect()).collect();
    let (starts, start_count) = common_cursor(&chars, |_| -1, next_index);
    let (ends, end_count) = common_cursor(&chars, |text| text.len() as isize, prev_index);
    tracing::trace!(start_count, end_count, "common affixes");

    chars
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let len = text.len() as isize;
            let start = if start_count > min_common_characters { starts[i] } else { 0 };
            let mut end = if end_count > min_common_characters { ends[i] + 1 } else { len };
            if start >= end {
                return String::new();
            }

            let tail = &text[end.clamp(0, len) as usize..];
            let closer = tail.iter().position(|c| SENTENCE_CLOSERS.contains(c));
            if let Some(offset) = closer
                && offset < MAX_TAIL_OF_SENTENCE_LEN
            {
                end += offset as isize + 1;
            }

            let start = start.clamp(0, len) as usize;
            let end = end.clamp(0, len) as usize;
            text[start..end].iter().collect::<String>().trim().to_string()
        })
        .collect()
}

/// Strips the text shared by all article contents, in place.
pub fn cleanup_articles(articles: &mut [Article], min_common_characters: usize) {
    let contents: Vec<&str> = articles.iter().map(|article| article.content.as_str()).collect();
    let cleaned = remove_common_text(&contents, min_common_characters);
    for (article, content) in articles.iter_mut().zip(cleaned) {
        article.content = content;
    }
}
