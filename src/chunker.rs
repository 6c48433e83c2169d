//! Splitting long replies into transport-sized messages

use std::num::NonZeroUsize;

/// Telegram rejects texts over 4096 characters; stay a little below
pub const DEFAULT_MAX_MESSAGE_LEN: NonZeroUsize = match NonZeroUsize::new(4000) {
    Some(n) => n,
    None => unreachable!(),
};

/// Split `text` into consecutive pieces of at most `max_len` characters.
///
/// Cuts are hard character-count cuts (never inside a code point, but with
/// no regard for word or sentence boundaries). Empty input yields no chunks.
pub fn chunk(text: &str, max_len: NonZeroUsize) -> Vec<&str> {
    let max_len = max_len.get();
    let mut chunks = Vec::with_capacity(text.len() / max_len + 1);
    let mut rest = text;

    while !rest.is_empty() {
        let cut = rest
            .char_indices()
            .nth(max_len)
            .map_or(rest.len(), |(idx, _)| idx);
        let (head, tail) = rest.split_at(cut);
        chunks.push(head);
        rest = tail;
    }

    chunks
}
