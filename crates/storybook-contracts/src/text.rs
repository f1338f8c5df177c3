/// Request-size ceiling of the translation service, in characters.
pub const TRANSLATION_CHUNK_CHARS: usize = 4500;

/// Per-request text limit of the speech service, in characters.
pub const SPEECH_PIECE_CHARS: usize = 100;

/// Splits `text` into contiguous pieces of at most `max_chars` characters.
///
/// Boundaries fall every `max_chars` characters regardless of words, so a
/// chunk may end mid-word. Concatenating the chunks gives back `text`.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<&str> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut count = 0;
    for (idx, _) in text.char_indices() {
        if count == max_chars {
            chunks.push(&text[start..idx]);
            start = idx;
            count = 0;
        }
        count += 1;
    }
    if start < text.len() {
        chunks.push(&text[start..]);
    }
    chunks
}

/// Joins translated chunks with a single space, in order.
pub fn join_chunks(chunks: &[String]) -> String {
    chunks.join(" ")
}

/// Packs whitespace-separated words into pieces of at most `max_chars`
/// characters. Words longer than the limit are split across pieces.
pub fn pack_words(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        for part in chunk_text(word, max_chars) {
            let part_len = part.chars().count();
            let needed = if current.is_empty() {
                part_len
            } else {
                current_len + 1 + part_len
            };
            if needed > max_chars && !current.is_empty() {
                pieces.push(std::mem::take(&mut current));
                current_len = 0;
            }
            if !current.is_empty() {
                current.push(' ');
                current_len += 1;
            }
            current.push_str(part);
            current_len += part_len;
        }
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::{chunk_text, join_chunks, pack_words, TRANSLATION_CHUNK_CHARS};

    #[test]
    fn short_text_is_a_single_identical_chunk() {
        let text = "Once upon a time there was a dog.";
        assert_eq!(chunk_text(text, TRANSLATION_CHUNK_CHARS), vec![text]);

        let exact = "a".repeat(TRANSLATION_CHUNK_CHARS);
        assert_eq!(chunk_text(&exact, TRANSLATION_CHUNK_CHARS), vec![exact.as_str()]);
    }

    #[test]
    fn empty_text_has_no_chunks() {
        assert!(chunk_text("", TRANSLATION_CHUNK_CHARS).is_empty());
    }

    #[test]
    fn long_text_chunk_count_is_ceiling_of_length_over_limit() {
        for len in [4501usize, 9000, 9001, 13_500, 20_000] {
            let text: String = "abcdefghij".chars().cycle().take(len).collect();
            let chunks = chunk_text(&text, TRANSLATION_CHUNK_CHARS);
            assert_eq!(chunks.len(), len.div_ceil(TRANSLATION_CHUNK_CHARS), "len={len}");
            assert!(chunks
                .iter()
                .all(|chunk| chunk.chars().count() <= TRANSLATION_CHUNK_CHARS));
            assert_eq!(chunks.concat(), text);
        }
    }

    #[test]
    fn chunks_count_characters_not_bytes() {
        let text = "నమస్కారం".repeat(700);
        let chars = text.chars().count();
        let chunks = chunk_text(&text, TRANSLATION_CHUNK_CHARS);
        assert_eq!(chunks.len(), chars.div_ceil(TRANSLATION_CHUNK_CHARS));
        assert_eq!(chunks[0].chars().count(), TRANSLATION_CHUNK_CHARS);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn chunk_boundaries_may_split_words() {
        assert_eq!(chunk_text("hello world", 4), vec!["hell", "o wo", "rld"]);
    }

    #[test]
    fn join_uses_single_space_in_order() {
        let chunks = vec!["uno".to_string(), "dos".to_string(), "tres".to_string()];
        assert_eq!(join_chunks(&chunks), "uno dos tres");
    }

    #[test]
    fn pack_words_respects_limit_and_keeps_word_order() {
        let text = "the quick brown fox jumps over the lazy dog";
        let pieces = pack_words(text, 10);
        assert_eq!(
            pieces,
            vec!["the quick", "brown fox", "jumps over", "the lazy", "dog"]
        );
        assert!(pieces.iter().all(|piece| piece.chars().count() <= 10));
    }

    #[test]
    fn pack_words_splits_overlong_words() {
        let pieces = pack_words("a supercalifragilistic b", 8);
        assert_eq!(pieces, vec!["a", "supercal", "ifragili", "stic b"]);
    }

    #[test]
    fn pack_words_of_blank_text_is_empty() {
        assert!(pack_words("  \n\t ", 100).is_empty());
    }
}
