use crate::config::DISCORD_MESSAGE_LIMIT;

pub fn strip_bot_mentions(input: &str, bot_id: u64) -> String {
    let mention = format!("<@{}>", bot_id);
    let mention_nick = format!("<@!{}>", bot_id);

    input
        .replace(&mention, "")
        .replace(&mention_nick, "")
        .trim()
        .to_string()
}

/// Splits text into chunks that fit in a single Discord message, preferring
/// to break on a newline, then on a space.
pub fn split_for_discord(input: &str) -> Vec<String> {
    split_with_limit(input, DISCORD_MESSAGE_LIMIT)
}

fn split_with_limit(input: &str, limit: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut rest = input.trim();

    while !rest.is_empty() {
        if rest.chars().count() <= limit {
            chunks.push(rest.to_string());
            break;
        }

        let hard_end = rest
            .char_indices()
            .nth(limit)
            .map(|(idx, _)| idx)
            .unwrap_or(rest.len());
        let window = &rest[..hard_end];
        let end = window
            .rfind('\n')
            .or_else(|| window.rfind(' '))
            .filter(|&idx| idx > 0)
            .unwrap_or(hard_end);

        chunks.push(rest[..end].trim_end().to_string());
        rest = rest[end..].trim_start();
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_both_mention_forms() {
        assert_eq!(strip_bot_mentions("<@42> hello", 42), "hello");
        assert_eq!(strip_bot_mentions("hey <@!42>  ", 42), "hey");
        assert_eq!(strip_bot_mentions("<@43> hello", 42), "<@43> hello");
    }

    #[test]
    fn short_text_is_one_chunk() {
        assert_eq!(split_for_discord("  hi there "), vec!["hi there"]);
        assert!(split_for_discord("   ").is_empty());
    }

    #[test]
    fn splits_on_whitespace() {
        let chunks = split_with_limit("aaaa bbbb\ncccc dddd", 10);
        assert_eq!(chunks, vec!["aaaa bbbb", "cccc dddd"]);
    }

    #[test]
    fn hard_splits_long_words_on_char_boundaries() {
        let text = "é".repeat(25);
        let chunks = split_with_limit(&text, 10);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn chunks_respect_discord_limit() {
        let text = "word ".repeat(1000);
        let chunks = split_for_discord(&text);
        assert!(chunks.len() > 1);
        assert!(chunks
            .iter()
            .all(|c| c.chars().count() <= DISCORD_MESSAGE_LIMIT));
    }
}
