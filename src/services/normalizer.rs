//! Key normalization.
//!
//! Turns raw message text into the key factoids are stored under.

/// Punctuation trimmed from the start of a key.
const LEADING_PUNCTUATION: &[char] = &['.', ',', '!', '?', ';', '"', '\''];

/// Punctuation trimmed from the end of a key. Includes `:` so "foo:" and
/// "foo" meet, but not `)` or `(`, so emoticons keep their mouths.
const TRAILING_PUNCTUATION: &[char] = &['.', ',', '!', '?', ';', ':', '"', '\''];

/// Separators that make a trailing bot nick a vocative ("cool, bot").
const VOCATIVE_SEPARATORS: &[char] = &[',', ':', ';'];

/// Canonicalizes raw text into lookup keys.
#[derive(Debug, Clone)]
pub struct KeyNormalizer {
    bot_nick: String,
}

impl KeyNormalizer {
    /// Creates a normalizer that knows the bot's own display name.
    #[must_use]
    pub fn new(bot_nick: &str) -> Self {
        Self {
            bot_nick: bot_nick.trim().to_lowercase(),
        }
    }

    /// Normalizes `raw` into a key.
    ///
    /// Lower-cases, collapses internal whitespace and trims surrounding
    /// punctuation. With `relaxed`, a trailing vocative mention of the bot
    /// ("that's so cool, bot") is removed as well. An empty result is a valid
    /// key that matches nothing.
    #[must_use]
    pub fn normalize(&self, raw: &str, relaxed: bool) -> String {
        let key = canonical(raw);
        if !relaxed {
            return key;
        }
        match self.strip_vocative(&key) {
            Some(stripped) => stripped,
            None => key,
        }
    }

    /// Removes a bare trailing bot nick from an already-normalized key.
    ///
    /// "hugs bot" becomes "hugs". Returns `None` when the key does not end
    /// with the nick as a separate word.
    #[must_use]
    pub fn strip_trailing_nick(&self, key: &str) -> Option<String> {
        let head = self.before_nick(key)?;
        if !head.ends_with(char::is_whitespace) {
            return None;
        }
        Some(canonical(head))
    }

    fn strip_vocative(&self, key: &str) -> Option<String> {
        let head = self.before_nick(key)?.trim_end();
        if !head.ends_with(VOCATIVE_SEPARATORS) {
            return None;
        }
        Some(canonical(head))
    }

    fn before_nick<'a>(&self, key: &'a str) -> Option<&'a str> {
        if self.bot_nick.is_empty() {
            return None;
        }
        key.strip_suffix(self.bot_nick.as_str())
    }
}

/// Lower-case, collapse whitespace, trim surrounding punctuation.
fn canonical(raw: &str) -> String {
    let collapsed = raw
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    collapsed
        .trim_start_matches(|c: char| LEADING_PUNCTUATION.contains(&c) || c.is_whitespace())
        .trim_end_matches(|c: char| TRAILING_PUNCTUATION.contains(&c) || c.is_whitespace())
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn normalizer() -> KeyNormalizer {
        KeyNormalizer::new("Bot")
    }

    #[test_case("Hello", "hello" ; "lowercases")]
    #[test_case("  many   spaces\there ", "many spaces here" ; "collapses whitespace")]
    #[test_case("lol!!!", "lol" ; "trailing bangs")]
    #[test_case("...what?", "what" ; "leading dots")]
    #[test_case("that's so cool.", "that's so cool" ; "keeps inner apostrophe")]
    #[test_case(":)", ":)" ; "keeps emoticon")]
    #[test_case("foo:", "foo" ; "trailing colon")]
    #[test_case("?!", "" ; "all punctuation")]
    fn test_normalize_strict(raw: &str, expected: &str) {
        assert_eq!(normalizer().normalize(raw, false), expected);
    }

    #[test]
    fn test_strict_keeps_bot_name() {
        assert_eq!(
            normalizer().normalize("that's so cool, bot", false),
            "that's so cool, bot"
        );
    }

    #[test_case("that's so cool, bot", "that's so cool" ; "comma")]
    #[test_case("that's so cool: BOT!", "that's so cool" ; "colon and bang")]
    #[test_case("thanks ;bot", "thanks" ; "semicolon")]
    #[test_case("hugs bot", "hugs bot" ; "bare mention is not vocative")]
    #[test_case("I love my robot", "i love my robot" ; "suffix inside a word")]
    #[test_case(", bot", "bot" ; "only the nick")]
    fn test_normalize_relaxed(raw: &str, expected: &str) {
        assert_eq!(normalizer().normalize(raw, true), expected);
    }

    #[test]
    fn test_strip_trailing_nick() {
        let n = normalizer();
        assert_eq!(n.strip_trailing_nick("hugs bot"), Some("hugs".to_string()));
        assert_eq!(n.strip_trailing_nick("robot"), None);
        assert_eq!(n.strip_trailing_nick("bot"), None);
        assert_eq!(n.strip_trailing_nick("hugs alice"), None);
    }

    #[test]
    fn test_empty_nick_never_strips() {
        let n = KeyNormalizer::new("  ");
        assert_eq!(n.normalize("cool, ", true), "cool");
        assert_eq!(n.strip_trailing_nick("hugs "), None);
    }
}
