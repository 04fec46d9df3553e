// SPDX-License-Identifier: MIT OR Apache-2.0
//! Greedy word wrapping for fixed-width screenplay text.

/// Default width of dialog lines
pub const DIALOG_WIDTH: usize = 50;

/// Default width of action lines
pub const ACTION_WIDTH: usize = 65;

/// Wrap `text` into lines shorter than `width` characters.
///
/// Words are split on whitespace and appended while the line so far (with its
/// trailing space) plus the next word stays below `width`. A word longer than
/// the width gets a line of its own. Width counts `char`s, not bytes.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        if current_len + word_len >= width && !current.is_empty() {
            lines.push(current.trim_end().to_string());
            current.clear();
            current_len = 0;
        }
        current.push_str(word);
        current.push(' ');
        current_len += word_len + 1;
    }

    if !current.is_empty() {
        lines.push(current.trim_end().to_string());
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_width_boundary() {
        let short = format!("{} {}", "a".repeat(24), "b".repeat(24));
        assert_eq!(short.chars().count(), 49);
        assert_eq!(wrap(&short, DIALOG_WIDTH), vec![short.clone()]);

        let long = format!("{} {}", "a".repeat(25), "b".repeat(25));
        assert_eq!(long.chars().count(), 51);
        assert_eq!(wrap(&long, DIALOG_WIDTH), vec!["a".repeat(25), "b".repeat(25)]);
    }

    #[test]
    fn test_overlong_word_gets_own_line() {
        let word = "x".repeat(70);
        assert_eq!(wrap(&word, DIALOG_WIDTH), vec![word.clone()]);
        assert_eq!(
            wrap(&format!("hi {word} there"), DIALOG_WIDTH),
            vec!["hi".to_string(), word, "there".to_string()]
        );
    }

    #[test]
    fn test_whitespace_is_collapsed() {
        assert_eq!(wrap("  one \n two\t three  ", ACTION_WIDTH), vec!["one two three"]);
        assert!(wrap("   ", ACTION_WIDTH).is_empty());
        assert!(wrap("", ACTION_WIDTH).is_empty());
    }

    #[test]
    fn test_width_counts_chars() {
        // 10 Thai characters take 30 bytes
        let word = "สวัสดีครับ";
        assert_eq!(word.chars().count(), 10);
        let text = [word; 4].join(" ");
        assert_eq!(wrap(&text, DIALOG_WIDTH).len(), 1);
    }
}
