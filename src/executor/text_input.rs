// Text preparation for `adb shell input text`.
// adb cannot type spaces literally (they become %s) and the argument passes
// through the device shell, so it is quoted like a POSIX shell word.

/// One unit of a `type_text` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextChunk {
    Text(String),
    Enter,
}

/// Split on newlines; blank lines become an Enter press. A final Enter is
/// always appended to submit the input.
pub fn chunks(text: &str) -> Vec<TextChunk> {
    let mut out: Vec<TextChunk> = text
        .split('\n')
        .map(|line| {
            if line.is_empty() {
                TextChunk::Enter
            } else {
                TextChunk::Text(sanitize_for_adb(line))
            }
        })
        .collect();
    out.push(TextChunk::Enter);
    out
}

pub fn sanitize_for_adb(text: &str) -> String {
    shell_quote(&text.replace(' ', "%s"))
}

fn shell_quote(word: &str) -> String {
    if word.is_empty() {
        return "''".into();
    }
    let safe = word
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "@%+=:,./-_".contains(c));
    if safe {
        return word.to_string();
    }
    format!("'{}'", word.replace('\'', r#"'"'"'"#))
}

/// Returns true if the text contains CJK (Chinese/Japanese/Korean) characters,
/// which `input text` cannot deliver.
pub fn contains_cjk(text: &str) -> bool {
    text.chars().any(|c| ('\u{4e00}'..='\u{9fff}').contains(&c)
        || ('\u{3040}'..='\u{309f}').contains(&c)
        || ('\u{30a0}'..='\u{30ff}').contains(&c))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spaces_and_shell_metacharacters() {
        assert_eq!(sanitize_for_adb("hello"), "hello");
        assert_eq!(sanitize_for_adb("hello world"), "hello%sworld");
        assert_eq!(sanitize_for_adb("a&b"), "'a&b'");
        assert_eq!(sanitize_for_adb("it's"), r#"'it'"'"'s'"#);
    }

    #[test]
    fn multiline_text_becomes_enter_presses() {
        assert_eq!(
            chunks("hello\nworld\n"),
            vec![
                TextChunk::Text("hello".into()),
                TextChunk::Text("world".into()),
                TextChunk::Enter,
                TextChunk::Enter,
            ]
        );
        assert_eq!(chunks("hi"), vec![TextChunk::Text("hi".into()), TextChunk::Enter]);
    }

    #[test]
    fn detects_cjk() {
        assert!(contains_cjk("打开设置"));
        assert!(!contains_cjk("open settings"));
    }
}
