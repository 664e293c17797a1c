/// Word-wrap `text` to `width` columns, one paragraph at a time.
///
/// Paragraphs are separated by `\n` in the source comment; each becomes one
/// or more output lines, word-wrapped independently. A line always carries
/// at least one whole word, even when that word alone exceeds `width` —
/// words are never split.
pub fn wrap_comment(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        if paragraph.is_empty() {
            lines.push(String::new());
            continue;
        }
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            if current.is_empty() {
                current.push_str(word);
            } else if current.len() + 1 + word.len() <= width {
                current.push(' ');
                current.push_str(word);
            } else {
                lines.push(std::mem::take(&mut current));
                current.push_str(word);
            }
        }
        lines.push(current);
    }
    lines
}
