use std::io::Write;

use crate::error::{EmitErrorKind, Result};
use crate::node::{Mapping, Node};
use crate::wrap::wrap_comment;

/// Tunables for an [`Encoder`].
#[derive(Clone, Debug)]
pub struct EncoderConfig {
    /// Number of spaces per indentation level. Clamped to a minimum of 2.
    pub indent_step: usize,
    /// Column at which comment paragraphs are word-wrapped.
    pub comment_wrap_column: usize,
    /// Surround decorated (commented/templated) nodes with blank lines.
    pub blank_line_surround: bool,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        EncoderConfig { indent_step: 2, comment_wrap_column: 80, blank_line_surround: false }
    }
}

impl EncoderConfig {
    fn step(&self) -> usize {
        self.indent_step.max(2)
    }
}

/// Serializes a [`Node`] tree to YAML text.
///
/// Once a call to [`Encoder::encode_to`] hits an I/O error from the
/// underlying writer, that error is cached: every later call returns it
/// immediately without attempting to write anything further.
pub struct Encoder {
    config: EncoderConfig,
    sticky: std::cell::RefCell<Option<EmitErrorKind>>,
}

impl Encoder {
    pub fn new(config: EncoderConfig) -> Self {
        Encoder { config, sticky: std::cell::RefCell::new(None) }
    }

    /// Render `node` as a standalone YAML document (string form).
    ///
    /// This never fails: the tree is walked purely in memory. Use
    /// [`Encoder::encode_to`] to write the result to a sink and observe
    /// sticky-error behavior.
    pub fn render(&self, node: &Node) -> String {
        let mut out = String::new();
        out.push_str("---\n");
        render_container_child(&mut out, &self.config, 0, node, true);
        out
    }

    /// Render `node` and write it to `writer`.
    pub fn encode_to<W: Write>(&self, writer: &mut W, node: &Node) -> Result<()> {
        if let Some(kind) = self.sticky.borrow().clone() {
            return Err(kind.into());
        }
        let text = self.render(node);
        match writer.write_all(text.as_bytes()) {
            Ok(()) => Ok(()),
            Err(e) => {
                *self.sticky.borrow_mut() = Some(EmitErrorKind::Io);
                Err(e.into())
            }
        }
    }
}

fn spaces(n: usize) -> String {
    " ".repeat(n)
}

/// Emit the comment lines and the opening template-block marker for a
/// decorated node, at `indent` columns.
fn render_open_annotation(out: &mut String, cfg: &EncoderConfig, indent: usize, node: &Node) {
    let ann = node.annotation();
    if let Some(comment) = ann.comment() {
        for line in wrap_comment(comment, cfg.comment_wrap_column.saturating_sub(2).max(1)) {
            out.push_str(&spaces(indent));
            if line.is_empty() {
                out.push('#');
            } else {
                out.push_str("# ");
                out.push_str(&line);
            }
            out.push('\n');
        }
    }
    if let Some(block) = ann.template_block() {
        out.push_str(&spaces(indent));
        out.push_str("{{- ");
        out.push_str(block);
        out.push_str(" }}\n");
    }
}

fn render_close_annotation(out: &mut String, indent: usize, node: &Node) {
    if node.annotation().template_block().is_some() {
        out.push_str(&spaces(indent));
        out.push_str("{{- end }}\n");
    }
}

/// Render `node` as the value belonging to a mapping key or the document
/// root, at `indent` columns, with `label` already including its trailing
/// `:` (empty for the document root).
fn render_labeled_value(out: &mut String, cfg: &EncoderConfig, indent: usize, label: &str, node: &Node) {
    match node.as_scalar() {
        Some(s) if !s.contains('\n') => {
            out.push_str(&spaces(indent));
            if label.is_empty() {
                out.push_str(s);
            } else {
                out.push_str(label);
                out.push(' ');
                out.push_str(s);
            }
            out.push('\n');
        }
        Some(s) => {
            out.push_str(&spaces(indent));
            if label.is_empty() {
                out.push_str("|-\n");
            } else {
                out.push_str(label);
                out.push_str(" |-\n");
            }
            let step = cfg.step();
            for line in s.split('\n') {
                out.push_str(&spaces(indent + step));
                out.push_str(line);
                out.push('\n');
            }
        }
        None => {
            if let Some(m) = node.as_mapping() {
                if m.is_empty() {
                    out.push_str(&spaces(indent));
                    out.push_str(label);
                    out.push_str(if label.is_empty() { "{}\n" } else { " {}\n" });
                    return;
                }
                out.push_str(&spaces(indent));
                if !label.is_empty() {
                    out.push_str(label);
                    out.push('\n');
                    render_mapping(out, cfg, indent + cfg.step(), m);
                } else {
                    render_mapping(out, cfg, indent, m);
                }
                return;
            }
            if let Some(seq) = node.as_sequence() {
                if seq.is_empty() {
                    out.push_str(&spaces(indent));
                    out.push_str(label);
                    out.push_str(if label.is_empty() { "[]\n" } else { " []\n" });
                    return;
                }
                if label.is_empty() {
                    render_list(out, cfg, indent, seq);
                } else {
                    out.push_str(&spaces(indent));
                    out.push_str(label);
                    out.push('\n');
                    render_list(out, cfg, indent + cfg.step(), seq);
                }
                return;
            }
            unreachable!("Node is scalar, mapping, or sequence")
        }
    }
}

fn render_mapping(out: &mut String, cfg: &EncoderConfig, indent: usize, map: &Mapping) {
    for (i, (key, child)) in map.iter().enumerate() {
        render_container_child_entry(out, cfg, indent, i == 0, &format!("{}:", key), child);
    }
}

/// Shared blank-line-surround bookkeeping for one entry of a mapping or the
/// top level of a sequence.
fn render_container_child_entry(
    out: &mut String,
    cfg: &EncoderConfig,
    indent: usize,
    is_first: bool,
    label: &str,
    child: &Node,
) {
    let decorated = !child.annotation().is_empty();
    if cfg.blank_line_surround && decorated && !is_first {
        out.push('\n');
    }
    render_open_annotation(out, cfg, indent, child);
    render_labeled_value(out, cfg, indent, label, child);
    render_close_annotation(out, indent, child);
}

/// Render the document root: like a mapping/sequence entry with an empty
/// label, but the leading blank-line rule never applies (nothing precedes
/// the document).
fn render_container_child(out: &mut String, cfg: &EncoderConfig, indent: usize, node: &Node, _is_root: bool) {
    render_open_annotation(out, cfg, indent, node);
    render_labeled_value(out, cfg, indent, "", node);
    render_close_annotation(out, indent, node);
}

/// Render a sequence whose own `-` markers start at column `col`.
///
/// The first element, if it is itself a non-empty sequence, stacks its `-`
/// marker onto the same physical line (`- - - ...`) recursively; only the
/// innermost list's first element carries the accumulated stack. Every
/// other element — at any level — starts a fresh line indented to its
/// own list's marker column.
fn render_list(out: &mut String, cfg: &EncoderConfig, col: usize, items: &[Node]) {
    out.push_str(&spaces(col));
    render_list_chain(out, cfg, col, items);
}

/// Writes the `- ` marker and first element of `items`, stacking into any
/// nested sequence, then this level's remaining siblings. Assumes the
/// cursor is already positioned at column `col` with no trailing newline.
fn render_list_chain(out: &mut String, cfg: &EncoderConfig, col: usize, items: &[Node]) {
    out.push_str("- ");
    let head = &items[0];
    let head_col = col + 2;
    match head.as_sequence() {
        Some(inner) if !inner.is_empty() => render_list_chain(out, cfg, head_col, inner),
        _ => render_seq_element_value(out, cfg, head_col, head),
    }
    for item in items.iter().skip(1) {
        let decorated = !item.annotation().is_empty();
        if cfg.blank_line_surround && decorated {
            out.push('\n');
        }
        render_open_annotation(out, cfg, col, item);
        out.push_str(&spaces(col));
        out.push_str("- ");
        render_seq_element_value(out, cfg, col + 2, item);
        render_close_annotation(out, col, item);
    }
}

/// Writes the content that follows a freshly-printed `- ` marker, given the
/// cursor sits at column `col` with nothing on the line yet besides the
/// marker. Always leaves the cursor at the start of a new line.
fn render_seq_element_value(out: &mut String, cfg: &EncoderConfig, col: usize, node: &Node) {
    match node.as_scalar() {
        Some(s) if !s.contains('\n') => {
            out.push_str(s);
            out.push('\n');
        }
        Some(s) => {
            out.push_str("|-\n");
            let step = cfg.step();
            for line in s.split('\n') {
                out.push_str(&spaces(col + step));
                out.push_str(line);
                out.push('\n');
            }
        }
        None => {
            if let Some(m) = node.as_mapping() {
                if m.is_empty() {
                    out.push_str("{}\n");
                } else {
                    out.push('\n');
                    render_mapping(out, cfg, col, m);
                }
                return;
            }
            if let Some(seq) = node.as_sequence() {
                if seq.is_empty() {
                    out.push_str("[]\n");
                } else {
                    render_list_chain(out, cfg, col, seq);
                }
                return;
            }
            unreachable!("Node is scalar, mapping, or sequence")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Mapping, Node};

    fn enc(cfg: EncoderConfig) -> Encoder {
        Encoder::new(cfg)
    }

    #[test]
    fn scalar_mapping_entry() {
        let mut m = Mapping::new();
        m.insert("Answer", Node::scalar("42"));
        let doc = Node::mapping(m);
        let out = enc(EncoderConfig::default()).render(&doc);
        assert_eq!(out, "---\nAnswer: 42\n");
    }

    #[test]
    fn literal_block_scalar() {
        let mut m = Mapping::new();
        m.insert("Scalar", Node::scalar("foo\nbar\nbaz"));
        let doc = Node::mapping(m);
        let cfg = EncoderConfig { indent_step: 4, ..Default::default() };
        let out = enc(cfg).render(&doc);
        assert_eq!(out, "---\nScalar: |-\n    foo\n    bar\n    baz\n");
    }

    #[test]
    fn decorated_and_wrapped_comment() {
        let mut m = Mapping::new();
        m.insert("Scalar", Node::scalar("42").with_comment("Many\n\nlines"));
        let doc = Node::mapping(m);
        let out = enc(EncoderConfig::default()).render(&doc);
        assert_eq!(out, "---\n# Many\n#\n# lines\nScalar: 42\n");
    }

    #[test]
    fn nested_sequence_stacking() {
        let inner_inner = vec![Node::scalar("1"), Node::scalar("2")];
        let inner = vec![Node::sequence(inner_inner)];
        let outer = vec![Node::sequence(inner)];
        let mut m = Mapping::new();
        m.insert("List", Node::sequence(outer));
        let doc = Node::mapping(m);
        let cfg = EncoderConfig { indent_step: 2, ..Default::default() };
        let out = enc(cfg).render(&doc);
        assert_eq!(out, "---\nList:\n  - - - 1\n      - 2\n");
    }

    #[test]
    fn bare_nested_sequence_matches_spec_string() {
        let inner_inner = vec![Node::scalar("1"), Node::scalar("2")];
        let inner = vec![Node::sequence(inner_inner)];
        let outer = vec![Node::sequence(inner)];
        let mut out = String::new();
        render_list(&mut out, &EncoderConfig::default(), 0, &outer);
        assert_eq!(out, "- - - 1\n    - 2\n");
    }

    #[test]
    fn template_block_wraps_node() {
        let mut m = Mapping::new();
        m.insert("Feature", Node::scalar("on").with_template_block("if .Values.enabled"));
        let doc = Node::mapping(m);
        let out = enc(EncoderConfig::default()).render(&doc);
        assert_eq!(out, "---\n{{- if .Values.enabled }}\nFeature: on\n{{- end }}\n");
    }

    #[test]
    fn mapping_sort_by_name_reorders() {
        let mut m = Mapping::new();
        m.insert("b", Node::scalar("2"));
        m.insert("a", Node::scalar("1"));
        m.sort_by_name();
        let keys: Vec<&str> = m.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn blank_line_surrounds_decorated_siblings() {
        let mut m = Mapping::new();
        m.insert("first", Node::scalar("1"));
        m.insert("second", Node::scalar("2").with_comment("note"));
        m.insert("third", Node::scalar("3"));
        let doc = Node::mapping(m);
        let cfg = EncoderConfig { blank_line_surround: true, ..Default::default() };
        let out = enc(cfg).render(&doc);
        assert_eq!(out, "---\nfirst: 1\n\n# note\nsecond: 2\nthird: 3\n");
    }

    #[test]
    fn empty_mapping_and_sequence_render_inline() {
        let mut m = Mapping::new();
        m.insert("m", Node::mapping(Mapping::new()));
        m.insert("s", Node::sequence(Vec::new()));
        let doc = Node::mapping(m);
        let out = enc(EncoderConfig::default()).render(&doc);
        assert_eq!(out, "---\nm: {}\ns: []\n");
    }

    #[test]
    fn sticky_error_short_circuits_after_first_failure() {
        struct FailingWriter;
        impl Write for FailingWriter {
            fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::Other, "boom"))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }
        let mut m = Mapping::new();
        m.insert("a", Node::scalar("1"));
        let doc = Node::mapping(m);
        let encoder = enc(EncoderConfig::default());
        let mut w = FailingWriter;
        assert!(encoder.encode_to(&mut w, &doc).is_err());
        // second call must not attempt to write again; it just replays the
        // cached error.
        assert!(encoder.encode_to(&mut w, &doc).is_err());
    }
}
