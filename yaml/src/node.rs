use std::collections::BTreeMap;

/// Comment and template-block metadata shared by every node kind.
///
/// The upstream tooling this crate's design is based on exposed two
/// differently-named accessors (`Block`/`Condition`) for this same slot;
/// we keep a single name, `template_block`, for both reading and writing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Annotation {
    comment: Option<String>,
    template_block: Option<String>,
}

impl Annotation {
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn template_block(&self) -> Option<&str> {
        self.template_block.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.comment.is_none() && self.template_block.is_none()
    }
}

/// An ordered mapping: entries keep insertion order unless explicitly sorted.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mapping {
    entries: Vec<(String, Node)>,
}

impl Mapping {
    pub fn new() -> Self {
        Mapping { entries: Vec::new() }
    }

    /// Insert an entry, appending it at the end of the current order.
    ///
    /// A pre-existing entry with the same name is replaced in place so
    /// order is only disturbed by genuinely new keys.
    pub fn insert(&mut self, name: impl Into<String>, value: Node) -> &mut Self {
        let name = name.into();
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == name) {
            slot.1 = value;
        } else {
            self.entries.push((name, value));
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&Node> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.entries.iter_mut().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, Node)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Explicit opt-in reorder: entries are sorted lexicographically by name.
    ///
    /// Insertion order is the default everywhere else in this crate; this
    /// is the only place ordering is disturbed, and only when called.
    pub fn sort_by_name(&mut self) -> &mut Self {
        self.entries.sort_by(|a, b| a.0.cmp(&b.0));
        self
    }
}

impl<'a> IntoIterator for &'a Mapping {
    type Item = &'a (String, Node);
    type IntoIter = std::slice::Iter<'a, (String, Node)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// A plain, homogeneous-ish ordered list of nodes.
pub type Sequence = Vec<Node>;

#[derive(Clone, Debug, PartialEq)]
enum NodeKind {
    Scalar(String),
    Sequence(Sequence),
    Mapping(Mapping),
}

/// A single node in the tree handed to [`crate::Encoder`].
///
/// Every node may carry an [`Annotation`] (comment and/or template block)
/// regardless of its kind. The encoder borrows the tree; nothing here
/// mutates during emission.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    kind: NodeKind,
    annotation: Annotation,
}

impl Node {
    pub fn scalar(value: impl Into<String>) -> Self {
        Node { kind: NodeKind::Scalar(value.into()), annotation: Annotation::default() }
    }

    pub fn sequence(items: Sequence) -> Self {
        Node { kind: NodeKind::Sequence(items), annotation: Annotation::default() }
    }

    pub fn mapping(map: Mapping) -> Self {
        Node { kind: NodeKind::Mapping(map), annotation: Annotation::default() }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.annotation.comment = Some(comment.into());
        self
    }

    pub fn with_template_block(mut self, block: impl Into<String>) -> Self {
        self.annotation.template_block = Some(block.into());
        self
    }

    pub fn annotation(&self) -> &Annotation {
        &self.annotation
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self.kind, NodeKind::Scalar(_))
    }

    pub fn is_composite(&self) -> bool {
        !self.is_scalar()
    }

    pub fn as_scalar(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&Sequence> {
        match &self.kind {
            NodeKind::Sequence(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match &self.kind {
            NodeKind::Mapping(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_mapping_mut(&mut self) -> Option<&mut Mapping> {
        match &mut self.kind {
            NodeKind::Mapping(m) => Some(m),
            _ => None,
        }
    }

    /// Build a tree from a [`serde_yaml::Value`]-shaped document, with no
    /// annotations set on any node. Callers decorate specific nodes
    /// afterwards by walking the resulting tree.
    pub fn from_value(value: &serde_yaml::Value) -> Node {
        match value {
            serde_yaml::Value::Null => Node::scalar("null"),
            serde_yaml::Value::Bool(b) => Node::scalar(if *b { "true" } else { "false" }),
            serde_yaml::Value::Number(n) => Node::scalar(n.to_string()),
            serde_yaml::Value::String(s) => Node::scalar(s.clone()),
            serde_yaml::Value::Sequence(items) => {
                Node::sequence(items.iter().map(Node::from_value).collect())
            }
            serde_yaml::Value::Mapping(map) => {
                let mut ordered: BTreeMap<usize, (String, Node)> = BTreeMap::new();
                for (i, (k, v)) in map.iter().enumerate() {
                    let key = match k {
                        serde_yaml::Value::String(s) => s.clone(),
                        other => serde_yaml::to_string(other)
                            .unwrap_or_default()
                            .trim()
                            .to_string(),
                    };
                    ordered.insert(i, (key, Node::from_value(v)));
                }
                let mut m = Mapping::new();
                for (_, (k, v)) in ordered {
                    m.insert(k, v);
                }
                Node::mapping(m)
            }
        }
    }
}
