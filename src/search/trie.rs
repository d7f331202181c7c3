//! Compressed prefix tree keyed by terms.
//!
//! Nodes live in an arena and edges carry multi-character labels, so the trie
//! holds one node per branching point rather than one per character. Inserting
//! a key that shares only part of an edge label splits the edge; deleting a key
//! prunes dead leaves and merges pass-through nodes back into their parent edge.

use std::collections::BTreeMap;
use std::ops::Bound;

type NodeId = usize;

const ROOT: NodeId = 0;

#[derive(Debug, Clone)]
struct Node<V> {
    /// Edge label to child, ordered so traversal yields keys lexicographically
    children: BTreeMap<String, NodeId>,
    value: Option<V>,
}

impl<V> Default for Node<V> {
    fn default() -> Self {
        Self {
            children: BTreeMap::new(),
            value: None,
        }
    }
}

/// A radix trie mapping string keys to values.
#[derive(Debug, Clone)]
pub struct RadixTrie<V> {
    nodes: Vec<Node<V>>,
    /// Released arena slots, reused before growing
    free: Vec<NodeId>,
    len: usize,
}

impl<V> Default for RadixTrie<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> RadixTrie<V> {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::default()],
            free: Vec::new(),
            len: 0,
        }
    }

    /// Number of keys holding a value.
    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of live arena nodes, root included.
    pub fn node_count(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.find(key).and_then(|node| self.nodes[node].value.as_ref())
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        let node = self.find(key)?;
        self.nodes[node].value.as_mut()
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Stores `value` under `key`, returning the previous value.
    pub fn set(&mut self, key: &str, value: V) -> Option<V> {
        let node = self.node_for_insert(key);
        let previous = self.nodes[node].value.replace(value);
        if previous.is_none() {
            self.len += 1;
        }
        previous
    }

    /// Replaces the value under `key` with `f(current)`, inserting if absent.
    pub fn update(&mut self, key: &str, f: impl FnOnce(Option<V>) -> V) {
        let node = self.node_for_insert(key);
        let current = self.nodes[node].value.take();
        if current.is_none() {
            self.len += 1;
        }
        self.nodes[node].value = Some(f(current));
    }

    /// Removes `key` and compacts the branch it lived on.
    pub fn delete(&mut self, key: &str) -> Option<V> {
        let mut path: Vec<(NodeId, String)> = Vec::new();
        let mut node = ROOT;
        let mut rest = key;

        while let Some(c) = rest.chars().next() {
            let (label, child) = self.child_starting_with(node, c)?;
            rest = rest.strip_prefix(label)?;
            path.push((node, label.to_owned()));
            node = child;
        }

        let removed = self.nodes[node].value.take()?;
        self.len -= 1;
        self.prune(node, path);
        Some(removed)
    }

    /// Returns a view over every key starting with `prefix`.
    ///
    /// When `prefix` ends inside an edge label, the view is rooted at that
    /// edge's child and carries the unmatched remainder of the label. The trie
    /// itself is never modified.
    pub fn at_prefix(&self, prefix: &str) -> TrieView<'_, V> {
        let mut node = ROOT;
        let mut rest = prefix;

        loop {
            let Some(c) = rest.chars().next() else {
                return TrieView::new(self, prefix, Some((node, prefix.to_owned())));
            };
            let Some((label, child)) = self.child_starting_with(node, c) else {
                return TrieView::new(self, prefix, None);
            };

            if let Some(tail) = rest.strip_prefix(label) {
                node = child;
                rest = tail;
            } else if let Some(pending) = label.strip_prefix(rest) {
                let root_key = format!("{}{}", prefix, pending);
                return TrieView::new(self, prefix, Some((child, root_key)));
            } else {
                return TrieView::new(self, prefix, None);
            }
        }
    }

    /// Finds every key within `max_distance` edits of `query`.
    ///
    /// Edits are insertions, deletions, substitutions and swaps of two adjacent
    /// characters (optimal string alignment distance). The traversal carries one
    /// dynamic-programming row per trie depth and abandons a branch as soon as
    /// every cell in its row exceeds the budget. The distance reported for a key
    /// is the last cell of its row, which already counts the trailing query
    /// characters the key never reached. Each key appears once, at its lowest
    /// distance.
    pub fn fuzzy_get(&self, query: &str, max_distance: usize) -> BTreeMap<String, (&V, usize)> {
        let target: Vec<char> = query.chars().collect();
        let mut matches = BTreeMap::new();

        let mut stack = vec![FuzzyFrame {
            node: ROOT,
            key: String::new(),
            row: (0..=target.len()).collect(),
            previous_row: None,
            last_char: None,
        }];

        while let Some(frame) = stack.pop() {
            let node = &self.nodes[frame.node];

            if let Some(value) = &node.value {
                let distance = frame.row[target.len()];
                if distance <= max_distance {
                    matches
                        .entry(frame.key.clone())
                        .and_modify(|best: &mut (&V, usize)| {
                            if distance < best.1 {
                                *best = (value, distance);
                            }
                        })
                        .or_insert((value, distance));
                }
            }

            'edges: for (label, &child) in &node.children {
                let mut row = frame.row.clone();
                let mut previous_row = frame.previous_row.clone();
                let mut last_char = frame.last_char;

                for c in label.chars() {
                    let next = osa_row(&target, c, last_char, &row, previous_row.as_deref());
                    if next.iter().all(|&cell| cell > max_distance) {
                        continue 'edges;
                    }
                    previous_row = Some(row);
                    row = next;
                    last_char = Some(c);
                }

                stack.push(FuzzyFrame {
                    node: child,
                    key: format!("{}{}", frame.key, label),
                    row,
                    previous_row,
                    last_char,
                });
            }
        }

        matches
    }

    /// Iterates all entries in lexicographic key order.
    pub fn iter(&self) -> TrieIter<'_, V> {
        TrieIter::new(self, Some((ROOT, String::new())))
    }

    fn find(&self, key: &str) -> Option<NodeId> {
        let mut node = ROOT;
        let mut rest = key;
        while let Some(c) = rest.chars().next() {
            let (label, child) = self.child_starting_with(node, c)?;
            rest = rest.strip_prefix(label)?;
            node = child;
        }
        Some(node)
    }

    /// Sibling labels never share a first character, so at most one matches.
    fn child_starting_with(&self, node: NodeId, c: char) -> Option<(&str, NodeId)> {
        let mut buf = [0u8; 4];
        let first: &str = c.encode_utf8(&mut buf);
        self.nodes[node]
            .children
            .range::<str, _>((Bound::Included(first), Bound::Unbounded))
            .next()
            .filter(|(label, _)| label.starts_with(c))
            .map(|(label, &child)| (label.as_str(), child))
    }

    fn node_for_insert(&mut self, key: &str) -> NodeId {
        let mut node = ROOT;
        let mut rest = key;

        loop {
            let Some(c) = rest.chars().next() else {
                return node;
            };
            let Some((label, child)) = self
                .child_starting_with(node, c)
                .map(|(label, child)| (label.to_owned(), child))
            else {
                let leaf = self.alloc();
                self.nodes[node].children.insert(rest.to_owned(), leaf);
                return leaf;
            };

            let shared = common_prefix_len(&label, rest);
            if shared < label.len() {
                // Split the edge at the divergence point
                let middle = self.alloc();
                self.nodes[node].children.remove(&label);
                self.nodes[node]
                    .children
                    .insert(label[..shared].to_owned(), middle);
                self.nodes[middle]
                    .children
                    .insert(label[shared..].to_owned(), child);
                node = middle;
            } else {
                node = child;
            }
            rest = &rest[shared..];
        }
    }

    /// Walks back up `path` removing valueless leaves and folding
    /// single-child pass-through nodes into their parent edge.
    fn prune(&mut self, mut node: NodeId, mut path: Vec<(NodeId, String)>) {
        while let Some((parent, label)) = path.pop() {
            if self.nodes[node].value.is_some() || self.nodes[node].children.len() > 1 {
                return;
            }

            if let Some((suffix, child)) = self.nodes[node].children.pop_first() {
                self.nodes[parent].children.remove(&label);
                self.nodes[parent]
                    .children
                    .insert(format!("{}{}", label, suffix), child);
                self.release(node);
                return;
            }

            self.nodes[parent].children.remove(&label);
            self.release(node);
            node = parent;
        }
    }

    fn alloc(&mut self) -> NodeId {
        if let Some(id) = self.free.pop() {
            id
        } else {
            self.nodes.push(Node::default());
            self.nodes.len() - 1
        }
    }

    fn release(&mut self, id: NodeId) {
        self.nodes[id] = Node::default();
        self.free.push(id);
    }
}

impl<V> FromIterator<(String, V)> for RadixTrie<V> {
    fn from_iter<I: IntoIterator<Item = (String, V)>>(iter: I) -> Self {
        let mut trie = Self::new();
        for (key, value) in iter {
            trie.set(&key, value);
        }
        trie
    }
}

/// Byte length of the longest common prefix, on a char boundary.
fn common_prefix_len(a: &str, b: &str) -> usize {
    a.char_indices()
        .zip(b.chars())
        .find(|((_, ca), cb)| ca != cb)
        .map_or_else(|| a.len().min(b.len()), |((i, _), _)| i)
}

struct FuzzyFrame {
    node: NodeId,
    key: String,
    row: Vec<usize>,
    previous_row: Option<Vec<usize>>,
    last_char: Option<char>,
}

/// Next row of the optimal-string-alignment matrix after consuming `c`.
fn osa_row(
    target: &[char],
    c: char,
    last_char: Option<char>,
    row: &[usize],
    previous_row: Option<&[usize]>,
) -> Vec<usize> {
    let mut next = Vec::with_capacity(row.len());
    next.push(row[0] + 1);

    for j in 1..row.len() {
        let cost = usize::from(target[j - 1] != c);
        let mut best = (row[j] + 1).min(next[j - 1] + 1).min(row[j - 1] + cost);

        if j > 1
            && let (Some(previous), Some(last)) = (previous_row, last_char)
            && target[j - 2] == c
            && target[j - 1] == last
        {
            best = best.min(previous[j - 2] + 1);
        }
        next.push(best);
    }

    next
}

/// Read-only view of the keys under a prefix.
#[derive(Debug)]
pub struct TrieView<'a, V> {
    trie: &'a RadixTrie<V>,
    prefix: String,
    /// Node the view starts from and the full key that node represents
    root: Option<(NodeId, String)>,
}

impl<'a, V> TrieView<'a, V> {
    fn new(trie: &'a RadixTrie<V>, prefix: &str, root: Option<(NodeId, String)>) -> Self {
        Self {
            trie,
            prefix: prefix.to_owned(),
            root,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn get(&self, key: &str) -> Option<&'a V> {
        if key.starts_with(&self.prefix) {
            self.trie.get(key)
        } else {
            None
        }
    }

    pub fn iter(&self) -> TrieIter<'a, V> {
        TrieIter::new(self.trie, self.root.clone())
    }

    pub fn keys(&self) -> impl Iterator<Item = String> + 'a {
        self.iter().map(|(key, _)| key)
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

/// Depth-first iterator yielding `(key, value)` in lexicographic order.
#[derive(Debug)]
pub struct TrieIter<'a, V> {
    trie: &'a RadixTrie<V>,
    stack: Vec<(NodeId, String)>,
}

impl<'a, V> TrieIter<'a, V> {
    fn new(trie: &'a RadixTrie<V>, start: Option<(NodeId, String)>) -> Self {
        Self {
            trie,
            stack: start.into_iter().collect(),
        }
    }
}

impl<'a, V> Iterator for TrieIter<'a, V> {
    type Item = (String, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((id, key)) = self.stack.pop() {
            let node = &self.trie.nodes[id];
            for (label, &child) in node.children.iter().rev() {
                self.stack.push((child, format!("{}{}", key, label)));
            }
            if let Some(value) = &node.value {
                return Some((key, value));
            }
        }
        None
    }
}
