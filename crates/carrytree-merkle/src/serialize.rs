//! Level-order text persistence
//!
//! A tree is written breadth-first from the root, one node per line:
//!
//! ```text
//! *** This is for Merkle Tree user-friendly graph in BFS order. ***
//! *** Levels start from Root [0] to leafs [log n] ***
//! *** e.g. Level(n): Hash [key] <left,right>:childs
//! Level(0): <hash> [<key>] <<left>,<right>>
//! Level(1): <hash> [<key>]
//! ```
//!
//! Every node line ends with a single trailing space. Lines starting with
//! `***` are comments. A document may hold several trees separated by a
//! line containing only `-`.
//!
//! Hashes are read back verbatim and never recomputed, so an internal
//! node's key (a concatenation of child hashes) survives a round trip.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use crate::connections::level_order;
use crate::error::{Error, Result};
use crate::hash::is_hex_digest;
use crate::tree::{Node, Tree};

/// Marker opening a comment line
pub const COMMENT_MARKER: &str = "***";

/// Line separating trees in a multi-tree document
pub const TREE_SEPARATOR: &str = "-";

const BANNER: [&str; 3] = [
    "*** This is for Merkle Tree user-friendly graph in BFS order. *** ",
    "*** Levels start from Root [0] to leafs [log n] *** ",
    "*** e.g. Level(n): Hash [key] <left,right>:childs ",
];

const TEXT_ORIGIN: &str = "<text>";

impl Tree {
    /// Render this tree as a level-order text document
    ///
    /// # Errors
    /// * [`Error::InvalidInput`] if a key contains whitespace or `,`
    pub fn to_text(&self) -> Result<String> {
        trees_to_text(&[self])
    }

    /// Parse a single-tree text document
    pub fn from_text(text: &str) -> Result<Tree> {
        parse_single(text, TEXT_ORIGIN)
    }
}

/// Render several trees into one document, separated by [`TREE_SEPARATOR`]
pub fn trees_to_text(trees: &[&Tree]) -> Result<String> {
    let mut out = String::new();
    for line in BANNER {
        out.push_str(line);
        out.push('\n');
    }

    for (i, tree) in trees.iter().enumerate() {
        if i > 0 {
            out.push_str(TREE_SEPARATOR);
            out.push('\n');
        }
        write_tree(&mut out, tree)?;
    }

    Ok(out)
}

fn write_tree(out: &mut String, tree: &Tree) -> Result<()> {
    for (depth, node) in level_order(tree) {
        if !Node::is_representable_key(node.key()) {
            return Err(Error::InvalidInput(format!(
                "key {:?} contains whitespace or ',' and cannot be serialized",
                node.key()
            )));
        }

        out.push_str(&format!("Level({}): {} [{}]", depth, node.hash(), node.key()));
        if let Some((left, right)) = node.children() {
            out.push_str(&format!(" <{},{}>", left, right));
        }
        out.push_str(" \n");
    }
    Ok(())
}

/// Parse a document holding any number of trees
pub fn trees_from_text(text: &str, origin: &str) -> Result<Vec<Tree>> {
    let mut trees = Vec::new();
    let mut section = Section::default();

    for (i, line) in text.lines().enumerate() {
        let line_no = i + 1;
        if line.trim_end() == TREE_SEPARATOR {
            trees.push(section.finish(origin, line_no)?);
            section = Section::default();
            continue;
        }
        section.feed(line, line_no, origin)?;
    }

    let last_line = text.lines().count();
    trees.push(section.finish(origin, last_line)?);
    Ok(trees)
}

fn parse_single(text: &str, origin: &str) -> Result<Tree> {
    let mut trees = trees_from_text(text, origin)?;
    if trees.len() != 1 {
        return Err(Error::Parse {
            origin: origin.to_string(),
            line: 0,
            reason: format!("expected one tree, found {}", trees.len()),
        });
    }
    Ok(trees.swap_remove(0))
}

/// Write `tree` to `path`, replacing any existing file
pub fn save(tree: &Tree, path: impl AsRef<Path>) -> Result<()> {
    save_all(&[tree], path)
}

/// Write several trees to one file
pub fn save_all(trees: &[&Tree], path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    // Render first so a rejected tree never truncates the file
    let text = trees_to_text(trees)?;

    let file = File::create(path).map_err(|e| Error::io(path, e))?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(text.as_bytes())
        .and_then(|()| writer.flush())
        .map_err(|e| Error::io(path, e))?;

    tracing::debug!(path = %path.display(), trees = trees.len(), "saved merkle tree file");
    Ok(())
}

/// Read a single-tree file
pub fn load(path: impl AsRef<Path>) -> Result<Tree> {
    let path = path.as_ref();
    let text = read_file(path)?;
    let tree = parse_single(&text, &path.display().to_string())?;
    tracing::debug!(path = %path.display(), nodes = tree.len(), "loaded merkle tree file");
    Ok(tree)
}

/// Read a multi-tree file
pub fn load_all(path: impl AsRef<Path>) -> Result<Vec<Tree>> {
    let path = path.as_ref();
    let text = read_file(path)?;
    trees_from_text(&text, &path.display().to_string())
}

fn read_file(path: &Path) -> Result<String> {
    let mut file = File::open(path).map_err(|e| Error::io(path, e))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .map_err(|e| Error::io(path, e))?;

    String::from_utf8(bytes).map_err(|e| {
        let valid = &e.as_bytes()[..e.utf8_error().valid_up_to()];
        Error::Parse {
            origin: path.display().to_string(),
            line: valid.iter().filter(|&&b| b == b'\n').count() + 1,
            reason: format!("file is not valid UTF-8: {}", e.utf8_error()),
        }
    })
}

/// One parsed node line
struct NodeLine {
    depth: usize,
    node: Node,
}

fn parse_line(line: &str) -> std::result::Result<NodeLine, String> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let (level, hash, key, children) = match fields.as_slice() {
        [level, hash, key] => (*level, *hash, *key, None),
        [level, hash, key, children] => (*level, *hash, *key, Some(*children)),
        _ => {
            return Err(format!(
                "expected a leaf or parent node line, found {} fields",
                fields.len()
            ))
        }
    };

    let depth = level
        .strip_prefix("Level(")
        .and_then(|rest| rest.strip_suffix("):"))
        .ok_or_else(|| format!("malformed level token {:?}", level))?
        .parse::<usize>()
        .map_err(|e| format!("invalid level in {:?}: {}", level, e))?;

    if !is_hex_digest(hash) {
        return Err(format!("invalid hash {:?}", hash));
    }

    let key = key
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or_else(|| format!("malformed key field {:?}", key))?;

    let children = children
        .map(|field| {
            field
                .strip_prefix('<')
                .and_then(|rest| rest.strip_suffix('>'))
                .and_then(|inner| inner.split_once(','))
                .map(|(left, right)| (left.to_string(), right.to_string()))
                .ok_or_else(|| format!("malformed children field {:?}", field))
        })
        .transpose()?;

    Ok(NodeLine {
        depth,
        node: Node::from_parts(key.to_string(), hash.to_string(), children),
    })
}

/// Nodes collected for one tree of a document
#[derive(Default)]
struct Section {
    nodes: HashMap<String, Node>,
    /// Line on which each key was first defined
    defined_at: HashMap<String, usize>,
    root: Option<String>,
    root_line: usize,
}

impl Section {
    fn feed(&mut self, line: &str, line_no: usize, origin: &str) -> Result<()> {
        let parse_err = |reason: String| Error::Parse {
            origin: origin.to_string(),
            line: line_no,
            reason,
        };

        if line.starts_with(COMMENT_MARKER) {
            return Ok(());
        }

        let NodeLine { depth, node } = parse_line(line).map_err(parse_err)?;

        if depth == 0 {
            if let Some(existing) = &self.root {
                if existing != node.key() {
                    return Err(parse_err(format!(
                        "second root at level 0 (first on line {})",
                        self.root_line
                    )));
                }
            }
            self.root = Some(node.key().to_string());
            self.root_line = line_no;
        }

        match self.nodes.get(node.key()) {
            // Shared subtrees are written once per position
            Some(existing) if *existing == node => {}
            Some(_) => {
                return Err(parse_err(format!(
                    "conflicting definitions for key {} (first on line {})",
                    node.key(),
                    self.defined_at[node.key()]
                )))
            }
            None => {
                self.defined_at.insert(node.key().to_string(), line_no);
                self.nodes.insert(node.key().to_string(), node);
            }
        }

        Ok(())
    }

    fn finish(self, origin: &str, line_no: usize) -> Result<Tree> {
        let parse_err = |line: usize, reason: String| Error::Parse {
            origin: origin.to_string(),
            line,
            reason,
        };

        let root = self
            .root
            .ok_or_else(|| parse_err(line_no, "no node at level 0".to_string()))?;

        for node in self.nodes.values() {
            if let Some((left, right)) = node.children() {
                for child in [left, right] {
                    if !self.nodes.contains_key(child) {
                        return Err(parse_err(
                            self.defined_at[node.key()],
                            format!("child {} of {} is never defined", child, node.key()),
                        ));
                    }
                }
            }
        }

        if let Some(key) = find_cycle(&self.nodes, &root) {
            return Err(parse_err(
                self.defined_at[key],
                format!("node {} is its own descendant", key),
            ));
        }

        Ok(Tree::from_parts(self.nodes, root))
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    Open,
    Closed,
}

/// Find a node reachable from `root` that lies on a cycle
///
/// Iterative depth-first search; children are known to exist.
fn find_cycle<'a>(nodes: &'a HashMap<String, Node>, root: &'a str) -> Option<&'a str> {
    let mut state: HashMap<&str, Visit> = HashMap::with_capacity(nodes.len());
    let mut stack: Vec<(&str, bool)> = vec![(root, false)];

    while let Some((key, expanded)) = stack.pop() {
        if expanded {
            state.insert(key, Visit::Closed);
            continue;
        }
        if state.contains_key(key) {
            continue;
        }

        state.insert(key, Visit::Open);
        stack.push((key, true));

        if let Some((left, right)) = nodes.get(key).and_then(Node::children) {
            for child in [right, left] {
                match state.get(child) {
                    Some(Visit::Open) => return Some(child),
                    Some(Visit::Closed) => {}
                    None => stack.push((child, false)),
                }
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::hash_str;

    fn parse_reason(text: &str) -> String {
        match Tree::from_text(text) {
            Err(Error::Parse { reason, .. }) => reason,
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_text_layout() {
        let tree = Tree::build(&["a", "b"]).unwrap();
        let text = tree.to_text().unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 6);
        assert!(lines[..3].iter().all(|l| l.starts_with(COMMENT_MARKER)));
        assert_eq!(
            lines[3],
            format!(
                "Level(0): {} [{}] <a,b> ",
                tree.root().hash(),
                tree.root().key()
            )
        );
        assert_eq!(lines[4], format!("Level(1): {} [a] ", hash_str("a")));
        assert_eq!(lines[5], format!("Level(1): {} [b] ", hash_str("b")));
    }

    #[test]
    fn test_text_round_trip() {
        let tree = Tree::build(&["a", "b", "c", "d", "e"]).unwrap();
        let parsed = Tree::from_text(&tree.to_text().unwrap()).unwrap();
        assert_eq!(parsed, tree);
    }

    #[test]
    fn test_single_leaf_root_is_parsed() {
        let tree = Tree::build(&["only"]).unwrap();
        let parsed = Tree::from_text(&tree.to_text().unwrap()).unwrap();
        assert_eq!(parsed.root().key(), "only");
        assert_eq!(parsed.root().hash(), hash_str("only"));
    }

    #[test]
    fn test_hashes_are_not_recomputed() {
        let fake = "f".repeat(64);
        let text = format!("Level(0): {} [x] \n", fake);
        let tree = Tree::from_text(&text).unwrap();
        assert_eq!(tree.root().hash(), fake);
    }

    #[test]
    fn test_unrepresentable_key_rejected() {
        let tree = Tree::build(&["has space", "b"]).unwrap();
        assert!(matches!(tree.to_text(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_bad_field_count() {
        let reason = parse_reason("Level(0): abc\n");
        assert!(reason.contains("2 fields"), "{}", reason);
    }

    #[test]
    fn test_bad_level_token() {
        let text = format!("Lvl(0): {} [x] \n", hash_str("x"));
        assert!(parse_reason(&text).contains("level token"));
    }

    #[test]
    fn test_bad_hash() {
        assert!(parse_reason("Level(0): xyz [x] \n").contains("invalid hash"));
    }

    #[test]
    fn test_missing_root() {
        let text = format!("Level(1): {} [x] \n", hash_str("x"));
        assert!(parse_reason(&text).contains("level 0"));
    }

    #[test]
    fn test_two_roots() {
        let text = format!(
            "Level(0): {} [x] \nLevel(0): {} [y] \n",
            hash_str("x"),
            hash_str("y")
        );
        assert!(parse_reason(&text).contains("second root"));
    }

    #[test]
    fn test_dangling_child() {
        let text = format!(
            "Level(0): {} [p] <a,b> \nLevel(1): {} [a] \n",
            hash_str("p"),
            hash_str("a")
        );
        assert!(parse_reason(&text).contains("never defined"));
    }

    #[test]
    fn test_cycle_rejected() {
        let h = hash_str("n");
        let text = format!(
            "Level(0): {h} [p] <q,a> \nLevel(1): {h} [q] <p,a> \nLevel(1): {h} [a] \n"
        );
        assert!(parse_reason(&text).contains("own descendant"));
    }

    #[test]
    fn test_parse_error_line_number() {
        let tree = Tree::build(&["a", "b"]).unwrap();
        let mut text = tree.to_text().unwrap();
        text.push_str("garbage\n");
        match Tree::from_text(&text) {
            Err(Error::Parse { line, .. }) => assert_eq!(line, 7),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_multi_tree_document() {
        let older = Tree::build(&["a", "b", "c"]).unwrap();
        let newer = Tree::build(&["a", "b", "c", "d"]).unwrap();
        let text = trees_to_text(&[&older, &newer]).unwrap();

        assert_eq!(text.lines().filter(|l| *l == TREE_SEPARATOR).count(), 1);
        let trees = trees_from_text(&text, "merkle.trees").unwrap();
        assert_eq!(trees, vec![older, newer]);

        // A multi-tree document is not a single tree
        assert!(Tree::from_text(&text).is_err());
    }

    #[test]
    fn test_repeated_items_round_trip() {
        let tree = Tree::build(&["a", "b", "a", "b", "a"]).unwrap();
        let parsed = Tree::from_text(&tree.to_text().unwrap()).unwrap();
        assert_eq!(parsed, tree);
        assert_eq!(parsed.leaf_keys(), ["a", "b", "a", "b", "a"]);
    }
}
