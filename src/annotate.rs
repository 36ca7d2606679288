//! Readable predicate names.
//!
//! Predicates in one sibling group get property names derived from their
//! IRIs. The base name is the last IRI segment; when two predicates share a
//! segment, names grow leftward one segment at a time until they diverge
//! (`ex_label` vs `ex2_label`). Exhausting the segments of both falls back
//! to the full predicate IRI. Disambiguation is computed over a trie keyed
//! by reversed segment lists, so the result depends only on the set of
//! predicates in the group, never on their order of insertion.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::normalize::Field;
use crate::shexj::RDF_TYPE;

static SEGMENT_SANITIZER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w.\-@]").expect("hard-coded regex"));

/// Assign `readable` on every field of one sibling group.
pub fn annotate_readable_predicates(fields: &mut [Field]) {
    let mut root = Node::default();
    for (idx, field) in fields.iter().enumerate() {
        let leaf = Leaf {
            idx,
            iri: field.predicate.clone(),
            tokens: tokens(&field.predicate),
        };
        root.insert(0, leaf);
    }
    root.assign("", fields);
}

/// Reversed, sanitized IRI segments. `rdf:type` is special-cased to the
/// single segment `type` so class tags merge across EXTENDS chains.
fn tokens(iri: &str) -> Vec<String> {
    if iri == RDF_TYPE {
        return vec!["type".to_string()];
    }
    let mut segments: Vec<String> = iri
        .split([':', '/', '#'])
        .filter(|s| !s.is_empty())
        .map(|s| SEGMENT_SANITIZER.replace_all(s, "_").into_owned())
        .collect();
    segments.reverse();
    segments
}

#[derive(Debug)]
struct Leaf {
    idx: usize,
    iri: String,
    tokens: Vec<String>,
}

#[derive(Debug, Default)]
struct Node {
    leaf: Option<Leaf>,
    children: IndexMap<String, Node>,
    /// Leaves whose segments ran out while still colliding; they keep their
    /// full IRI as the property name.
    exhausted: Vec<Leaf>,
}

impl Node {
    fn insert(&mut self, depth: usize, leaf: Leaf) {
        let key = leaf.tokens.get(depth).cloned().unwrap_or_default();
        match self.children.get_mut(&key) {
            None => {
                self.children.insert(
                    key,
                    Node {
                        leaf: Some(leaf),
                        ..Node::default()
                    },
                );
            }
            Some(child) => {
                if key.is_empty() {
                    child.exhausted.push(leaf);
                    return;
                }
                // Push the previously-settled leaf one level down alongside
                // the newcomer.
                if let Some(prev) = child.leaf.take() {
                    child.insert(depth + 1, prev);
                }
                child.insert(depth + 1, leaf);
            }
        }
    }

    fn assign(&self, accumulated: &str, fields: &mut [Field]) {
        if let Some(leaf) = &self.leaf {
            fields[leaf.idx].readable = accumulated.to_string();
        }
        for leaf in &self.exhausted {
            fields[leaf.idx].readable = leaf.iri.clone();
        }
        for (key, child) in &self.children {
            let name = if accumulated.is_empty() {
                key.clone()
            } else if key.is_empty() {
                accumulated.to_string()
            } else {
                format!("{key}_{accumulated}")
            };
            child.assign(&name, fields);
        }
    }
}

// -------------------------------- Tests ----------------------------------- //
