use std::collections::{BTreeSet, HashMap};
use itertools::Itertools;

/// Position of a term inside one loaded [`Ontology`].
///
/// Keys from two different ontologies are unrelated; translate through
/// the term name instead.
#[cfg(not(test))]
#[derive(Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Copy, Clone)]
pub struct TermKey(usize);
#[cfg(test)]
#[derive(Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Copy, Clone)]
pub struct TermKey(pub usize);

/// The subsumption hierarchy an annotation set is bound to.
pub trait Hierarchy {
    fn index_of(&self, name: &str) -> Option<TermKey>;

    fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    fn name_of(&self, key: TermKey) -> Option<&str>;

    /// All transitive ancestors of `key`. A non-strict query includes `key` itself.
    fn ancestors_of(&self, key: TermKey, strict: bool) -> BTreeSet<TermKey>;

    /// All transitive descendants of `key`. A non-strict query includes `key` itself.
    fn descendants_of(&self, key: TermKey, strict: bool) -> BTreeSet<TermKey>;

    /// Whether `ancestor` lies strictly above `key`.
    fn is_ancestor_of(&self, ancestor: TermKey, key: TermKey) -> bool {
        self.ancestors_of(key, true).contains(&ancestor)
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Term {
    pub id: String,
    pub label: String,
}

/// An in-memory ontology with precomputed ancestor and descendant closures.
///
/// Terms are inserted with [`Ontology::insert_term`] and linked with
/// [`Ontology::add_parent`]; [`Ontology::build`] then flattens the graph.
/// Ancestor and descendant queries come back empty until `build` has run.
#[derive(Debug, Default)]
pub struct Ontology {
    terms: Vec<Term>,
    by_id: HashMap<String, TermKey>,
    parents: Vec<BTreeSet<TermKey>>,
    ancestors: Vec<BTreeSet<TermKey>>,
    descendants: Vec<BTreeSet<TermKey>>,
    version: Option<String>,
}

impl Ontology {

    pub fn new() -> Ontology {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub(crate) fn set_version(&mut self, version: String) {
        self.version = Some(version);
    }

    pub fn term(&self, key: TermKey) -> Option<&Term> {
        self.terms.get(key.0)
    }

    pub fn iter_terms(&self) -> impl Iterator<Item=(TermKey, &Term)> {
        self.terms.iter().enumerate().map(|(i, term)| (TermKey(i), term))
    }

    /// Adds a term, or returns the existing key if `id` is already known.
    pub fn insert_term<S: Into<String>>(&mut self, id: S, label: S) -> TermKey {
        let id = id.into();
        if let Some(key) = self.by_id.get(&id) {
            return *key;
        }

        let key = TermKey(self.terms.len());
        self.by_id.insert(id.clone(), key);
        self.terms.push(Term { id, label: label.into() });
        self.parents.push(BTreeSet::new());
        self.ancestors.push(BTreeSet::new());
        self.descendants.push(BTreeSet::new());
        key
    }

    /// Records that `child` is_a (or is part_of) `parent`.
    ///
    /// Returns false if either id is unknown or the edge is a self-loop.
    pub fn add_parent(&mut self, child: &str, parent: &str) -> bool {
        let (child, parent) = match (self.by_id.get(child), self.by_id.get(parent)) {
            (Some(child), Some(parent)) => (*child, *parent),
            _ => return false,
        };
        if child == parent { return false; }
        self.parents[child.0].insert(parent);
        true
    }

    /// Computes the full ancestor and descendant set of every term.
    pub fn build(mut self) -> Ontology {
        let parents = &self.parents;
        let ancestors = (0..self.terms.len())
            .map(|i| walk_parents(TermKey(i), parents))
            .collect();
        self.ancestors = ancestors;

        self.descendants = vec![BTreeSet::new(); self.terms.len()];
        for (i, term_ancestors) in self.ancestors.iter().enumerate() {
            for ancestor in term_ancestors {
                self.descendants[ancestor.0].insert(TermKey(i));
            }
        }

        log::debug!("Built closure for {} terms, roots: [{}]", self.terms.len(),
            self.iter_terms()
                .filter(|(key, _)| self.parents[key.0].is_empty())
                .map(|(_, term)| &term.id)
                .join(", "));
        self
    }
}

/// Every term reachable from `key` by following parent edges, excluding `key`.
/// Terms already visited are not expanded again, so cycles terminate.
fn walk_parents(key: TermKey, parents: &[BTreeSet<TermKey>]) -> BTreeSet<TermKey> {
    let mut found = BTreeSet::new();
    let mut stack: Vec<TermKey> = parents[key.0].iter().copied().collect();
    while let Some(next) = stack.pop() {
        if found.insert(next) {
            stack.extend(parents[next.0].iter().copied());
        }
    }
    found.remove(&key);
    found
}

impl Hierarchy for Ontology {
    fn index_of(&self, name: &str) -> Option<TermKey> {
        self.by_id.get(name).copied()
    }

    fn name_of(&self, key: TermKey) -> Option<&str> {
        self.terms.get(key.0).map(|term| &*term.id)
    }

    fn ancestors_of(&self, key: TermKey, strict: bool) -> BTreeSet<TermKey> {
        let mut found = self.ancestors.get(key.0).cloned().unwrap_or_default();
        if !strict && key.0 < self.terms.len() { found.insert(key); }
        found
    }

    fn descendants_of(&self, key: TermKey, strict: bool) -> BTreeSet<TermKey> {
        let mut found = self.descendants.get(key.0).cloned().unwrap_or_default();
        if !strict && key.0 < self.terms.len() { found.insert(key); }
        found
    }

    fn is_ancestor_of(&self, ancestor: TermKey, key: TermKey) -> bool {
        self.ancestors.get(key.0)
            .map(|ancestors| ancestors.contains(&ancestor))
            .unwrap_or(false)
    }
}
