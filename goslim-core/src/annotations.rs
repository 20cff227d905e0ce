use std::io::{self, BufRead, Write};

use crate::error::SlimResult;
use crate::export::{SlimExporter, SlimRecord, SLIM_HEADER};
use crate::index::SetMultimap;
use crate::ingest::AnnotationReader;
use crate::ontology::{Hierarchy, TermKey};

/// Gene to term annotations, bound to the one ontology their keys index into.
pub struct AnnotationSet<'o, H: Hierarchy> {
    annotations: SetMultimap<String, TermKey>,
    ontology: &'o H,
}

impl<'o, H: Hierarchy> AnnotationSet<'o, H> {

    pub fn new(ontology: &'o H) -> AnnotationSet<'o, H> {
        AnnotationSet { annotations: SetMultimap::new(), ontology }
    }

    /// Parses an annotation file of any supported format.
    ///
    /// Records naming a term that `ontology` does not know are dropped.
    /// The result is not yet extended to ancestors, see
    /// [`AnnotationSet::extend_ancestors`].
    pub fn read_from<B: BufRead>(reader: B, ontology: &'o H) -> io::Result<AnnotationSet<'o, H>> {
        let mut set = AnnotationSet::new(ontology);
        let mut reader = AnnotationReader::new(reader);
        let mut unknown = 0;

        for record in &mut reader {
            let record = record?;
            if !set.add_named(record.gene, &record.go_term) {
                log::debug!("Skipping annotation to unknown term {}", record.go_term);
                unknown += 1;
            }
        }

        let stats = reader.stats();
        log::info!("Detected {:?} annotation format", reader.format());
        log::info!("Parsed {} records: {} unknown terms, {} NOT-qualified, {} malformed lines skipped",
            stats.records, unknown, stats.negated, stats.malformed);
        Ok(set)
    }

    pub fn ontology(&self) -> &'o H {
        self.ontology
    }

    pub fn add<G: Into<String>>(&mut self, gene: G, term: TermKey) -> bool {
        self.annotations.add(gene.into(), term)
    }

    /// Adds an annotation by term name. Returns false if the name is unknown.
    pub fn add_named<G: Into<String>>(&mut self, gene: G, name: &str) -> bool {
        match self.ontology.index_of(name) {
            Some(term) => {
                self.add(gene, term);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, gene: &str, term: TermKey) -> bool {
        self.annotations.contains(gene, &term)
    }

    /// Number of distinct (gene, term) pairs.
    pub fn size(&self) -> usize {
        self.annotations.size()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    pub fn gene_count(&self) -> usize {
        self.annotations.key_count()
    }

    pub fn iter(&self) -> impl Iterator<Item=(&str, TermKey)> {
        self.annotations.iter().map(|(gene, term)| (gene.as_str(), *term))
    }

    /// Adds every ancestor of every annotated term, returning how many
    /// annotations were new.
    ///
    /// The ancestors are gathered into a separate table first and merged
    /// afterwards, so only the terms present before the call are expanded.
    /// The ontology already reports complete ancestor sets, so one pass
    /// yields the closure.
    pub fn extend_ancestors(&mut self) -> usize {
        let mut inferred: SetMultimap<String, TermKey> = SetMultimap::new();
        for (gene, term) in self.annotations.iter() {
            for ancestor in self.ontology.ancestors_of(*term, true) {
                if !self.annotations.contains(gene.as_str(), &ancestor) {
                    inferred.add(gene.clone(), ancestor);
                }
            }
        }

        let before = self.annotations.size();
        self.annotations.extend(inferred);
        self.annotations.size() - before
    }

    /// Translates these annotations into `slim` by term name.
    ///
    /// Each term whose name is also in `slim` is carried over under the
    /// slim ontology's key; all other terms are left out. Run this on an
    /// ancestor-closed set so that genes pick up every slim term above
    /// their annotations. The result is not extended within `slim`.
    pub fn slim_to<'s, S: Hierarchy>(&self, slim: &'s S) -> AnnotationSet<'s, S> {
        let mut slimmed = AnnotationSet::new(slim);
        for (gene, term) in self.iter() {
            let name = match self.ontology.name_of(term) {
                Some(name) => name,
                None => continue,
            };
            slimmed.add_named(gene, name);
        }
        slimmed
    }

    /// Whether `gene` is also annotated to a term below `term`.
    pub fn contains_descendant(&self, gene: &str, term: TermKey) -> bool {
        self.annotations.get(gene)
            .any(|annotated| self.ontology.is_ancestor_of(term, *annotated))
    }

    /// The annotations left after dropping every term that has a more
    /// specific annotation for the same gene.
    pub fn iter_specific<'a>(&'a self) -> impl Iterator<Item=(&'a str, TermKey)> + 'a {
        self.iter().filter(move |(gene, term)| !self.contains_descendant(gene, *term))
    }

    /// Writes the most specific annotations as a `Gene\tGOSlim Term` table,
    /// returning the number of rows written.
    pub fn save<W: Write>(&self, writer: W) -> SlimResult<usize> {
        let ontology = self.ontology;
        let records = self.iter_specific()
            .filter_map(|(gene, term)| {
                ontology.name_of(term).map(|slim_term| SlimRecord { gene, slim_term })
            });

        SlimExporter::new(SLIM_HEADER.to_string(), records).write_all(writer)
    }
}
