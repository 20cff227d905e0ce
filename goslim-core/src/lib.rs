#![deny(warnings)]

#[cfg(test)]
#[macro_use]
extern crate lazy_static;

mod error;
mod index;
mod ontology;
mod obo;
mod ingest;
mod annotations;
mod export;
mod pipeline;

pub use error::{SlimError, SlimResult};
pub use index::SetMultimap;
pub use ontology::{Hierarchy, Ontology, Term, TermKey};
pub use obo::{parse_obo, read_obo};
pub use ingest::{open_reader, AnnotationFormat, AnnotationReader, AnnotationRecord, IngestStats, ParsedLine};
pub use annotations::AnnotationSet;
pub use export::{SlimExporter, SlimRecord, SLIM_HEADER};
pub use pipeline::{Pipeline, Summary};
