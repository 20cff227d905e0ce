//! Loads an [`Ontology`] from the OBO flat file format.
//!
//! Only what the slimmer needs is read: term ids, labels, obsolescence,
//! and the `is_a` / `part_of` edges that make up the subsumption hierarchy.

use std::io::BufRead;
use std::path::Path;

use crate::error::{SlimError, SlimResult};
use crate::ingest::open_reader;
use crate::ontology::Ontology;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Stanza {
    Header,
    Term,
    Other,
}

#[derive(Debug, Default)]
struct TermStanza {
    line: usize,
    id: Option<String>,
    label: String,
    parents: Vec<String>,
    obsolete: bool,
}

pub fn read_obo<P: AsRef<Path>>(path: P) -> SlimResult<Ontology> {
    let path = path.as_ref();
    let reader = open_reader(path)?;
    parse_obo(reader, path)
}

/// Parses OBO text from `reader`. `path` is only used in error messages.
pub fn parse_obo<R: BufRead>(reader: R, path: &Path) -> SlimResult<Ontology> {
    let mut stanza = Stanza::Header;
    let mut current: Option<TermStanza> = None;
    let mut terms: Vec<TermStanza> = Vec::new();
    let mut format_version = None;
    let mut data_version = None;

    for (i, line) in reader.lines().enumerate() {
        let line_number = i + 1;
        let line = line.map_err(|e| SlimError::io(path, e))?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('!') { continue; }

        if line.starts_with('[') {
            terms.extend(finish_term(current.take(), path)?);
            stanza = if line == "[Term]" { Stanza::Term } else { Stanza::Other };
            if stanza == Stanza::Term {
                current = Some(TermStanza { line: line_number, ..TermStanza::default() });
            }
            continue;
        }

        let mut tag_value = line.splitn(2, ':');
        let tag = tag_value.next().unwrap_or("").trim();
        let value = match tag_value.next() {
            Some(value) => strip_trailing_modifiers(value),
            None => {
                return Err(SlimError::Ontology {
                    path: path.to_path_buf(),
                    line: line_number,
                    message: format!("expected 'tag: value', found '{}'", line),
                });
            }
        };

        match (stanza, current.as_mut()) {
            (Stanza::Header, _) => match tag {
                "format-version" => format_version = Some(value.to_string()),
                "data-version" => data_version = Some(value.to_string()),
                _ => (),
            },
            (Stanza::Term, Some(term)) => match tag {
                "id" => term.id = Some(value.to_string()),
                "name" => term.label = value.to_string(),
                "is_obsolete" => term.obsolete = value.eq_ignore_ascii_case("true"),
                "is_a" => {
                    if let Some(parent) = value.split_whitespace().next() {
                        term.parents.push(parent.to_string());
                    }
                }
                "relationship" => {
                    let mut parts = value.split_whitespace();
                    if let (Some("part_of"), Some(parent)) = (parts.next(), parts.next()) {
                        term.parents.push(parent.to_string());
                    }
                }
                _ => (),
            },
            _ => (),
        }
    }
    terms.extend(finish_term(current.take(), path)?);

    let mut ontology = Ontology::new();
    if let Some(version) = data_version.or(format_version) {
        ontology.set_version(version);
    }
    for term in &terms {
        if let Some(id) = &term.id {
            ontology.insert_term(id.clone(), term.label.clone());
        }
    }

    let mut unresolved = 0;
    for term in &terms {
        let id = match &term.id {
            Some(id) => id,
            None => continue,
        };
        for parent in &term.parents {
            if !ontology.add_parent(id, parent) {
                log::debug!("Ignoring edge {} -> {}: parent is not defined", id, parent);
                unresolved += 1;
            }
        }
    }
    if unresolved > 0 {
        log::info!("Ignored {} edges to terms not defined in '{}'", unresolved, path.display());
    }

    Ok(ontology.build())
}

/// Validates a finished [Term] stanza. Obsolete terms are dropped.
fn finish_term(term: Option<TermStanza>, path: &Path) -> SlimResult<Option<TermStanza>> {
    let term = match term {
        Some(term) => term,
        None => return Ok(None),
    };
    if term.id.is_none() {
        return Err(SlimError::Ontology {
            path: path.to_path_buf(),
            line: term.line,
            message: "[Term] stanza has no id".to_string(),
        });
    }
    if term.obsolete { return Ok(None); }
    Ok(Some(term))
}

/// Removes a trailing `! comment` and `{qualifier}` block from a tag value.
fn strip_trailing_modifiers(value: &str) -> &str {
    let value = match value.find(" !") {
        Some(at) => &value[..at],
        None => value,
    };
    let value = match value.find(" {") {
        Some(at) => &value[..at],
        None => value,
    };
    value.trim()
}
