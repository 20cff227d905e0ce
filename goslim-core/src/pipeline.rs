use std::fs::File;
use std::io::{BufRead, BufWriter, Write};
use std::path::Path;

use crate::annotations::AnnotationSet;
use crate::error::{SlimError, SlimResult};
use crate::ingest::open_reader;
use crate::ontology::Hierarchy;

/// Runs annotations through closure, slimming and the redundancy filter
/// against one full ontology and one slim ontology.
pub struct Pipeline<'o, H: Hierarchy> {
    go: &'o H,
    slim: &'o H,
    expand_slim: bool,
}

/// Annotation counts after each stage of a [`Pipeline::run`].
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct Summary {
    pub genes: usize,
    pub asserted: usize,
    pub closed: usize,
    pub slimmed: usize,
    pub written: usize,
}

impl<'o, H: Hierarchy> Pipeline<'o, H> {

    pub fn new(go: &'o H, slim: &'o H) -> Pipeline<'o, H> {
        Pipeline { go, slim, expand_slim: false }
    }

    /// Also extend slim annotations to their ancestors within the slim
    /// ontology. Only needed when the slim hierarchy has edges that the
    /// full ontology does not imply between the same names.
    pub fn expand_slim(mut self, expand: bool) -> Self {
        self.expand_slim = expand;
        self
    }

    /// Parses annotations against the full ontology.
    pub fn read_annotations<B: BufRead>(&self, reader: B) -> std::io::Result<AnnotationSet<'o, H>> {
        AnnotationSet::read_from(reader, self.go)
    }

    pub fn open_annotations(&self, path: &Path) -> SlimResult<AnnotationSet<'o, H>> {
        log::info!("Reading annotations from '{}'", path.display());
        let reader = open_reader(path)?;
        self.read_annotations(reader).map_err(|e| SlimError::io(path, e))
    }

    /// Extends `annotations` to every ancestor term in the full ontology.
    pub fn close(&self, annotations: &mut AnnotationSet<'o, H>) -> usize {
        let inferred = annotations.extend_ancestors();
        log::info!("Inferred {} annotations from ancestor terms, {} in total",
            inferred, annotations.size());
        inferred
    }

    pub fn slim(&self, annotations: &AnnotationSet<'o, H>) -> AnnotationSet<'o, H> {
        let mut slimmed = annotations.slim_to(self.slim);
        if self.expand_slim {
            let inferred = slimmed.extend_ancestors();
            log::info!("Inferred {} slim annotations from the slim hierarchy", inferred);
        }
        log::info!("Slimmed to {} annotations for {} genes", slimmed.size(), slimmed.gene_count());
        slimmed
    }

    pub fn save<W: Write>(&self, slimmed: &AnnotationSet<'o, H>, writer: W) -> SlimResult<usize> {
        let written = slimmed.save(writer)?;
        log::info!("Wrote {} of {} slim annotations after removing redundant terms",
            written, slimmed.size());
        Ok(written)
    }

    /// Reads `annotations`, slims them and writes the table to `output`.
    ///
    /// `output` is only created once the annotations have been read, so a
    /// failed read leaves no file behind.
    pub fn run(&self, annotations: &Path, output: &Path) -> SlimResult<Summary> {
        let mut full = self.open_annotations(annotations)?;
        let asserted = full.size();
        self.close(&mut full);
        let slimmed = self.slim(&full);

        log::info!("Saving result file '{}'", output.display());
        let file = File::create(output).map_err(|e| SlimError::io(output, e))?;
        let written = self.save(&slimmed, BufWriter::new(file))?;

        Ok(Summary {
            genes: full.gene_count(),
            asserted,
            closed: full.size(),
            slimmed: slimmed.size(),
            written,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::tests::{FULL, SLIM};
    use crate::ontology::Ontology;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Cursor;

    fn slim_text(pipeline: &Pipeline<Ontology>, input: &str) -> String {
        let mut full = pipeline.read_annotations(Cursor::new(input)).unwrap();
        pipeline.close(&mut full);
        let slimmed = pipeline.slim(&full);
        let mut output = Vec::new();
        pipeline.save(&slimmed, &mut output).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn test_leaf_annotation_reports_most_specific_slim_term() {
        let pipeline = Pipeline::new(&*FULL, &*SLIM);
        let output = slim_text(&pipeline, "g1\tGO:0000001\n");
        assert_eq!(output, "Gene\tGOSlim Term\ng1\tGO:0000002\n");
    }

    #[test]
    fn test_gaf_input() {
        let input = "!gaf-version: 2.1
!
DB\tP1\tg1\t\tGO:0000001\tPMID:1\tIDA\t\tP
DB\tP2\tg2\tNOT\tGO:0000001\tPMID:1\tIDA\t\tP
DB\tP3\tg3\t\tGO:0000004\tPMID:1\tIDA\t\tP
DB\tP4\tg4\t\tGO:9999999\tPMID:1\tIDA\t\tP
";
        let pipeline = Pipeline::new(&*FULL, &*SLIM);
        let output = slim_text(&pipeline, input);
        assert_eq!(output, "Gene\tGOSlim Term\ng1\tGO:0000002\ng3\tGO:0000003\n");
    }

    #[test]
    fn test_parenthesis_input() {
        let input = "(species=test)(type=Biological Process)
g1 = 0000005
g2 = 0000003
";
        let pipeline = Pipeline::new(&*FULL, &*SLIM);
        let output = slim_text(&pipeline, input);
        assert_eq!(output, "Gene\tGOSlim Term\ng1\tGO:0000002\ng2\tGO:0000003\n");
    }

    #[test]
    fn test_tabular_input_with_multiple_terms_per_gene() {
        let input = "Sequence\tDescription\tTerm
g1\tkinase\tGO:0000001
g1\tkinase\tGO:0000004
g2\tunknown\tGO:0000404
";
        let pipeline = Pipeline::new(&*FULL, &*SLIM);
        let output = slim_text(&pipeline, input);
        // GO:0000004 maps to the slim root, which g1 already has a more specific slim term below
        assert_eq!(output, "Gene\tGOSlim Term\ng1\tGO:0000002\n");
    }

    #[test]
    fn test_invalid_utf8_line_keeps_other_records() {
        let pipeline = Pipeline::new(&*FULL, &*SLIM);
        let input: &[u8] = b"g1\tGO:0000001\ng2\tcaf\xe9\tGO:0000004\ng3\tGO:0000005\n";
        let full = pipeline.read_annotations(Cursor::new(input)).unwrap();
        assert_eq!(full.gene_count(), 3);
        assert_eq!(full.size(), 3);
    }

    #[test]
    fn test_expand_slim_uses_slim_hierarchy() {
        // A slim whose hierarchy puts GO:0000004 under GO:0000001, which the
        // full ontology does not.
        let mut slim = Ontology::new();
        slim.insert_term("GO:0000001", "leaf");
        slim.insert_term("GO:0000004", "other branch");
        slim.add_parent("GO:0000004", "GO:0000001");
        let slim = slim.build();

        let plain = Pipeline::new(&*FULL, &slim);
        assert_eq!(slim_text(&plain, "g1\tGO:0000004\n"), "Gene\tGOSlim Term\ng1\tGO:0000004\n");

        let expanded = Pipeline::new(&*FULL, &slim).expand_slim(true);
        let mut full = expanded.read_annotations(Cursor::new("g1\tGO:0000004\n")).unwrap();
        expanded.close(&mut full);
        let slimmed = expanded.slim(&full);
        assert!(slimmed.contains("g1", slim.index_of("GO:0000001").unwrap()));
        assert_eq!(slimmed.size(), 2);
    }

    #[test]
    fn test_run_writes_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("annotations.txt");
        let output = dir.path().join("slim.txt");
        std::fs::write(&input, "g1\tGO:0000001\ng2\tGO:0000004\n").unwrap();

        let summary = Pipeline::new(&*FULL, &*SLIM).run(&input, &output).unwrap();
        assert_eq!(summary, Summary { genes: 2, asserted: 2, closed: 5, slimmed: 3, written: 2 });
        assert_eq!(std::fs::read_to_string(&output).unwrap(),
            "Gene\tGOSlim Term\ng1\tGO:0000002\ng2\tGO:0000003\n");
    }

    #[test]
    fn test_run_reads_gzipped_annotations() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("annotations.gaf.gz");
        let output = dir.path().join("slim.txt");

        let mut encoder = GzEncoder::new(File::create(&input).unwrap(), Compression::default());
        encoder.write_all(b"!gaf-version: 2.1\nDB\tP1\tg1\t\tGO:0000005\tPMID:1\tIDA\t\tP\n").unwrap();
        encoder.finish().unwrap();

        Pipeline::new(&*FULL, &*SLIM).run(&input, &output).unwrap();
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "Gene\tGOSlim Term\ng1\tGO:0000002\n");
    }

    #[test]
    fn test_missing_input_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("missing.txt");
        let output = dir.path().join("slim.txt");

        let result = Pipeline::new(&*FULL, &*SLIM).run(&input, &output);
        assert!(matches!(result, Err(SlimError::Io { .. })));
        assert!(!output.exists());
    }
}
