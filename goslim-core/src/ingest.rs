use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use flate2::read::MultiGzDecoder;

use crate::error::{SlimError, SlimResult};

/// Opens `path` for line reading, decompressing it first if it ends in `.gz`.
pub fn open_reader(path: &Path) -> SlimResult<Box<dyn BufRead>> {
    let file = File::open(path).map_err(|e| SlimError::io(path, e))?;
    let gzipped = path.extension()
        .map(|ext| ext == "gz")
        .unwrap_or(false);

    if gzipped {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// The layouts an annotation file may come in, told apart by its first line.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AnnotationFormat {
    /// GO Annotation File: `!` comment header, then tab-separated columns
    /// with the qualifier in column 3, the gene symbol in column 2 and the
    /// GO id in column 4.
    Gaf,
    /// BiNGO style: `(` info lines, then `gene = 0008150` rows.
    Parenthesis,
    /// Tab-separated with the gene first and a `GO:` id in any later column,
    /// optionally after a free-form header.
    Tabular,
}

impl AnnotationFormat {
    pub fn detect(first_line: &str) -> AnnotationFormat {
        if first_line.starts_with('!') {
            AnnotationFormat::Gaf
        } else if first_line.starts_with('(') {
            AnnotationFormat::Parenthesis
        } else {
            AnnotationFormat::Tabular
        }
    }

    /// Whether `line` still belongs to the header that precedes the records.
    fn is_preamble(self, line: &str) -> bool {
        match self {
            AnnotationFormat::Gaf => line.starts_with('!'),
            AnnotationFormat::Parenthesis => line.starts_with('('),
            AnnotationFormat::Tabular => !line.contains("GO:"),
        }
    }

    pub fn parse_line(self, line: &str) -> ParsedLine {
        if line.trim().is_empty() {
            return ParsedLine::Blank;
        }

        match self {
            AnnotationFormat::Gaf => {
                let columns = match tab_columns(line) {
                    Some(columns) if columns.len() >= 5 => columns,
                    _ => return ParsedLine::Malformed,
                };
                if columns[3].eq_ignore_ascii_case("not") {
                    return ParsedLine::Negated;
                }
                ParsedLine::Record(AnnotationRecord::new(&columns[2], &columns[4]))
            }
            AnnotationFormat::Parenthesis => {
                let mut sides = line.split(" = ");
                match (sides.next(), sides.next()) {
                    (Some(gene), Some(go_number)) => {
                        ParsedLine::Record(AnnotationRecord::new(gene, &format!("GO:{}", go_number)))
                    }
                    _ => ParsedLine::Malformed,
                }
            }
            AnnotationFormat::Tabular => {
                let columns = match tab_columns(line) {
                    Some(columns) => columns,
                    None => return ParsedLine::Malformed,
                };
                let mut columns = columns.iter();
                let gene = columns.next().unwrap_or("").trim();
                let go_term = columns.map(str::trim).find(|value| value.starts_with("GO:"));
                match go_term {
                    Some(go_term) => ParsedLine::Record(AnnotationRecord::new(gene, go_term)),
                    None => ParsedLine::Malformed,
                }
            }
        }
    }
}

/// Splits one tab-separated line into its columns. Quotes carry no meaning
/// in annotation files, so they are kept as part of the value.
fn tab_columns(line: &str) -> Option<csv::StringRecord> {
    csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(line.as_bytes())
        .records()
        .next()
        .and_then(Result::ok)
}

/// A raw (gene, GO id) pair as it appears in an annotation file.
#[derive(Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Clone)]
pub struct AnnotationRecord {
    pub gene: String,
    pub go_term: String,
}

impl AnnotationRecord {
    pub fn new(gene: &str, go_term: &str) -> AnnotationRecord {
        AnnotationRecord { gene: gene.to_string(), go_term: go_term.to_string() }
    }
}

#[derive(Debug, Eq, PartialEq)]
pub enum ParsedLine {
    Record(AnnotationRecord),
    /// GAF row carrying the NOT qualifier.
    Negated,
    /// Too few columns, or no GO id where one was expected.
    Malformed,
    Blank,
}

#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct IngestStats {
    pub records: usize,
    pub negated: usize,
    pub malformed: usize,
}

/// Reads [`AnnotationRecord`]s from an annotation file of any supported format.
///
/// The format is detected from the first line. Header lines are collected
/// into [`AnnotationReader::metadata`] and every following line is parsed
/// with the same format. Lines that do not yield a record are counted in
/// [`AnnotationReader::stats`] and skipped.
pub struct AnnotationReader<B> {
    reader: B,
    format: Option<AnnotationFormat>,
    metadata: String,
    preamble_finished: bool,
    pending: Option<String>,
    buffer: Vec<u8>,
    stats: IngestStats,
}

impl<B: BufRead> AnnotationReader<B> {
    pub fn new(reader: B) -> AnnotationReader<B> {
        AnnotationReader {
            reader,
            format: None,
            metadata: String::new(),
            preamble_finished: false,
            pending: None,
            buffer: Vec::new(),
            stats: IngestStats::default(),
        }
    }

    /// The detected format, once the first line has been read.
    pub fn format(&self) -> Option<AnnotationFormat> {
        self.format
    }

    /// The header lines, once every one of them has been read.
    pub fn metadata(&self) -> Option<&str> {
        if !self.preamble_finished { return None; }
        Some(&self.metadata)
    }

    pub fn stats(&self) -> IngestStats {
        self.stats
    }

    /// Reads one line without its line terminator. Bytes that are not valid
    /// UTF-8 are replaced with U+FFFD rather than failing the whole file.
    fn read_line(&mut self) -> io::Result<Option<String>> {
        self.buffer.clear();
        let len = self.reader.read_until(b'\n', &mut self.buffer)?;
        if len == 0 { return Ok(None); }

        let line = String::from_utf8_lossy(&self.buffer);
        Ok(Some(line.trim_end_matches(|c: char| c == '\n' || c == '\r').to_string()))
    }

    /// Detects the format and skips past the header, keeping hold of the
    /// first record line.
    fn read_preamble(&mut self) -> io::Result<()> {
        let first = match self.read_line()? {
            Some(line) => line,
            None => {
                self.preamble_finished = true;
                return Ok(());
            }
        };

        let format = AnnotationFormat::detect(&first);
        self.format = Some(format);

        let mut line = Some(first);
        while let Some(current) = line {
            if !format.is_preamble(&current) {
                self.pending = Some(current);
                break;
            }
            self.metadata.push_str(&current);
            self.metadata.push('\n');
            line = self.read_line()?;
        }

        self.preamble_finished = true;
        Ok(())
    }
}

impl<B: BufRead> Iterator for AnnotationReader<B> {
    type Item = io::Result<AnnotationRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.preamble_finished {
            if let Err(e) = self.read_preamble() {
                return Some(Err(e));
            }
        }
        let format = self.format?;

        loop {
            let line = match self.pending.take() {
                Some(line) => line,
                None => match self.read_line() {
                    Ok(Some(line)) => line,
                    Ok(None) => return None,
                    Err(e) => return Some(Err(e)),
                },
            };

            match format.parse_line(&line) {
                ParsedLine::Record(record) => {
                    self.stats.records += 1;
                    return Some(Ok(record));
                }
                ParsedLine::Negated => self.stats.negated += 1,
                ParsedLine::Malformed => {
                    log::debug!("Skipping malformed {:?} line: {:?}", format, line);
                    self.stats.malformed += 1;
                }
                ParsedLine::Blank => (),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::io::Cursor;

    fn read_all(input: &str) -> (Vec<AnnotationRecord>, AnnotationReader<Cursor<&str>>) {
        let mut reader = AnnotationReader::new(Cursor::new(input));
        let records = (&mut reader).collect::<io::Result<Vec<_>>>().unwrap();
        (records, reader)
    }

    const GAF: &str = "!gaf-version: 2.1
!Generated by GO Central
!
TAIR\tlocus:2031476\tENO1\t\tGO:0000015\tTAIR:AnalysisReference:501756966\tIEA\tInterPro:IPR000941\tC\tAT1G74030
TAIR\tlocus:2043067\tENOC\tNOT\tGO:0000015\tTAIR:AnalysisReference:501756966\tIEA\tInterPro:IPR000941\tC\tAT2G29560
TAIR\tlocus:2044851\tLOS2\tnot\tGO:0000015\tTAIR:AnalysisReference:501756966\tIEA\tInterPro:IPR000941\tC\tAT2G36530
TAIR\tlocus:2032970\tAT1G25260\tcontributes_to\tGO:0000027\tTAIR:AnalysisReference:501756966\tIEA\tInterPro:IPR033867\tP
TAIR\tlocus:2032970
";

    #[test]
    fn test_detect_format() {
        assert_eq!(AnnotationFormat::detect("!gaf-version: 2.1"), AnnotationFormat::Gaf);
        assert_eq!(AnnotationFormat::detect("(species=Arabidopsis)"), AnnotationFormat::Parenthesis);
        assert_eq!(AnnotationFormat::detect("Gene\tGO term"), AnnotationFormat::Tabular);
        assert_eq!(AnnotationFormat::detect("AT1G01010\tGO:0005634"), AnnotationFormat::Tabular);
        assert_eq!(AnnotationFormat::detect(""), AnnotationFormat::Tabular);
    }

    #[test]
    fn test_parse_gaf() {
        let (records, reader) = read_all(GAF);
        assert_eq!(reader.format(), Some(AnnotationFormat::Gaf));
        assert_eq!(records, vec![
            AnnotationRecord::new("ENO1", "GO:0000015"),
            AnnotationRecord::new("AT1G25260", "GO:0000027"),
        ]);
        assert_eq!(reader.stats(), IngestStats { records: 2, negated: 2, malformed: 1 });
        assert_eq!(reader.metadata(), Some("!gaf-version: 2.1\n!Generated by GO Central\n!\n"));
    }

    #[test]
    fn test_gaf_not_qualifier_voids_record() {
        let line = "UniProtKB\tP12345\tABC1\tNOT\tGO:0005634\tPMID:1\tIDA\t\tC";
        assert_eq!(AnnotationFormat::Gaf.parse_line(line), ParsedLine::Negated);
    }

    #[test]
    fn test_parse_parenthesis() {
        let input = "(species=Arabidopsis)(type=Biological Process)(curator=GO)
AT1G01010 = 0005634
AT1G01020 = 0016020
not a record
";
        let (records, reader) = read_all(input);
        assert_eq!(reader.format(), Some(AnnotationFormat::Parenthesis));
        assert_eq!(records, vec![
            AnnotationRecord::new("AT1G01010", "GO:0005634"),
            AnnotationRecord::new("AT1G01020", "GO:0016020"),
        ]);
        assert_eq!(reader.stats().malformed, 1);
    }

    #[test]
    fn test_parse_tabular_with_header() {
        let input = "SeqName\tDescription\tGO IDs
Contig_1\tputative kinase\t GO:0016301 \tGO:0005524
 Contig_2 \tno annotation
Contig_3\t\tGO:0005634\r
";
        let (records, reader) = read_all(input);
        assert_eq!(reader.format(), Some(AnnotationFormat::Tabular));
        assert_eq!(records, vec![
            AnnotationRecord::new("Contig_1", "GO:0016301"),
            AnnotationRecord::new("Contig_3", "GO:0005634"),
        ]);
        assert_eq!(reader.stats().malformed, 1);
        assert_eq!(reader.metadata(), Some("SeqName\tDescription\tGO IDs\n"));
    }

    #[test]
    fn test_parse_tabular_without_header() {
        let input = "g1\tGO:0000001\ng2\tGO:0000002\n";
        let (records, reader) = read_all(input);
        assert_eq!(records.len(), 2);
        assert_eq!(reader.metadata(), Some(""));
    }

    #[test]
    fn test_empty_input() {
        let (records, reader) = read_all("");
        assert!(records.is_empty());
        assert_eq!(reader.format(), None);
        assert_eq!(reader.metadata(), Some(""));
    }

    #[test]
    fn test_header_only_input() {
        let (records, reader) = read_all("!gaf-version: 2.1\n!\n");
        assert!(records.is_empty());
        assert_eq!(reader.format(), Some(AnnotationFormat::Gaf));
    }

    #[test]
    fn test_invalid_utf8_does_not_stop_reading() {
        let input: &[u8] = b"g1\tGO:0000001\ng2\tcaf\xe9\tGO:0000004\ng3\tGO:0000005\n";
        let mut reader = AnnotationReader::new(Cursor::new(input));
        let records = (&mut reader).collect::<io::Result<Vec<_>>>().unwrap();
        assert_eq!(records, vec![
            AnnotationRecord::new("g1", "GO:0000001"),
            AnnotationRecord::new("g2", "GO:0000004"),
            AnnotationRecord::new("g3", "GO:0000005"),
        ]);
        assert_eq!(reader.stats(), IngestStats { records: 3, negated: 0, malformed: 0 });
    }

    #[test]
    fn test_quotes_are_part_of_the_value() {
        let line = "DB\tP1\t\"ABC1\"\t\tGO:0005634\tPMID:1\tIDA\t\"quoted\tdescription\tC";
        assert_eq!(AnnotationFormat::Gaf.parse_line(line),
            ParsedLine::Record(AnnotationRecord::new("\"ABC1\"", "GO:0005634")));
    }

    #[test]
    fn test_parsing_is_repeatable() {
        let first: BTreeSet<_> = read_all(GAF).0.into_iter().collect();
        let second: BTreeSet<_> = read_all(GAF).0.into_iter().collect();
        assert_eq!(first, second);
    }
}
