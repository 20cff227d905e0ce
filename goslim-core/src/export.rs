use std::io::Write;
use serde::Serialize;

use crate::error::SlimResult;

pub const SLIM_HEADER: &str = "Gene\tGOSlim Term\n";

/// One row of the slim annotation table.
#[derive(Debug, Serialize)]
pub struct SlimRecord<'a> {
    pub gene: &'a str,
    pub slim_term: &'a str,
}

pub struct SlimExporter<I: Iterator> {
    header: String,
    record_iter: I,
}

impl<T, I: Iterator<Item=T>> SlimExporter<I>
    where T: Serialize
{
    pub fn new(header: String, record_iter: I) -> SlimExporter<I> {
        SlimExporter { header, record_iter }
    }

    /// Writes the header followed by one tab-separated row per record,
    /// returning the number of rows.
    pub fn write_all<W: Write>(&mut self, mut writer: W) -> SlimResult<usize> {
        write!(&mut writer, "{}", self.header).map_err(csv::Error::from)?;

        let mut csv_writer = csv::WriterBuilder::new()
            .has_headers(false)
            .delimiter(b'\t')
            .quote_style(csv::QuoteStyle::Never)
            .from_writer(writer);
        let mut rows = 0;
        for record in &mut self.record_iter {
            csv_writer.serialize(record)?;
            rows += 1;
        }
        csv_writer.flush().map_err(csv::Error::from)?;
        Ok(rows)
    }
}
