use serde_json::{Map, Value};

use super::Parser;
use crate::content::type_name;
use crate::error::ParserError;
use crate::options::Options;

const FORMAT: &str = "csv";

/// Delimited text via the `csv` crate.
///
/// Loading yields an array of rows, each an array of strings, or an array of
/// objects keyed by the first row when `header=true`. Dumping takes an array
/// of records: when the first record is an object its keys become the header
/// and every record is written in that column order; otherwise each record
/// must be an array and is written as a positional row. `delimiter` selects a
/// single-byte separator (`tab` is accepted for `\t`).
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvParser;

fn delimiter(options: &Options) -> Result<u8, ParserError> {
    match options.get("delimiter") {
        None => Ok(b','),
        Some("tab") => Ok(b'\t'),
        Some(d) if d.len() == 1 && d.is_ascii() => Ok(d.as_bytes()[0]),
        Some(d) => Err(ParserError::options(
            FORMAT,
            format!("delimiter must be a single ASCII character, got '{d}'"),
        )),
    }
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn header_row(first: &Map<String, Value>) -> Vec<String> {
    // TODO: columns come from the first record only; decide whether later
    // records may widen the header before changing this
    first.keys().cloned().collect()
}

fn object_row(
    index: usize,
    record: &Value,
    header: &[String],
) -> Result<Vec<String>, ParserError> {
    let Value::Object(fields) = record else {
        return Err(ParserError::encode(
            FORMAT,
            format!(
                "record {index} is {} but the first record is an object",
                type_name(record)
            ),
        ));
    };

    if let Some(extra) = fields.keys().find(|k| !header.contains(k)) {
        return Err(ParserError::encode(
            FORMAT,
            format!("record {index} has field '{extra}' missing from the header"),
        ));
    }

    Ok(header
        .iter()
        .map(|name| fields.get(name).map(cell).unwrap_or_default())
        .collect())
}

fn positional_row(index: usize, record: &Value) -> Result<Vec<String>, ParserError> {
    match record {
        Value::Array(cells) => Ok(cells.iter().map(cell).collect()),
        other => Err(ParserError::encode(
            FORMAT,
            format!("record {index} is {}, expected an array", type_name(other)),
        )),
    }
}

impl Parser for CsvParser {
    fn name(&self) -> &str {
        FORMAT
    }

    fn load_content(&self, content: &[u8], options: &Options) -> Result<Value, ParserError> {
        let header = options
            .flag("header")
            .map_err(|e| ParserError::options(FORMAT, e))?;

        let mut reader = ::csv::ReaderBuilder::new()
            .has_headers(header)
            .delimiter(delimiter(options)?)
            .flexible(true)
            .from_reader(content);

        let names: Vec<String> = if header {
            reader
                .headers()
                .map_err(|e| ParserError::decode(FORMAT, e))?
                .iter()
                .map(str::to_string)
                .collect()
        } else {
            Vec::new()
        };

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| ParserError::decode(FORMAT, e))?;
            let row = if header {
                if record.len() > names.len() {
                    return Err(ParserError::decode(
                        FORMAT,
                        format!(
                            "line {} has {} fields but the header has {}",
                            record.position().map_or(0, |p| p.line()),
                            record.len(),
                            names.len()
                        ),
                    ));
                }
                let fields: Map<String, Value> = names
                    .iter()
                    .zip(record.iter())
                    .map(|(name, value)| (name.clone(), Value::String(value.to_string())))
                    .collect();
                Value::Object(fields)
            } else {
                Value::Array(
                    record
                        .iter()
                        .map(|value| Value::String(value.to_string()))
                        .collect(),
                )
            };
            rows.push(row);
        }

        Ok(Value::Array(rows))
    }

    fn dump_content(&self, value: &Value, options: &Options) -> Result<Vec<u8>, ParserError> {
        let Value::Array(records) = value else {
            return Err(ParserError::encode(
                FORMAT,
                format!("expected an array of records, got {}", type_name(value)),
            ));
        };

        let mut writer = ::csv::WriterBuilder::new()
            .delimiter(delimiter(options)?)
            .terminator(::csv::Terminator::Any(b'\n'))
            .flexible(true)
            .from_writer(Vec::new());

        let mut write = |row: Vec<String>| {
            writer
                .write_record(&row)
                .map_err(|e| ParserError::encode(FORMAT, e))
        };

        match records.first() {
            None => {}
            Some(Value::Object(first)) => {
                let header = header_row(first);
                write(header.clone())?;
                for (index, record) in records.iter().enumerate() {
                    write(object_row(index, record, &header)?)?;
                }
            }
            Some(_) => {
                for (index, record) in records.iter().enumerate() {
                    write(positional_row(index, record)?)?;
                }
            }
        }

        writer
            .into_inner()
            .map_err(|e| ParserError::encode(FORMAT, e.error()))
    }
}
