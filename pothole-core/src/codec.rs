//! Flat row codec for pothole records.
//!
//! Each record is one comma-separated row with the fixed column order
//! `id,latitude,longitude,timestamp,confidence,image_path`. Absent optional
//! fields are written as empty strings and read back as `None`.
//!
//! Fields containing a comma, a double quote or a line break are quoted with
//! doubled inner quotes, so the reader in [`parse_rows`] tracks quoting across
//! physical lines.

use std::str::FromStr;

use crate::error::{PotholeError, Result};
use crate::record::PotholeRecord;

/// Column order of the persisted file.
pub const COLUMNS: [&str; 6] = [
    "id",
    "latitude",
    "longitude",
    "timestamp",
    "confidence",
    "image_path",
];

/// Rows written before detection support only carry the first four columns.
const REQUIRED_COLUMNS: usize = 4;

/// A parsed physical row, before decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    /// 1-based line on which the row starts
    pub line: usize,
    pub fields: Vec<String>,
}

impl Row {
    /// Whether this row is a header (first field is the literal `id`).
    pub fn is_header(&self) -> bool {
        self.fields.first().map(|f| f.trim()) == Some(COLUMNS[0])
    }

    /// Identifier of the row, if its first field parses.
    ///
    /// Used for id bookkeeping even when the rest of the row is unreadable.
    pub fn id(&self) -> Option<u64> {
        self.fields.first().and_then(|f| f.trim().parse().ok())
    }

    /// Re-encode the row exactly as parsed.
    pub fn encode(&self) -> String {
        encode_fields(self.fields.as_slice())
    }

    /// Decode this row into a record.
    pub fn decode(&self) -> Result<PotholeRecord> {
        decode(self.fields.as_slice())
    }
}

/// The header line, terminated by a newline.
pub fn header() -> String {
    encode_fields(&COLUMNS[..])
}

/// Whether a row's fields exactly match the fixed schema.
pub fn is_exact_header(fields: &[String]) -> bool {
    fields.len() == COLUMNS.len() && fields.iter().zip(COLUMNS).all(|(f, c)| f == c)
}

/// Encode a record as a newline-terminated row.
pub fn encode(record: &PotholeRecord) -> String {
    let fields = [
        record.id.to_string(),
        record.latitude.to_string(),
        record.longitude.to_string(),
        record.timestamp.clone(),
        record.confidence.map(|c| c.to_string()).unwrap_or_default(),
        record.image_path.clone().unwrap_or_default(),
    ];
    encode_fields(&fields[..])
}

/// Encode arbitrary fields as a newline-terminated row.
pub fn encode_fields<S: AsRef<str>>(fields: &[S]) -> String {
    let mut out = String::new();
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        let field = field.as_ref();
        if field.contains([',', '"', '\n', '\r']) {
            out.push('"');
            out.push_str(&field.replace('"', "\"\""));
            out.push('"');
        } else {
            out.push_str(field);
        }
    }
    out.push('\n');
    out
}

/// Decode the fields of one row.
///
/// Fails with [`PotholeError::MalformedRecord`] when a required field is
/// missing or not numeric, when the id is zero, when a present confidence is
/// not numeric, or when the row has more columns than the schema.
pub fn decode<S: AsRef<str>>(fields: &[S]) -> Result<PotholeRecord> {
    if fields.len() < REQUIRED_COLUMNS || fields.len() > COLUMNS.len() {
        return Err(PotholeError::MalformedRecord(format!(
            "expected {} fields, found {}",
            COLUMNS.len(),
            fields.len()
        )));
    }
    let field = |i: usize| fields.get(i).map(|f| f.as_ref()).unwrap_or("");

    let id = parse_required::<u64>(field(0), "id")?;
    if id == 0 {
        return Err(PotholeError::MalformedRecord("id must be positive".to_string()));
    }
    let latitude = parse_required::<f64>(field(1), "latitude")?;
    let longitude = parse_required::<f64>(field(2), "longitude")?;

    let timestamp = field(3).to_string();
    if timestamp.trim().is_empty() {
        return Err(PotholeError::MalformedRecord(format!(
            "record {id} has an empty timestamp"
        )));
    }

    let confidence = match field(4).trim() {
        "" => None,
        raw => Some(parse_required::<f64>(raw, "confidence")?),
    };
    let image_path = Some(field(5)).filter(|p| !p.is_empty()).map(str::to_string);

    Ok(PotholeRecord {
        id,
        latitude,
        longitude,
        timestamp,
        confidence,
        image_path,
    })
}

/// Parse and decode a single row of text.
pub fn decode_line(line: &str) -> Result<PotholeRecord> {
    match parse_rows(line).as_slice() {
        [row] => row.decode(),
        rows => Err(PotholeError::MalformedRecord(format!(
            "expected one row, found {}",
            rows.len()
        ))),
    }
}

fn parse_required<T: FromStr>(raw: &str, column: &str) -> Result<T> {
    raw.trim().parse().map_err(|_| {
        PotholeError::MalformedRecord(format!("{column} is not numeric: {raw:?}"))
    })
}

/// Split file contents into rows, honoring quoted fields.
///
/// Blank lines are dropped. Both `\n` and `\r\n` terminate rows.
pub fn parse_rows(text: &str) -> Vec<Row> {
    let mut rows = Vec::new();
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut row_start = 1;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.is_empty() => in_quotes = true,
            ',' => fields.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                fields.push(std::mem::take(&mut field));
                push_row(&mut rows, row_start, std::mem::take(&mut fields));
                line += 1;
                row_start = line;
            }
            _ => field.push(c),
        }
    }

    if !field.is_empty() || !fields.is_empty() {
        fields.push(field);
        push_row(&mut rows, row_start, fields);
    }

    rows
}

fn push_row(rows: &mut Vec<Row>, line: usize, fields: Vec<String>) {
    let blank = fields.len() == 1 && fields[0].trim().is_empty();
    if !blank {
        rows.push(Row { line, fields });
    }
}
