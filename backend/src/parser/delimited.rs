//! Delimited text (CSV) reader with encoding and delimiter auto-detection.

use chrono::{NaiveDate, NaiveDateTime};

use super::{is_missing_marker, normalize_headers};
use crate::error::{LoadResult, ParseError};
use crate::models::{Cell, Column, Table};

/// Candidate delimiters, in tie-break order.
const DELIMITERS: [char; 4] = [',', ';', '\t', '|'];

/// How many leading bytes are checked for binary content.
const BINARY_SNIFF_LEN: usize = 8192;

/// CSV parsing error with context
#[derive(Debug, Clone)]
pub struct CsvError {
    pub line: usize,
    pub column: Option<String>,
    pub value: Option<String>,
    pub message: String,
}

impl std::fmt::Display for CsvError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.column, &self.value) {
            (Some(col), Some(val)) => {
                write!(f, "Line {}, column '{}' (value '{}'): {}", self.line, col, val, self.message)
            }
            (Some(col), None) => {
                write!(f, "Line {}, column '{}': {}", self.line, col, self.message)
            }
            _ => {
                write!(f, "Line {}: {}", self.line, self.message)
            }
        }
    }
}

impl std::error::Error for CsvError {}

impl CsvError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            column: None,
            value: None,
            message: message.into(),
        }
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// Result of parsing with metadata
#[derive(Debug, Clone)]
pub struct ParsedCsv {
    pub table: Table,
    /// Detected encoding
    pub encoding: String,
    /// Detected delimiter
    pub delimiter: char,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    if bytes.starts_with(b"\xEF\xBB\xBF") || std::str::from_utf8(bytes).is_ok() {
        return "utf-8".to_string();
    }

    let charset = chardet::detect(bytes).0;

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        "" => "windows-1252".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes using the named encoding. Unknown labels fall back to UTF-8.
///
/// A UTF-8 byte order mark is stripped.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    let encoding = encoding_rs::Encoding::for_label(encoding.as_bytes()).unwrap_or(encoding_rs::UTF_8);
    let (decoded, _, _) = encoding.decode(bytes);
    decoded.into_owned()
}

/// Detect the delimiter by counting occurrences in the first non-blank line.
///
/// Falls back to `,` when no candidate occurs.
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content
        .lines()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("");

    let mut best = ',';
    let mut best_count = 0;

    for &sep in &DELIMITERS {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best = sep;
        }
    }

    best
}

/// Parse CSV bytes with auto-detection of encoding and delimiter.
pub fn parse_bytes_auto(bytes: &[u8]) -> LoadResult<ParsedCsv> {
    if bytes.is_empty() {
        return Err(ParseError::EmptyFile);
    }

    let sniff = &bytes[..bytes.len().min(BINARY_SNIFF_LEN)];
    if sniff.contains(&0) {
        return Err(CsvError::new(1, "File contains binary data, not delimited text").into());
    }

    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    let delimiter = detect_delimiter(&content);
    let table = parse_str(&content, delimiter)?;

    Ok(ParsedCsv {
        table,
        encoding,
        delimiter,
    })
}

/// Parse CSV text with an explicit delimiter.
///
/// The first non-blank record is the header. Records shorter than the header
/// are padded with missing cells; longer ones are an error unless the extra
/// fields are empty (trailing delimiters).
///
/// # Example
/// ```ignore
/// use tabconv::parser::parse_str;
///
/// let table = parse_str("name;age\nAlice;30\nBob;25", ';').unwrap();
/// assert_eq!(table.row_count(), 2);
/// ```
pub fn parse_str(content: &str, delimiter: char) -> LoadResult<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter_byte(delimiter)?)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut records = reader.records();

    let headers = loop {
        match records.next() {
            None => return Err(ParseError::EmptyFile),
            Some(result) => {
                let record = result.map_err(read_error)?;
                if is_blank(&record) {
                    continue;
                }
                break normalize_headers(record.iter().map(String::from));
            }
        }
    };

    let mut raw_rows: Vec<Vec<String>> = Vec::new();

    for result in records {
        let record = result.map_err(read_error)?;
        if is_blank(&record) {
            continue;
        }

        let extra_fields = record.iter().skip(headers.len()).any(|f| !f.trim().is_empty());
        if extra_fields {
            let line = record.position().map_or(0, |p| p.line() as usize);
            return Err(CsvError::new(
                line,
                format!("Expected {} fields, saw {}", headers.len(), record.len()),
            )
            .into());
        }

        raw_rows.push(record.iter().take(headers.len()).map(String::from).collect());
    }

    let row_count = raw_rows.len();

    let columns = headers
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            let raw: Vec<Option<&str>> = raw_rows
                .iter()
                .map(|row| row.get(i).map(String::as_str).filter(|v| !is_missing_marker(v)))
                .collect();
            infer_column(name, &raw)
        })
        .collect();

    Ok(Table::new(columns, row_count))
}

fn read_error(e: csv::Error) -> CsvError {
    let line = e.position().map_or(0, |p| p.line() as usize);
    CsvError::new(line, e.to_string())
}

/// A line holding only whitespace.
fn is_blank(record: &csv::StringRecord) -> bool {
    record.len() == 1 && record[0].trim().is_empty()
}

fn delimiter_byte(delimiter: char) -> LoadResult<u8> {
    u8::try_from(delimiter)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| CsvError::new(0, format!("Delimiter '{}' is not ASCII", delimiter)).into())
}

/// Type a column of raw strings: numeric, then boolean, then date, else text.
fn infer_column(name: String, raw: &[Option<&str>]) -> Column {
    let convert = |parse: fn(&str) -> Option<Cell>| -> Option<Vec<Cell>> {
        raw.iter()
            .map(|value| match value {
                None => Some(Cell::Missing),
                Some(v) => parse(v.trim()),
            })
            .collect()
    };

    let values = convert(parse_number)
        .or_else(|| convert(parse_bool))
        .or_else(|| convert(parse_date))
        .unwrap_or_else(|| {
            raw.iter()
                .map(|value| value.map_or(Cell::Missing, |v| Cell::Text(v.to_string())))
                .collect()
        });

    Column::new(name, values)
}

fn parse_number(value: &str) -> Option<Cell> {
    value
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .map(Cell::Number)
}

fn parse_bool(value: &str) -> Option<Cell> {
    if value.eq_ignore_ascii_case("true") {
        Some(Cell::Bool(true))
    } else if value.eq_ignore_ascii_case("false") {
        Some(Cell::Bool(false))
    } else {
        None
    }
}

/// ISO dates and datetimes, what the exporter writes back.
pub(crate) fn parse_date(value: &str) -> Option<Cell> {
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(Cell::Date);
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(Cell::Date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ColumnKind;

    fn parse(csv: &str, delimiter: char) -> Table {
        parse_str(csv, delimiter).unwrap()
    }

    #[test]
    fn test_simple_csv() {
        let table = parse("name;age\nAlice;30\nBob;25", ';');

        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column_names(), vec!["name", "age"]);
        assert_eq!(table.row(0), vec![&Cell::Text("Alice".into()), &Cell::Number(30.0)]);
        assert_eq!(table.column("age").unwrap().kind, ColumnKind::Numeric);
    }

    #[test]
    fn test_quoted_values() {
        let table = parse("name,value\n\"Doe, Jane\",\"Hello World\"", ',');

        assert_eq!(table.row(0)[0], &Cell::Text("Doe, Jane".into()));
        assert_eq!(table.row(0)[1], &Cell::Text("Hello World".into()));
    }

    #[test]
    fn test_empty_lines_skipped() {
        let table = parse("a;b\n1;2\n\n3;4\n", ';');
        assert_eq!(table.row_count(), 2);
    }

    #[test]
    fn test_missing_values() {
        let table = parse("a;b;c\n1;;3\n4;NA;n/a", ';');

        assert_eq!(table.row(0)[1], &Cell::Missing);
        assert_eq!(table.row(1)[1], &Cell::Missing);
        // "n/a" is not a marker, so the column stays text
        assert_eq!(table.column("c").unwrap().kind, ColumnKind::Text);
        assert_eq!(table.column("b").unwrap().kind, ColumnKind::Numeric);
    }

    #[test]
    fn test_short_rows_padded() {
        let table = parse("a,b,c\n1,2", ',');
        assert_eq!(table.row(0), vec![&Cell::Number(1.0), &Cell::Number(2.0), &Cell::Missing]);
    }

    #[test]
    fn test_extra_fields_rejected() {
        let err = parse_str("a,b\n1,2\n1,2,3,4", ',').unwrap_err();
        match err {
            ParseError::Csv(e) => {
                assert_eq!(e.line, 3);
                assert!(e.message.contains("Expected 2 fields, saw 4"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_trailing_delimiter_accepted() {
        let table = parse("a,b\n1,2,\n", ',');
        assert_eq!(table.row(0), vec![&Cell::Number(1.0), &Cell::Number(2.0)]);
    }

    #[test]
    fn test_kind_inference() {
        let table = parse(
            "n,flag,day,label\n1.5,true,2024-01-15,x\n-2,FALSE,2024-01-16 08:00:00,7\n",
            ',',
        );

        let kinds: Vec<ColumnKind> = table.columns().iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![ColumnKind::Numeric, ColumnKind::Boolean, ColumnKind::Date, ColumnKind::Text]
        );
        // Mixed text column keeps numbers as text
        assert_eq!(table.row(1)[3], &Cell::Text("7".into()));
    }

    #[test]
    fn test_non_finite_is_text() {
        let table = parse("x\ninf\n1", ',');
        assert_eq!(table.column("x").unwrap().kind, ColumnKind::Text);
    }

    #[test]
    fn test_duplicate_headers_mangled() {
        let table = parse("a,a,\n1,2,3", ',');
        assert_eq!(table.column_names(), vec!["a", "a.1", "Unnamed: 2"]);
    }

    #[test]
    fn test_header_only() {
        let table = parse("a,b\n", ',');
        assert_eq!(table.row_count(), 0);
        assert_eq!(table.column_count(), 2);
    }

    #[test]
    fn test_empty_csv_error() {
        assert!(matches!(parse_str("", ','), Err(ParseError::EmptyFile)));
        assert!(matches!(parse_bytes_auto(b""), Err(ParseError::EmptyFile)));
        assert!(matches!(parse_str("\n\n", ','), Err(ParseError::EmptyFile)));
    }

    #[test]
    fn test_binary_content_rejected() {
        let bytes = b"PK\x03\x04\x14\x00\x00\x00\x08\x00";
        assert!(matches!(parse_bytes_auto(bytes), Err(ParseError::Csv(_))));
    }

    #[test]
    fn test_error_message_format() {
        let err = CsvError::new(5, "Invalid value")
            .with_column("age")
            .with_value("abc");

        let msg = err.to_string();
        assert!(msg.contains("Line 5"));
        assert!(msg.contains("column 'age'"));
        assert!(msg.contains("value 'abc'"));
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), ',');
        assert_eq!(detect_delimiter("a\tb\tc\n1\t2\t3"), '\t');
        assert_eq!(detect_delimiter("a|b|c\n1|2|3"), '|');
        assert_eq!(detect_delimiter("single\n1"), ',');
    }

    #[test]
    fn test_auto_parse() {
        let result = parse_bytes_auto("name;age\nAlice;30\nBob;25".as_bytes()).unwrap();

        assert_eq!(result.delimiter, ';');
        assert_eq!(result.encoding, "utf-8");
        assert_eq!(result.table.row_count(), 2);
    }

    #[test]
    fn test_utf8_bom_stripped() {
        let result = parse_bytes_auto(b"\xEF\xBB\xBFid,name\n1,x\n").unwrap();
        assert_eq!(result.table.column_names(), vec!["id", "name"]);
    }

    #[test]
    fn test_latin1_decoding() {
        // "Société" in ISO-8859-1
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        let decoded = decode_content(bytes, "iso-8859-1");
        assert_eq!(decoded, "Société");
    }
}
