use crate::dataset::Dataset;
use crate::error::SalesError;
use crate::record::{columns, to_frame, Transaction, TIME_FORMAT};
use calamine::{open_workbook_auto, Data, DataType, Range, Reader};
use chrono::{NaiveDate, NaiveTime};
use log::{debug, info};
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;
use std::time;

/// Reads a transaction source into a [`Dataset`].
pub trait Loader {
    fn load(&self, path: &Path) -> Result<Dataset, SalesError>;
}

/// Position of the transaction table inside a workbook.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetLayout {
    pub sheet: String,
    /// 0-indexed row holding the header
    pub header_row: u32,
    /// 0-indexed, inclusive
    pub first_column: u32,
    pub last_column: u32,
    pub max_rows: usize,
}

impl Default for SheetLayout {
    fn default() -> Self {
        SheetLayout {
            sheet: "Sales".to_string(),
            header_row: 3,
            first_column: 1,
            last_column: 17,
            max_rows: 1000,
        }
    }
}

impl SheetLayout {
    pub fn from_config(sheet: &config::Sheet) -> Result<Self, SalesError> {
        let (first_column, last_column) = parse_column_range(&sheet.usecols)?;
        Ok(SheetLayout {
            sheet: sheet.name.clone(),
            header_row: sheet.skip_rows,
            first_column,
            last_column,
            max_rows: sheet.nrows,
        })
    }
}

/// Turns `"B:R"` into 0-indexed inclusive bounds `(1, 17)`.
pub fn parse_column_range(usecols: &str) -> Result<(u32, u32), SalesError> {
    let invalid = || SalesError::ColumnRange(usecols.to_string());
    let (first, last) = usecols.split_once(':').ok_or_else(invalid)?;
    let first = column_index(first.trim()).ok_or_else(invalid)?;
    let last = column_index(last.trim()).ok_or_else(invalid)?;
    if first > last {
        return Err(invalid());
    }
    Ok((first, last))
}

fn column_index(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    let mut index: u32 = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let digit = c.to_ascii_uppercase() as u32 - 'A' as u32 + 1;
        index = index.checked_mul(26)?.checked_add(digit)?;
    }
    Some(index - 1)
}

/// Spreadsheet reader backed by calamine; handles xlsx, xls and ods.
#[derive(Debug, Clone, Default)]
pub struct SheetLoader {
    layout: SheetLayout,
}

impl SheetLoader {
    pub fn new(layout: SheetLayout) -> Self {
        SheetLoader { layout }
    }

    pub fn layout(&self) -> &SheetLayout {
        &self.layout
    }
}

impl Loader for SheetLoader {
    fn load(&self, path: &Path) -> Result<Dataset, SalesError> {
        let start = time::Instant::now();
        let mut workbook = open_workbook_auto(path).map_err(|source| SalesError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let range = workbook
            .worksheet_range(&self.layout.sheet)
            .map_err(|source| SalesError::Sheet {
                name: self.layout.sheet.clone(),
                source,
            })?;
        let records = parse_range(&range, &self.layout)?;
        let frame = to_frame(&records)?;
        let duration = time::Instant::now().duration_since(start);
        info!(
            "loaded {} transactions from {:?}, cost {}ms",
            records.len(),
            path,
            duration.as_millis()
        );
        Ok(Dataset::new(path, frame))
    }
}

struct Header {
    index: HashMap<String, u32>,
}

impl Header {
    fn read(range: &Range<Data>, layout: &SheetLayout) -> Self {
        let mut index = HashMap::new();
        for c in layout.first_column..=layout.last_column {
            if let Some(name) = text(range.get_value((layout.header_row, c))) {
                index.entry(name).or_insert(c);
            }
        }
        debug!("header columns: {:?}", index);
        Header { index }
    }

    fn required(&self, name: &str) -> Result<u32, SalesError> {
        self.optional(name)
            .ok_or_else(|| SalesError::MissingColumn(name.to_string()))
    }

    fn optional(&self, name: &str) -> Option<u32> {
        self.index.get(name).copied()
    }
}

/// Parses the data rows below the header. Stops at the row cap, the end of
/// the sheet or the first fully blank row. Any bad row fails the whole load.
pub fn parse_range(
    range: &Range<Data>,
    layout: &SheetLayout,
) -> Result<Vec<Transaction>, SalesError> {
    let header = Header::read(range, layout);
    for name in columns::REQUIRED {
        header.required(name)?;
    }
    let city = header.required(columns::CITY)?;
    let customer_type = header.required(columns::CUSTOMER_TYPE)?;
    let gender = header.required(columns::GENDER)?;
    let product_line = header.required(columns::PRODUCT_LINE)?;
    let total = header.required(columns::TOTAL)?;
    let rating = header.required(columns::RATING)?;
    let time_col = header.required(columns::TIME)?;
    let invoice_id = header.optional(columns::INVOICE_ID);
    let branch = header.optional(columns::BRANCH);
    let unit_price = header.optional(columns::UNIT_PRICE);
    let quantity = header.optional(columns::QUANTITY);
    let tax = header.optional(columns::TAX);
    let date = header.optional(columns::DATE);
    let payment = header.optional(columns::PAYMENT);

    let last_row = match range.end() {
        Some((row, _)) => row,
        None => return Ok(vec![]),
    };

    let mut records = Vec::new();
    let mut row = layout.header_row + 1;
    while row <= last_row && records.len() < layout.max_rows {
        let cell = |c: u32| range.get_value((row, c));
        let blank = (layout.first_column..=layout.last_column)
            .all(|c| cell(c).map_or(true, |d| d.is_empty()));
        if blank {
            debug!("blank row {} ends the table", row + 1);
            break;
        }

        let malformed = |column: &str, reason: String| SalesError::MalformedInput {
            row: row + 1,
            column: column.to_string(),
            reason,
        };
        let category = |c: u32, name: &str| {
            text(cell(c)).ok_or_else(|| malformed(name, "missing value".to_string()))
        };
        let number = |c: u32, name: &str| {
            cell(c)
                .and_then(|d| d.as_f64())
                .ok_or_else(|| malformed(name, "expected a number".to_string()))
        };
        let optional_number = |c: Option<u32>, name: &str| -> Result<Option<f64>, SalesError> {
            match c.and_then(|c| cell(c)).filter(|d| !d.is_empty()) {
                Some(d) => d
                    .as_f64()
                    .map(Some)
                    .ok_or_else(|| malformed(name, format!("expected a number, found {d}"))),
                None => Ok(None),
            }
        };

        let rating_value = number(rating, columns::RATING)?;
        if !(0.0..=10.0).contains(&rating_value) {
            return Err(malformed(
                columns::RATING,
                format!("{rating_value} is outside 0-10"),
            ));
        }
        let time_value = match cell(time_col) {
            Some(d) => parse_time(d).map_err(|reason| malformed(columns::TIME, reason))?,
            None => return Err(malformed(columns::TIME, "missing value".to_string())),
        };
        let date_value = match date.and_then(|c| cell(c)).filter(|d| !d.is_empty()) {
            Some(d) => Some(parse_date(d).map_err(|reason| malformed(columns::DATE, reason))?),
            None => None,
        };
        let quantity_value = match quantity.and_then(|c| cell(c)).filter(|d| !d.is_empty()) {
            Some(Data::Float(f)) if f.fract() != 0.0 => {
                return Err(malformed(
                    columns::QUANTITY,
                    format!("expected an integer, found {f}"),
                ));
            }
            Some(d) => Some(d.as_i64().ok_or_else(|| {
                malformed(columns::QUANTITY, format!("expected an integer, found {d}"))
            })?),
            None => None,
        };

        records.push(Transaction {
            invoice_id: invoice_id.and_then(|c| text(cell(c))),
            branch: branch.and_then(|c| text(cell(c))),
            city: category(city, columns::CITY)?,
            customer_type: category(customer_type, columns::CUSTOMER_TYPE)?,
            gender: category(gender, columns::GENDER)?,
            product_line: category(product_line, columns::PRODUCT_LINE)?,
            unit_price: optional_number(unit_price, columns::UNIT_PRICE)?,
            quantity: quantity_value,
            tax: optional_number(tax, columns::TAX)?,
            total: number(total, columns::TOTAL)?,
            date: date_value,
            time: time_value,
            payment: payment.and_then(|c| text(cell(c))),
            rating: rating_value,
        });
        row += 1;
    }
    Ok(records)
}

fn text(cell: Option<&Data>) -> Option<String> {
    match cell {
        None | Some(Data::Empty) => None,
        Some(Data::String(s)) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Some(other) => Some(other.to_string()),
    }
}

fn time_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d{2}:\d{2}:\d{2}$").unwrap())
}

/// Strict `HH:MM:SS` for text cells; native time cells use their time of day.
fn parse_time(cell: &Data) -> Result<NaiveTime, String> {
    match cell {
        Data::DateTime(_) | Data::DurationIso(_) => cell
            .as_time()
            .ok_or_else(|| format!("{cell} is not a time of day")),
        Data::String(s) | Data::DateTimeIso(s) => {
            let s = s.trim();
            if !time_pattern().is_match(s) {
                return Err(format!("{s:?} does not match HH:MM:SS"));
            }
            NaiveTime::parse_from_str(s, TIME_FORMAT).map_err(|e| format!("{s:?}: {e}"))
        }
        other => Err(format!("expected HH:MM:SS, found {other}")),
    }
}

fn parse_date(cell: &Data) -> Result<NaiveDate, String> {
    match cell {
        Data::DateTime(_) | Data::DateTimeIso(_) => cell
            .as_date()
            .ok_or_else(|| format!("{cell} is not a date")),
        Data::String(s) => {
            let s = s.trim();
            NaiveDate::parse_from_str(s, "%m/%d/%Y")
                .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
                .map_err(|e| format!("{s:?}: {e}"))
        }
        other => Err(format!("expected a date, found {other}")),
    }
}
