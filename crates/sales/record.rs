use chrono::{NaiveDate, NaiveTime, Timelike};
use polars::prelude::*;

/// Column names, as they appear in the sheet header.
pub mod columns {
    pub const INVOICE_ID: &str = "Invoice ID";
    pub const BRANCH: &str = "Branch";
    pub const CITY: &str = "City";
    pub const CUSTOMER_TYPE: &str = "Customer_type";
    pub const GENDER: &str = "Gender";
    pub const PRODUCT_LINE: &str = "Product line";
    pub const UNIT_PRICE: &str = "Unit price";
    pub const QUANTITY: &str = "Quantity";
    pub const TAX: &str = "Tax 5%";
    pub const TOTAL: &str = "Total";
    pub const DATE: &str = "Date";
    pub const TIME: &str = "Time";
    pub const PAYMENT: &str = "Payment";
    pub const RATING: &str = "Rating";
    /// derived from `Time` at load
    pub const HOUR: &str = "hour";

    pub const REQUIRED: [&str; 7] = [
        CITY,
        CUSTOMER_TYPE,
        GENDER,
        PRODUCT_LINE,
        TOTAL,
        RATING,
        TIME,
    ];
}

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M:%S";

/// One sale.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub invoice_id: Option<String>,
    pub branch: Option<String>,
    pub city: String,
    pub customer_type: String,
    pub gender: String,
    pub product_line: String,
    pub unit_price: Option<f64>,
    pub quantity: Option<i64>,
    pub tax: Option<f64>,
    pub total: f64,
    pub date: Option<NaiveDate>,
    pub time: NaiveTime,
    pub payment: Option<String>,
    pub rating: f64,
}

impl Transaction {
    pub fn hour(&self) -> u32 {
        self.time.hour()
    }
}

/// Builds the in-memory table from parsed records, one column per attribute
/// plus the derived `hour`.
pub fn to_frame(records: &[Transaction]) -> PolarsResult<DataFrame> {
    use columns::*;

    fn strings<F: Fn(&Transaction) -> String>(records: &[Transaction], f: F) -> Vec<String> {
        records.iter().map(f).collect()
    }

    DataFrame::new(vec![
        Series::new(
            INVOICE_ID,
            records
                .iter()
                .map(|r| r.invoice_id.clone())
                .collect::<Vec<_>>(),
        ),
        Series::new(
            BRANCH,
            records.iter().map(|r| r.branch.clone()).collect::<Vec<_>>(),
        ),
        Series::new(CITY, strings(records, |r| r.city.clone())),
        Series::new(CUSTOMER_TYPE, strings(records, |r| r.customer_type.clone())),
        Series::new(GENDER, strings(records, |r| r.gender.clone())),
        Series::new(PRODUCT_LINE, strings(records, |r| r.product_line.clone())),
        Series::new(
            UNIT_PRICE,
            records.iter().map(|r| r.unit_price).collect::<Vec<_>>(),
        ),
        Series::new(
            QUANTITY,
            records.iter().map(|r| r.quantity).collect::<Vec<_>>(),
        ),
        Series::new(TAX, records.iter().map(|r| r.tax).collect::<Vec<_>>()),
        Series::new(TOTAL, records.iter().map(|r| r.total).collect::<Vec<f64>>()),
        Series::new(
            DATE,
            records
                .iter()
                .map(|r| r.date.map(|d| d.format(DATE_FORMAT).to_string()))
                .collect::<Vec<_>>(),
        ),
        Series::new(
            TIME,
            strings(records, |r| r.time.format(TIME_FORMAT).to_string()),
        ),
        Series::new(
            PAYMENT,
            records.iter().map(|r| r.payment.clone()).collect::<Vec<_>>(),
        ),
        Series::new(
            RATING,
            records.iter().map(|r| r.rating).collect::<Vec<f64>>(),
        ),
        Series::new(
            HOUR,
            records.iter().map(|r| r.hour() as i32).collect::<Vec<i32>>(),
        ),
    ])
}
