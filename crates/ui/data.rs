use serde::{Deserialize, Deserializer, Serialize};

fn deserialize_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value: serde_json::Value = Deserialize::deserialize(deserializer)?;
    match value {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Null => Ok(String::new()),
        _ => Err(serde::de::Error::custom("Expected string|number|null")),
    }
}

/// One row of the filtered table, every cell already rendered as text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Data {
    #[serde(rename = "Invoice ID", default, deserialize_with = "deserialize_string")]
    pub invoice_id: String,
    #[serde(rename = "Branch", default, deserialize_with = "deserialize_string")]
    pub branch: String,
    #[serde(rename = "City")]
    pub city: String,
    #[serde(rename = "Customer_type")]
    pub customer_type: String,
    #[serde(rename = "Gender")]
    pub gender: String,
    #[serde(rename = "Product line")]
    pub product_line: String,
    #[serde(rename = "Quantity", default, deserialize_with = "deserialize_string")]
    pub quantity: String,
    #[serde(rename = "Total", deserialize_with = "deserialize_string")]
    pub total: String,
    #[serde(rename = "Date", default, deserialize_with = "deserialize_string")]
    pub date: String,
    #[serde(rename = "Time")]
    pub time: String,
    #[serde(rename = "Payment", default, deserialize_with = "deserialize_string")]
    pub payment: String,
    #[serde(rename = "Rating", deserialize_with = "deserialize_string")]
    pub rating: String,
}

impl Data {
    /// Frame columns backing each field, in display order.
    pub const COLUMNS: [&'static str; 12] = [
        "Invoice ID",
        "Branch",
        "City",
        "Customer_type",
        "Gender",
        "Product line",
        "Quantity",
        "Total",
        "Date",
        "Time",
        "Payment",
        "Rating",
    ];

    pub const fn ref_array(&self) -> [&String; 12] {
        [
            &self.invoice_id,
            &self.branch,
            &self.city,
            &self.customer_type,
            &self.gender,
            &self.product_line,
            &self.quantity,
            &self.total,
            &self.date,
            &self.time,
            &self.payment,
            &self.rating,
        ]
    }
}

/// Headline numbers shown in the three tiles.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Kpis {
    pub total_sales: i64,
    pub average_rating: f64,
    pub stars: String,
    pub average_sale: f64,
}

impl Kpis {
    pub fn total_sales_text(&self) -> String {
        format!("US $ {}", format_thousands(self.total_sales))
    }

    pub fn rating_text(&self) -> String {
        format!("{:.1} {}", self.average_rating, self.stars)
    }

    pub fn average_sale_text(&self) -> String {
        format!("US $ {:.2}", self.average_sale)
    }
}

/// Everything the dashboard draws for one filter state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct View {
    pub kpis: Kpis,
    pub rows: Vec<Data>,
    pub sales_by_product_line: Vec<(String, f64)>,
    pub sales_by_hour: Vec<(u32, f64)>,
}

/// A multi-select filter list.
#[derive(Debug, Clone, PartialEq)]
pub struct Facet {
    pub label: String,
    pub options: Vec<String>,
    pub selected: Vec<bool>,
}

impl Facet {
    /// Every option selected.
    pub fn all(label: &str, options: Vec<String>) -> Self {
        let selected = vec![true; options.len()];
        Facet {
            label: label.to_string(),
            options,
            selected,
        }
    }

    /// Only `chosen` selected; values not among the options are ignored.
    pub fn with_selected(label: &str, options: Vec<String>, chosen: &[String]) -> Self {
        let selected = options.iter().map(|o| chosen.contains(o)).collect();
        Facet {
            label: label.to_string(),
            options,
            selected,
        }
    }

    pub fn toggle(&mut self, index: usize) {
        if let Some(flag) = self.selected.get_mut(index) {
            *flag = !*flag;
        }
    }

    pub fn select_all(&mut self) {
        self.selected.iter_mut().for_each(|flag| *flag = true);
    }

    pub fn selected_values(&self) -> Vec<String> {
        self.options
            .iter()
            .zip(&self.selected)
            .filter(|(_, selected)| **selected)
            .map(|(option, _)| option.clone())
            .collect()
    }
}

/// `1234567` -> `"1,234,567"`.
pub fn format_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
