use serde::Deserialize;
use std::error::Error;
use std::fs::File;
use std::path::Path;

pub const DEFAULT_FILENAME: &str = ".sales-dashboard.yml";

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// spreadsheet holding the transactions
    pub source: String,
    /// polar | csv | json | table
    pub output: String,
    pub sheet: Sheet,
    pub filters: Filters,
}

/// Where the transaction table sits inside the workbook.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Sheet {
    pub name: String,
    /// rows above the header
    pub skip_rows: u32,
    /// column letters, e.g. "B:R"
    pub usecols: String,
    /// maximum number of data rows
    pub nrows: usize,
}

/// Initial selections. `None` means every observed value.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Filters {
    pub city: Option<Vec<String>>,
    pub customer_type: Option<Vec<String>>,
    pub gender: Option<Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            source: "supermarkt_sales.xlsx".to_string(),
            output: "polar".to_string(),
            sheet: Sheet::default(),
            filters: Filters::default(),
        }
    }
}

impl Default for Sheet {
    fn default() -> Self {
        Sheet {
            name: "Sales".to_string(),
            skip_rows: 3,
            usecols: "B:R".to_string(),
            nrows: 1000,
        }
    }
}

impl Config {
    pub fn new(filename: &str) -> Result<Config, Box<dyn Error>> {
        let reader = File::open(filename)?;
        let config: Config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }

    /// Reads `filename` when it exists, otherwise falls back to the defaults.
    pub fn load_or_default(filename: &str) -> Result<Config, Box<dyn Error>> {
        if Path::new(filename).exists() {
            Config::new(filename)
        } else {
            Ok(Config::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config() {
        let content = r##"source: data/sales.xlsx
output: table
sheet:
  name: Sales
  skip_rows: 3
  usecols: "B:R"
  nrows: 500
filters:
  city: [Yangon, Mandalay]
  gender: [Female]
"##;
        let config: Config = serde_yaml::from_str(content).unwrap();
        println!("{:?}", config);
        assert_eq!(config.source, "data/sales.xlsx");
        assert_eq!(config.output, "table");
        assert_eq!(config.sheet.name, "Sales");
        assert_eq!(config.sheet.skip_rows, 3);
        assert_eq!(config.sheet.usecols, "B:R");
        assert_eq!(config.sheet.nrows, 500);
        assert_eq!(
            config.filters.city.as_deref(),
            Some(&["Yangon".to_string(), "Mandalay".to_string()][..])
        );
        assert_eq!(config.filters.customer_type, None);
        assert_eq!(config.filters.gender, Some(vec!["Female".to_string()]));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = serde_yaml::from_str("output: json\n").unwrap();
        assert_eq!(config.output, "json");
        assert_eq!(config.source, "supermarkt_sales.xlsx");
        assert_eq!(config.sheet, Sheet::default());
        assert_eq!(config.filters, Filters::default());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "source: other.xlsx").unwrap();
        let config = Config::load_or_default(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.source, "other.xlsx");
        assert_eq!(config.sheet.nrows, 1000);
    }

    #[test]
    fn test_missing_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.yml");
        let config = Config::load_or_default(path.to_str().unwrap()).unwrap();
        assert_eq!(config, Config::default());
        assert!(Config::new(path.to_str().unwrap()).is_err());
    }
}
