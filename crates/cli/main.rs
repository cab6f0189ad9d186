use config::{Config, Filters};
use sales::aggregate::{self, Summary};
use sales::record::columns;
use sales::{Dataset, DatasetCache, Loader, SalesError, Selection, SheetLoader};
use sales::loader::SheetLayout;
use ui::data::{Data, Facet, Kpis, View};
use ui::tui::Source;

use clap::builder::PossibleValuesParser;
use clap::Parser;
use csv::Writer;
use env_logger::Env;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::{error::Error, fs::File};

use log::{debug, error, info};

/// 写入csv文件
///
/// # 参数
/// * `filename` - 文件名
/// * `header` - csv文件头
/// * `data` - csv文件数据
pub fn write_csv<P: AsRef<Path>>(
    filename: P,
    header: Vec<String>,
    data: Vec<Vec<String>>,
) -> Result<(), Box<dyn Error>> {
    let file = File::create(&filename)?;
    let mut wtr = Writer::from_writer(file);

    wtr.write_record(header)?;

    for record in data {
        wtr.write_record(record)?;
    }
    wtr.flush()?;
    info!("CSV file written successfully: {:?}", filename.as_ref());

    Ok(())
}

enum OutputType {
    CSV,
    JSON,
    TABLE,
    POLAR,
}

impl OutputType {
    fn from_str(s: &str) -> Option<Self> {
        match s {
            "csv" => Some(OutputType::CSV),
            "json" => Some(OutputType::JSON),
            "table" => Some(OutputType::TABLE),
            "polar" => Some(OutputType::POLAR),
            _ => None,
        }
    }
}

trait Output {
    fn output(&self) -> Result<(), Box<dyn Error>>;
}

struct PolarOutput {
    df: DataFrame,
    summary: Summary,
}

impl PolarOutput {
    fn new(df: DataFrame, summary: Summary) -> Self {
        PolarOutput { df, summary }
    }
}

impl Output for PolarOutput {
    fn output(&self) -> Result<(), Box<dyn Error>> {
        let kpis = kpis(&self.summary);
        println!("Total Sales: {}", kpis.total_sales_text());
        println!("Average Rating: {}", kpis.rating_text());
        println!("Average Sales Per Transaction: {}", kpis.average_sale_text());
        println!("{}", self.df);
        println!("Sales by Product Line\n{}", aggregate::sales_by_product_line(&self.df)?);
        println!("Sales Per Hour\n{}", aggregate::sales_by_hour(&self.df)?);
        Ok(())
    }
}

/// Filtered rows as CSV.
struct CsvOutput {
    filename: String,
    df: DataFrame,
}

impl CsvOutput {
    fn new(filename: String, df: DataFrame) -> Self {
        CsvOutput { filename, df }
    }
}

impl Output for CsvOutput {
    fn output(&self) -> Result<(), Box<dyn Error>> {
        let mut file = File::create(&self.filename)?;
        let mut m_df = self.df.clone();
        CsvWriter::new(&mut file).finish(&mut m_df)?;
        info!("detail csv file written: {}", self.filename);
        Ok(())
    }
}

/// KPIs and grouped sums as `metric,key,value` rows.
struct SummaryCsvOutput {
    filename: String,
    summary: Summary,
}

impl SummaryCsvOutput {
    fn new(filename: String, summary: Summary) -> Self {
        SummaryCsvOutput { filename, summary }
    }
}

fn summary_records(summary: &Summary) -> Vec<Vec<String>> {
    let metric = |name: &str, key: String, value: String| vec![name.to_string(), key, value];
    let mut data = vec![
        metric("transactions", String::new(), summary.transactions.to_string()),
        metric("total_sales", String::new(), summary.total_sales.to_string()),
        metric("average_rating", String::new(), summary.average_rating.to_string()),
        metric("star_rating", String::new(), summary.star_rating.to_string()),
        metric(
            "average_sale_by_transaction",
            String::new(),
            summary.average_sale_by_transaction.to_string(),
        ),
    ];
    for (line, total) in &summary.sales_by_product_line {
        data.push(metric("sales_by_product_line", line.clone(), total.to_string()));
    }
    for (hour, total) in &summary.sales_by_hour {
        data.push(metric("sales_by_hour", hour.to_string(), total.to_string()));
    }
    data
}

impl Output for SummaryCsvOutput {
    fn output(&self) -> Result<(), Box<dyn Error>> {
        let csv_header = vec!["metric".to_string(), "key".to_string(), "value".to_string()];
        write_csv(&self.filename, csv_header, summary_records(&self.summary))
    }
}

struct JsonOutput {
    summary: Summary,
}

impl Output for JsonOutput {
    fn output(&self) -> Result<(), Box<dyn Error>> {
        println!("{}", serde_json::to_string_pretty(&self.summary)?);
        Ok(())
    }
}

fn convert_df_to_data_vec(df: &DataFrame) -> Result<Vec<Data>, Box<dyn Error>> {
    let mut d = df.select(Data::COLUMNS)?;

    let mut j = Vec::<u8>::new();
    JsonWriter::new(&mut j)
        .with_json_format(JsonFormat::Json)
        .finish(&mut d)?;
    let rows = serde_json::from_slice::<Vec<Data>>(&j)?;
    Ok(rows)
}

fn kpis(summary: &Summary) -> Kpis {
    Kpis {
        total_sales: summary.total_sales_display(),
        average_rating: summary.average_rating,
        stars: summary.stars(),
        average_sale: summary.average_sale_by_transaction,
    }
}

/// Sales dashboard over a transaction spreadsheet
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(
        short = 'F',
        long = "format",
        value_parser = PossibleValuesParser::new(["csv", "json", "table", "polar"]),
        help = "output format, overrides the config file"
    )]
    format: Option<String>,

    #[arg(long = "config", default_value = config::DEFAULT_FILENAME, help = "config file")]
    config: String,

    #[arg(long = "source", help = "spreadsheet to load, overrides the config file")]
    source: Option<String>,

    #[arg(long = "city", help = "keep only this city, repeatable")]
    city: Vec<String>,

    #[arg(long = "customer-type", help = "keep only this customer type, repeatable")]
    customer_type: Vec<String>,

    #[arg(long = "gender", help = "keep only this gender, repeatable")]
    gender: Vec<String>,

    #[arg(
        long = "detail",
        help = "write the filtered rows to this csv file, e.g. --detail detail.csv"
    )]
    detail: Option<String>,

    #[arg(long = "no-detail", action=clap::ArgAction::SetTrue, help="do not write the detail csv file, ignore --detail if this is set")]
    no_detail: bool,

    #[arg(long = "summary", help = "summary csv file for --format csv")]
    summary: Option<String>,
}

/// Command-line selections win over the config file.
fn merge_filters(args: &Args, filters: Filters) -> Filters {
    let pick = |cli: &Vec<String>, configured: Option<Vec<String>>| {
        if cli.is_empty() {
            configured
        } else {
            Some(cli.clone())
        }
    };
    Filters {
        city: pick(&args.city, filters.city),
        customer_type: pick(&args.customer_type, filters.customer_type),
        gender: pick(&args.gender, filters.gender),
    }
}

fn selection_from(facets: &[Facet]) -> Selection {
    let values = |i: usize| facets.get(i).map(Facet::selected_values).unwrap_or_default();
    Selection::new(values(0), values(1), values(2))
}

/// One user's filter state over a shared, cached dataset.
struct Session<L: Loader> {
    cache: DatasetCache<L>,
    source: PathBuf,
    filters: Filters,
}

impl<L: Loader> Session<L> {
    fn new(loader: L, source: PathBuf, filters: Filters) -> Self {
        Session {
            cache: DatasetCache::new(loader),
            source,
            filters,
        }
    }

    fn dataset(&mut self) -> Result<Arc<Dataset>, SalesError> {
        self.cache.get_or_load(&self.source)
    }
}

impl<L: Loader> Source for Session<L> {
    fn facets(&mut self) -> Result<Vec<Facet>, Box<dyn Error>> {
        let dataset = self.dataset()?;
        let dimensions = [
            ("City", columns::CITY, &self.filters.city),
            ("Customer Type", columns::CUSTOMER_TYPE, &self.filters.customer_type),
            ("Gender", columns::GENDER, &self.filters.gender),
        ];
        let mut facets = vec![];
        for (label, column, chosen) in dimensions {
            let observed = dataset.distinct(column)?;
            facets.push(match chosen {
                Some(chosen) => Facet::with_selected(label, observed, chosen),
                None => Facet::all(label, observed),
            });
        }
        Ok(facets)
    }

    fn view(&mut self, facets: &[Facet]) -> Result<View, Box<dyn Error>> {
        let dataset = self.dataset()?;
        let selection = selection_from(facets);
        debug!("selection: {:?}", selection);
        let filtered = dataset.filter(&selection)?;
        let summary = Summary::from_frame(&filtered)?;
        Ok(View {
            kpis: kpis(&summary),
            rows: convert_df_to_data_vec(&filtered)?,
            sales_by_product_line: summary.sales_by_product_line,
            sales_by_hour: summary.sales_by_hour,
        })
    }

    fn reload(&mut self) -> Result<(), Box<dyn Error>> {
        self.cache.reload(&self.source)?;
        Ok(())
    }
}

fn get_output(
    output_type: OutputType,
    df: DataFrame,
    summary: Summary,
    summary_file: Option<String>,
) -> Box<dyn Output> {
    match output_type {
        OutputType::CSV => Box::new(SummaryCsvOutput::new(
            summary_file.unwrap_or("summary.csv".to_string()),
            summary,
        )),
        OutputType::JSON => Box::new(JsonOutput { summary }),
        OutputType::POLAR | OutputType::TABLE => Box::new(PolarOutput::new(df, summary)),
    }
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let conf = Config::load_or_default(&args.config)?;
    debug!("config: {:?}", conf);
    let layout = SheetLayout::from_config(&conf.sheet)?;
    let source = args.source.clone().unwrap_or(conf.source.clone());
    let format = args.format.clone().unwrap_or(conf.output.clone());
    let out_type = OutputType::from_str(format.as_str())
        .ok_or_else(|| format!("output not match: {}", format))?;

    let filters = merge_filters(&args, conf.filters);
    let mut session = Session::new(SheetLoader::new(layout), PathBuf::from(source), filters);
    let dataset = session.dataset()?;

    let selection = selection_from(&session.facets()?);
    let filtered = dataset.filter(&selection)?;
    info!(
        "{} of {} transactions selected",
        filtered.height(),
        dataset.len()
    );
    write_detail(&args, &filtered)?;

    if let OutputType::TABLE = out_type {
        // the dashboard starts from the same view the detail file holds
        return ui::tui::run(&mut session);
    }

    let summary = Summary::from_frame(&filtered)?;
    get_output(out_type, filtered, summary, args.summary).output()
}

/// Writes the filtered rows unless `--no-detail` is set. Returns the file written.
fn write_detail(args: &Args, filtered: &DataFrame) -> Result<Option<String>, Box<dyn Error>> {
    if args.no_detail {
        return Ok(None);
    }
    let detail_file = args.detail.clone().unwrap_or("detail.csv".to_string());
    info!("detail csv file: {}", detail_file);
    CsvOutput::new(detail_file.clone(), filtered.clone()).output()?;
    Ok(Some(detail_file))
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if let Err(e) = run(args) {
        error!("{}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct FrameLoader {
        frame: DataFrame,
        calls: Cell<usize>,
    }

    impl Loader for FrameLoader {
        fn load(&self, path: &Path) -> Result<Dataset, SalesError> {
            self.calls.set(self.calls.get() + 1);
            Ok(Dataset::new(path, self.frame.clone()))
        }
    }

    fn frame() -> DataFrame {
        df!(
            columns::INVOICE_ID => &["1", "2", "3"],
            columns::BRANCH => &["A", "B", "A"],
            columns::CITY => &["Yangon", "Mandalay", "Yangon"],
            columns::CUSTOMER_TYPE => &["Member", "Normal", "Normal"],
            columns::GENDER => &["Female", "Male", "Male"],
            columns::PRODUCT_LINE => &["Food", "Food", "Sports"],
            columns::QUANTITY => &[1i64, 2, 3],
            columns::TOTAL => &[10.0, 20.0, 30.5],
            columns::DATE => &["2019-01-05", "2019-03-08", "2019-03-03"],
            columns::TIME => &["13:08:00", "10:29:00", "13:23:00"],
            columns::PAYMENT => &["Ewallet", "Cash", "Credit card"],
            columns::RATING => &[9.1, 9.6, 7.4],
            columns::HOUR => &[13i32, 10, 13]
        )
        .unwrap()
    }

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["sales-dashboard"];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    fn session(filters: Filters) -> Session<FrameLoader> {
        let loader = FrameLoader {
            frame: frame(),
            calls: Cell::new(0),
        };
        Session::new(loader, PathBuf::from("sales.xlsx"), filters)
    }

    #[test]
    fn test_cli_filters_override_config() {
        let configured = Filters {
            city: Some(vec!["Mandalay".to_string()]),
            customer_type: Some(vec!["Member".to_string()]),
            gender: None,
        };
        let merged = merge_filters(&args(&["--city", "Yangon", "--city", "Naypyitaw"]), configured);
        assert_eq!(
            merged.city,
            Some(vec!["Yangon".to_string(), "Naypyitaw".to_string()])
        );
        assert_eq!(merged.customer_type, Some(vec!["Member".to_string()]));
        assert_eq!(merged.gender, None);
    }

    #[test]
    fn test_session_defaults_to_every_value() {
        let mut session = session(Filters::default());
        let facets = session.facets().unwrap();
        assert_eq!(facets.len(), 3);
        assert_eq!(facets[0].selected_values(), vec!["Yangon", "Mandalay"]);

        let view = session.view(&facets).unwrap();
        assert_eq!(view.rows.len(), 3);
        assert_eq!(view.kpis.total_sales, 60);
        assert_eq!(view.rows[2].total, "30.5");
        assert_eq!(view.rows[0].quantity, "1");
        assert_eq!(view.sales_by_hour, vec![(10, 20.0), (13, 40.5)]);
        assert_eq!(session.cache.loader().calls.get(), 1);
    }

    #[test]
    fn test_session_applies_configured_filters() {
        let mut session = session(Filters {
            gender: Some(vec!["Male".to_string()]),
            ..Filters::default()
        });
        let facets = session.facets().unwrap();
        let view = session.view(&facets).unwrap();
        assert_eq!(view.rows.len(), 2);
        assert_eq!(view.kpis.average_sale, 25.25);
        assert_eq!(
            view.sales_by_product_line,
            vec![("Food".to_string(), 20.0), ("Sports".to_string(), 30.5)]
        );
    }

    #[test]
    fn test_summary_records() {
        let summary = Summary::from_frame(&frame()).unwrap();
        let records = summary_records(&summary);
        assert_eq!(records[0], vec!["transactions", "", "3"]);
        assert_eq!(records[1], vec!["total_sales", "", "60.5"]);
        assert_eq!(records.len(), 5 + 2 + 2);
        assert_eq!(records[7], vec!["sales_by_hour", "10", "20"]);
    }

    #[test]
    fn test_write_detail() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("detail.csv");
        let path_arg = path.to_str().unwrap();
        let filtered = frame().head(Some(2));

        let written = write_detail(&args(&["--detail", path_arg]), &filtered).unwrap();
        assert_eq!(written.as_deref(), Some(path_arg));
        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Invoice ID,Branch,City"));
        assert!(lines[2].contains("Mandalay"));

        let skipped = args(&["--detail", path_arg, "--no-detail", "-F", "table"]);
        std::fs::remove_file(&path).unwrap();
        assert_eq!(write_detail(&skipped, &filtered).unwrap(), None);
        assert!(!path.exists());
    }

    #[test]
    fn test_unknown_format() {
        assert!(OutputType::from_str("xlsx").is_none());
        assert!(Args::try_parse_from(["sales-dashboard", "-F", "xlsx"]).is_err());
    }
}
