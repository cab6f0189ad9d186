use crate::record::columns;
use polars::prelude::*;
use serde::Serialize;

pub const MAX_STARS: u8 = 5;
pub const STAR: &str = "⭐";

/// KPIs and grouped sums over one filtered view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub transactions: usize,
    /// exact sum; see [`Summary::total_sales_display`]
    pub total_sales: f64,
    pub average_rating: f64,
    pub star_rating: u8,
    pub average_sale_by_transaction: f64,
    pub sales_by_product_line: Vec<(String, f64)>,
    pub sales_by_hour: Vec<(u32, f64)>,
}

impl Summary {
    /// Summarizes a filtered view. An empty view gives zeros and empty groups.
    pub fn from_frame(df: &DataFrame) -> PolarsResult<Summary> {
        let total = df.column(columns::TOTAL)?.f64()?;
        let rating = df.column(columns::RATING)?.f64()?;

        let total_sales = total.sum().unwrap_or(0.0);
        let average_rating = round_to(rating.mean().unwrap_or(0.0), 1);
        let average_sale_by_transaction = round_to(total.mean().unwrap_or(0.0), 2);

        let by_line = sales_by_product_line(df)?;
        let lines = by_line.column(columns::PRODUCT_LINE)?.str()?;
        let line_sums = by_line.column(columns::TOTAL)?.f64()?;
        let sales_by_product_line = lines
            .into_iter()
            .zip(line_sums)
            .map(|(line, sum)| (line.unwrap_or_default().to_string(), sum.unwrap_or(0.0)))
            .collect();

        let by_hour = sales_by_hour(df)?;
        let hours = by_hour.column(columns::HOUR)?.i32()?;
        let hour_sums = by_hour.column(columns::TOTAL)?.f64()?;
        let sales_by_hour = hours
            .into_iter()
            .zip(hour_sums)
            .filter_map(|(hour, sum)| Some((u32::try_from(hour?).ok()?, sum.unwrap_or(0.0))))
            .collect();

        Ok(Summary {
            transactions: df.height(),
            total_sales,
            average_rating,
            star_rating: star_rating(average_rating),
            average_sale_by_transaction,
            sales_by_product_line,
            sales_by_hour,
        })
    }

    /// Total sales truncated to whole currency units.
    pub fn total_sales_display(&self) -> i64 {
        self.total_sales.trunc() as i64
    }

    pub fn stars(&self) -> String {
        STAR.repeat(self.star_rating as usize)
    }
}

/// `Product line` and summed `Total`, ascending by sum.
pub fn sales_by_product_line(df: &DataFrame) -> PolarsResult<DataFrame> {
    df.clone()
        .lazy()
        .select([col(columns::PRODUCT_LINE), col(columns::TOTAL)])
        .group_by([col(columns::PRODUCT_LINE)])
        .agg([col(columns::TOTAL).sum()])
        .sort(
            [columns::TOTAL, columns::PRODUCT_LINE],
            SortMultipleOptions::default(),
        )
        .collect()
}

/// `hour` and summed `Total`, ascending by hour.
pub fn sales_by_hour(df: &DataFrame) -> PolarsResult<DataFrame> {
    df.clone()
        .lazy()
        .select([col(columns::HOUR), col(columns::TOTAL)])
        .group_by([col(columns::HOUR)])
        .agg([col(columns::TOTAL).sum()])
        .sort([columns::HOUR], SortMultipleOptions::default())
        .collect()
}

/// Rounds half away from zero.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

pub fn star_rating(average_rating: f64) -> u8 {
    average_rating.round().clamp(0.0, MAX_STARS as f64) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{apply, Selection};
    use crate::record::tests::sale;
    use crate::record::to_frame;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn example() -> DataFrame {
        to_frame(&[
            sale("A", "Member", "Female", "Food", 10.0, 8.0, 9),
            sale("B", "Member", "Female", "Food", 20.0, 6.0, 9),
            sale("A", "Member", "Female", "Electronics", 30.0, 10.0, 14),
        ])
        .unwrap()
    }

    #[test]
    fn test_worked_example() {
        let df = example();
        let filtered = apply(&df, &Selection::new(["A"], ["Member"], ["Female"])).unwrap();
        assert_eq!(filtered.height(), 2);

        let summary = Summary::from_frame(&filtered).unwrap();
        assert_eq!(summary.transactions, 2);
        assert_eq!(summary.total_sales, 40.0);
        assert_eq!(summary.total_sales_display(), 40);
        assert_eq!(summary.average_rating, 9.0);
        assert_eq!(summary.star_rating, 5);
        assert_eq!(summary.stars(), "⭐⭐⭐⭐⭐");
        assert_eq!(summary.average_sale_by_transaction, 20.0);
        assert_eq!(summary.sales_by_hour, vec![(9, 10.0), (14, 30.0)]);
        assert_eq!(
            summary.sales_by_product_line,
            vec![("Food".to_string(), 10.0), ("Electronics".to_string(), 30.0)]
        );
    }

    #[test]
    fn test_groupings_agree_with_total() {
        let df = to_frame(&[
            sale("A", "Member", "Male", "Sports", 12.25, 4.0, 10),
            sale("A", "Normal", "Male", "Food", 7.5, 7.0, 19),
            sale("B", "Member", "Female", "Sports", 100.125, 9.5, 10),
            sale("C", "Normal", "Female", "Travel", 3.0, 2.0, 13),
            sale("B", "Normal", "Male", "Food", 45.0, 6.5, 19),
        ])
        .unwrap();
        let summary = Summary::from_frame(&df).unwrap();

        let by_line: f64 = summary.sales_by_product_line.iter().map(|(_, v)| v).sum();
        let by_hour: f64 = summary.sales_by_hour.iter().map(|(_, v)| v).sum();
        assert!(close(by_line, summary.total_sales));
        assert!(close(by_hour, summary.total_sales));
        assert!(close(summary.total_sales, 167.875));

        let sums: Vec<f64> = summary.sales_by_product_line.iter().map(|(_, v)| *v).collect();
        assert!(sums.windows(2).all(|w| w[0] <= w[1]));
        let hours: Vec<u32> = summary.sales_by_hour.iter().map(|(h, _)| *h).collect();
        assert_eq!(hours, vec![10, 13, 19]);
    }

    #[test]
    fn test_empty_view_is_zero() {
        let df = example();
        let filtered = apply(&df, &Selection::default()).unwrap();
        let summary = Summary::from_frame(&filtered).unwrap();
        assert_eq!(summary.transactions, 0);
        assert_eq!(summary.total_sales, 0.0);
        assert_eq!(summary.average_rating, 0.0);
        assert_eq!(summary.star_rating, 0);
        assert_eq!(summary.stars(), "");
        assert_eq!(summary.average_sale_by_transaction, 0.0);
        assert!(summary.sales_by_product_line.is_empty());
        assert!(summary.sales_by_hour.is_empty());
    }

    #[test]
    fn test_rounding() {
        assert_eq!(round_to(6.96, 1), 7.0);
        assert_eq!(round_to(6.94, 1), 6.9);
        assert_eq!(round_to(322.9663, 2), 322.97);
        assert_eq!(round_to(0.125, 2), 0.13);
        assert_eq!(star_rating(6.9), 5);
        assert_eq!(star_rating(2.4), 2);
        assert_eq!(star_rating(2.5), 3);
        assert_eq!(star_rating(0.0), 0);
    }
}
