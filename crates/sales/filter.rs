use crate::record::columns;
use log::debug;
use polars::prelude::*;
use std::collections::BTreeSet;

/// Allowed values per filter dimension. An empty set matches nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub cities: BTreeSet<String>,
    pub customer_types: BTreeSet<String>,
    pub genders: BTreeSet<String>,
}

impl Selection {
    pub fn new<C, T, G>(cities: C, customer_types: T, genders: G) -> Self
    where
        C: IntoIterator,
        C::Item: Into<String>,
        T: IntoIterator,
        T::Item: Into<String>,
        G: IntoIterator,
        G::Item: Into<String>,
    {
        Selection {
            cities: cities.into_iter().map(Into::into).collect(),
            customer_types: customer_types.into_iter().map(Into::into).collect(),
            genders: genders.into_iter().map(Into::into).collect(),
        }
    }

    /// True when some dimension selects nothing, i.e. no row can match.
    pub fn matches_nothing(&self) -> bool {
        self.cities.is_empty() || self.customer_types.is_empty() || self.genders.is_empty()
    }

    pub fn matches(
        &self,
        city: Option<&str>,
        customer_type: Option<&str>,
        gender: Option<&str>,
    ) -> bool {
        let contains = |set: &BTreeSet<String>, value: Option<&str>| {
            value.map_or(false, |v| set.contains(v))
        };
        contains(&self.cities, city)
            && contains(&self.customer_types, customer_type)
            && contains(&self.genders, gender)
    }
}

/// Rows whose city, customer type and gender are all selected, in input order.
pub fn apply(df: &DataFrame, selection: &Selection) -> PolarsResult<DataFrame> {
    let city = df.column(columns::CITY)?.str()?;
    let customer_type = df.column(columns::CUSTOMER_TYPE)?.str()?;
    let gender = df.column(columns::GENDER)?.str()?;

    let mask: Vec<bool> = city
        .into_iter()
        .zip(customer_type.into_iter())
        .zip(gender.into_iter())
        .map(|((c, t), g)| selection.matches(c, t, g))
        .collect();
    let mask = BooleanChunked::from_slice("mask", &mask);

    let filtered = df.filter(&mask)?;
    debug!("filter kept {} of {} rows", filtered.height(), df.height());
    Ok(filtered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::tests::sale;
    use crate::record::to_frame;

    fn frame() -> DataFrame {
        to_frame(&[
            sale("Yangon", "Member", "Female", "Food", 1.0, 5.0, 10),
            sale("Naypyitaw", "Normal", "Male", "Food", 2.0, 5.0, 11),
            sale("Yangon", "Normal", "Male", "Sports", 3.0, 5.0, 12),
            sale("Mandalay", "Member", "Female", "Food", 4.0, 5.0, 13),
            sale("Yangon", "Member", "Male", "Sports", 5.0, 5.0, 14),
        ])
        .unwrap()
    }

    fn totals(df: &DataFrame) -> Vec<f64> {
        df.column(columns::TOTAL)
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .flatten()
            .collect()
    }

    fn all() -> Selection {
        Selection::new(
            ["Yangon", "Naypyitaw", "Mandalay"],
            ["Member", "Normal"],
            ["Female", "Male"],
        )
    }

    #[test]
    fn test_and_across_or_within() {
        let df = frame();
        let selection = Selection::new(["Yangon", "Mandalay"], ["Member"], ["Female", "Male"]);
        let filtered = apply(&df, &selection).unwrap();
        assert_eq!(totals(&filtered), vec![1.0, 4.0, 5.0]);

        let city = filtered.column(columns::CITY).unwrap().str().unwrap();
        let customer = filtered.column(columns::CUSTOMER_TYPE).unwrap().str().unwrap();
        let gender = filtered.column(columns::GENDER).unwrap().str().unwrap();
        for ((c, t), g) in city.into_iter().zip(customer).zip(gender) {
            assert!(selection.matches(c, t, g));
        }
    }

    #[test]
    fn test_filter_is_complete() {
        let df = frame();
        let selection = Selection::new(["Yangon"], ["Normal", "Member"], ["Male"]);
        let filtered = apply(&df, &selection).unwrap();
        let expected = df
            .column(columns::CITY)
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .zip(df.column(columns::CUSTOMER_TYPE).unwrap().str().unwrap())
            .zip(df.column(columns::GENDER).unwrap().str().unwrap())
            .filter(|((c, t), g)| selection.matches(*c, *t, *g))
            .count();
        assert_eq!(filtered.height(), expected);
        assert_eq!(totals(&filtered), vec![3.0, 5.0]);
    }

    #[test]
    fn test_all_selected_reproduces_table() {
        let df = frame();
        let filtered = apply(&df, &all()).unwrap();
        assert!(filtered.equals_missing(&df));
    }

    #[test]
    fn test_empty_set_matches_nothing() {
        let df = frame();
        let mut selection = all();
        selection.genders.clear();
        assert!(selection.matches_nothing());
        let filtered = apply(&df, &selection).unwrap();
        assert_eq!(filtered.height(), 0);
        assert_eq!(filtered.width(), df.width());
    }

    #[test]
    fn test_unknown_value_is_ignored() {
        let df = frame();
        let selection = Selection::new(["Bago"], ["Member"], ["Female"]);
        assert_eq!(apply(&df, &selection).unwrap().height(), 0);
    }
}
