use crate::filter::{self, Selection};
use crate::record::columns;
use polars::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// A loaded transaction table. Read-only once built.
#[derive(Debug, Clone)]
pub struct Dataset {
    source: PathBuf,
    frame: DataFrame,
}

impl Dataset {
    pub fn new<P: AsRef<Path>>(source: P, frame: DataFrame) -> Self {
        Dataset {
            source: source.as_ref().to_path_buf(),
            frame,
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn len(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    /// Distinct non-null values of a category column, in order of first appearance.
    pub fn distinct(&self, column: &str) -> PolarsResult<Vec<String>> {
        let mut seen = HashSet::new();
        let mut values = Vec::new();
        for value in self.frame.column(column)?.str()?.into_iter().flatten() {
            if seen.insert(value) {
                values.push(value.to_string());
            }
        }
        Ok(values)
    }

    /// Every observed city, customer type and gender.
    pub fn all_selected(&self) -> PolarsResult<Selection> {
        Ok(Selection::new(
            self.distinct(columns::CITY)?,
            self.distinct(columns::CUSTOMER_TYPE)?,
            self.distinct(columns::GENDER)?,
        ))
    }

    pub fn filter(&self, selection: &Selection) -> PolarsResult<DataFrame> {
        filter::apply(&self.frame, selection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::tests::sale;
    use crate::record::to_frame;

    #[test]
    fn distinct_keeps_first_appearance_order() {
        let frame = to_frame(&[
            sale("Yangon", "Member", "Female", "Food", 1.0, 5.0, 10),
            sale("Naypyitaw", "Normal", "Male", "Food", 1.0, 5.0, 10),
            sale("Yangon", "Normal", "Female", "Food", 1.0, 5.0, 10),
            sale("Mandalay", "Member", "Male", "Food", 1.0, 5.0, 10),
        ])
        .unwrap();
        let dataset = Dataset::new("sales.xlsx", frame);
        assert_eq!(dataset.len(), 4);
        assert_eq!(dataset.source(), Path::new("sales.xlsx"));
        assert_eq!(
            dataset.distinct(columns::CITY).unwrap(),
            vec!["Yangon", "Naypyitaw", "Mandalay"]
        );
        assert_eq!(
            dataset.distinct(columns::CUSTOMER_TYPE).unwrap(),
            vec!["Member", "Normal"]
        );
        assert!(dataset.distinct("Missing").is_err());

        let selection = dataset.all_selected().unwrap();
        assert_eq!(selection.genders.len(), 2);
        let filtered = dataset.filter(&selection).unwrap();
        assert!(filtered.equals_missing(dataset.frame()));
    }
}
