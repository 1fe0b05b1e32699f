//! Data Processor Module
//! Handles dataset cleaning and the derived views (head, threshold, top-K long form).

use log::{debug, info, warn};
use polars::prelude::*;
use std::collections::HashSet;
use thiserror::Error;

/// Byte-order mark that spreadsheet exports leave glued to the first header.
const BYTE_ORDER_MARK: char = '\u{feff}';

/// Column names of the long-form view besides the identifier.
pub const YEAR_FIELD: &str = "year";
pub const VALUE_FIELD: &str = "value";

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
}

/// Outcome of a derived view that depends on particular columns.
#[derive(Debug, Clone)]
pub enum Prepared<T> {
    /// The view has at least one row.
    Rows(T),
    /// Required columns exist but nothing matched.
    NoMatches,
    /// A required column is absent from the dataset.
    ColumnNotFound { column: String },
}

impl<T> Prepared<T> {
    pub fn rows(self) -> Option<T> {
        match self {
            Prepared::Rows(rows) => Some(rows),
            _ => None,
        }
    }
}

/// Normalize a single column label: drop byte-order marks, then trim.
pub fn normalize_column_name(name: &str) -> String {
    let without_bom: String = name.chars().filter(|&c| c != BYTE_ORDER_MARK).collect();
    without_bom.trim().to_string()
}

/// Year labels `first..=last` as strings.
pub fn year_labels(first: u16, last: u16) -> Vec<String> {
    (first..=last).map(|y| y.to_string()).collect()
}

fn parse_cell(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_index(name).is_some()
}

/// Handles data cleaning and derivation operations.
pub struct DataPreparer;

impl DataPreparer {
    /// Normalize and coerce in one pass: the cleaned dataset.
    pub fn prepare(raw: &DataFrame, year_cols: &[String]) -> Result<DataFrame, ProcessorError> {
        let normalized = Self::normalize_columns(raw)?;
        let cleaned = Self::coerce_numeric(&normalized, year_cols)?;
        info!(
            "cleaned dataset: {} rows, columns {:?}",
            cleaned.height(),
            cleaned.get_column_names()
        );
        Ok(cleaned)
    }

    /// Rename every column to its normalized label, keeping column and row order.
    ///
    /// Labels that collide after normalization get a `_duplicated_{n}` suffix,
    /// since a DataFrame cannot carry two columns with the same name.
    pub fn normalize_columns(df: &DataFrame) -> Result<DataFrame, ProcessorError> {
        let mut seen: HashSet<String> = HashSet::with_capacity(df.width());
        let mut duplicates = 0usize;
        let mut names: Vec<String> = Vec::with_capacity(df.width());

        for original in df.get_column_names() {
            let mut name = normalize_column_name(original.as_str());
            while seen.contains(&name) {
                name = format!(
                    "{}_duplicated_{}",
                    normalize_column_name(original.as_str()),
                    duplicates
                );
                duplicates += 1;
            }
            if name != original.as_str() {
                debug!("renamed column {:?} -> {:?}", original.as_str(), name);
            }
            seen.insert(name.clone());
            names.push(name);
        }

        let mut cleaned = df.clone();
        cleaned.set_column_names(names)?;
        Ok(cleaned)
    }

    /// Convert each year column present in the dataset to Float64.
    ///
    /// Unparsable or non-finite cells become null. Labels that are not
    /// columns of the dataset are skipped.
    pub fn coerce_numeric(df: &DataFrame, year_cols: &[String]) -> Result<DataFrame, ProcessorError> {
        let mut coerced = df.clone();

        for year in year_cols {
            if !has_column(df, year) {
                debug!("year column {} absent, skipping coercion", year);
                continue;
            }

            let column = df.column(year)?;
            let values: Vec<Option<f64>> = match column.dtype() {
                DataType::String => column
                    .str()?
                    .into_iter()
                    .map(|cell| cell.and_then(parse_cell))
                    .collect(),
                _ => {
                    let as_f64 = column.cast(&DataType::Float64)?;
                    as_f64
                        .f64()?
                        .into_iter()
                        .map(|cell| cell.filter(|v| v.is_finite()))
                        .collect()
                }
            };

            let dropped = values
                .iter()
                .filter(|v| v.is_none())
                .count()
                .saturating_sub(column.null_count());
            if dropped > 0 {
                warn!("column {}: {} cells were not numeric and became missing", year, dropped);
            }

            coerced.with_column(Column::new(year.as_str().into(), values))?;
        }

        Ok(coerced)
    }

    /// Project the dataset onto `columns`, in that order.
    pub fn select_columns(
        df: &DataFrame,
        columns: &[&str],
    ) -> Result<Prepared<DataFrame>, ProcessorError> {
        if let Some(missing) = columns.iter().find(|c| !has_column(df, c)) {
            return Ok(Prepared::ColumnNotFound {
                column: missing.to_string(),
            });
        }
        if df.height() == 0 {
            return Ok(Prepared::NoMatches);
        }
        Ok(Prepared::Rows(df.select(columns.iter().copied())?))
    }

    /// First `n` rows in original order (all rows when there are fewer).
    pub fn head(df: &DataFrame, n: usize) -> DataFrame {
        df.head(Some(n))
    }

    /// Rows whose `year` value is strictly greater than `threshold`, in original order.
    pub fn threshold_filter(
        df: &DataFrame,
        year: &str,
        threshold: f64,
    ) -> Result<Prepared<DataFrame>, ProcessorError> {
        if !has_column(df, year) {
            return Ok(Prepared::ColumnNotFound {
                column: year.to_string(),
            });
        }

        let values = df.column(year)?.cast(&DataType::Float64)?;
        let mask: BooleanChunked = values
            .f64()?
            .into_iter()
            .map(|v| Some(matches!(v, Some(x) if x > threshold)))
            .collect();
        let filtered = df.filter(&mask)?;

        debug!(
            "threshold {} > {}: {} of {} rows",
            year,
            threshold,
            filtered.height(),
            df.height()
        );

        if filtered.height() == 0 {
            Ok(Prepared::NoMatches)
        } else {
            Ok(Prepared::Rows(filtered))
        }
    }

    /// The `k` rows with the largest `year` value, descending, in wide form.
    ///
    /// Ties keep their original row order. Rows with a missing ranking value
    /// are never selected, so fewer than `k` rows may come back. Selected rows
    /// whose identifier is missing or blank are dropped afterwards.
    pub fn top_k(
        df: &DataFrame,
        id_col: &str,
        year: &str,
        k: usize,
    ) -> Result<Prepared<DataFrame>, ProcessorError> {
        for required in [year, id_col] {
            if !has_column(df, required) {
                return Ok(Prepared::ColumnNotFound {
                    column: required.to_string(),
                });
            }
        }

        let ranking = df.column(year)?.cast(&DataType::Float64)?;
        let mut candidates: Vec<(usize, f64)> = ranking
            .f64()?
            .into_iter()
            .enumerate()
            .filter_map(|(i, v)| v.filter(|x| !x.is_nan()).map(|x| (i, x)))
            .collect();
        // sort_by is stable: equal values stay in row order
        candidates.sort_by(|a, b| b.1.total_cmp(&a.1));
        candidates.truncate(k);

        let ids = df.column(id_col)?.cast(&DataType::String)?;
        let ids = ids.str()?;
        let selected: Vec<IdxSize> = candidates
            .into_iter()
            .filter(|&(i, _)| ids.get(i).is_some_and(|id| !id.trim().is_empty()))
            .map(|(i, _)| i as IdxSize)
            .collect();

        if selected.is_empty() {
            return Ok(Prepared::NoMatches);
        }

        let idx = IdxCa::from_vec("idx".into(), selected);
        Ok(Prepared::Rows(df.take(&idx)?))
    }

    /// Reshape wide rows into `[id_col, "year", "value"]` long form.
    ///
    /// Rows come out in input order and, within a row, in `year_cols` order.
    /// Year labels that are not columns of `df` are skipped; missing values
    /// are carried through as null.
    pub fn melt_years(
        df: &DataFrame,
        id_col: &str,
        year_cols: &[String],
    ) -> Result<DataFrame, ProcessorError> {
        let ids = df.column(id_col)?.cast(&DataType::String)?;
        let ids = ids.str()?;

        let present: Vec<&String> = year_cols.iter().filter(|y| has_column(df, y)).collect();
        let mut year_values: Vec<Float64Chunked> = Vec::with_capacity(present.len());
        for year in &present {
            year_values.push(df.column(year)?.cast(&DataType::Float64)?.f64()?.clone());
        }

        let capacity = df.height() * present.len();
        let mut groups: Vec<Option<String>> = Vec::with_capacity(capacity);
        let mut years: Vec<String> = Vec::with_capacity(capacity);
        let mut values: Vec<Option<f64>> = Vec::with_capacity(capacity);

        for row in 0..df.height() {
            let id = ids.get(row).map(str::to_string);
            for (year, ca) in present.iter().zip(&year_values) {
                groups.push(id.clone());
                years.push((*year).clone());
                values.push(ca.get(row));
            }
        }

        let long = DataFrame::new(vec![
            Column::new(id_col.into(), groups),
            Column::new(YEAR_FIELD.into(), years),
            Column::new(VALUE_FIELD.into(), values),
        ])?;

        Ok(long)
    }

    /// Top-K selection followed by the wide-to-long reshape.
    pub fn top_k_long(
        df: &DataFrame,
        id_col: &str,
        year: &str,
        k: usize,
        year_cols: &[String],
    ) -> Result<Prepared<DataFrame>, ProcessorError> {
        match Self::top_k(df, id_col, year, k)? {
            Prepared::Rows(selected) => {
                let long = Self::melt_years(&selected, id_col, year_cols)?;
                debug!(
                    "top {} by {}: {} rows -> {} long records",
                    k,
                    year,
                    selected.height(),
                    long.height()
                );
                Ok(Prepared::Rows(long))
            }
            Prepared::NoMatches => Ok(Prepared::NoMatches),
            Prepared::ColumnNotFound { column } => Ok(Prepared::ColumnNotFound { column }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn years() -> Vec<String> {
        year_labels(2010, 2017)
    }

    fn sample() -> DataFrame {
        df!(
            "Country Name" => ["A", "B"],
            "2010" => ["10", ""],
            "2017" => ["50", "20"],
        )
        .unwrap()
    }

    fn ids(df: &DataFrame, id_col: &str) -> Vec<Option<String>> {
        df.column(id_col)
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect()
    }

    fn floats(df: &DataFrame, col: &str) -> Vec<Option<f64>> {
        df.column(col).unwrap().f64().unwrap().into_iter().collect()
    }

    #[test]
    fn test_normalize_column_name() {
        assert_eq!(normalize_column_name("  2010 "), "2010");
        assert_eq!(normalize_column_name("\u{feff}Country Name"), "Country Name");
        assert_eq!(normalize_column_name("\u{feff} 2011\t"), "2011");
        assert_eq!(normalize_column_name("20\u{feff}12"), "2012");
        assert_eq!(normalize_column_name("Country Name"), "Country Name");
    }

    #[test]
    fn test_normalize_columns_keeps_order_and_rows() {
        let raw = df!(
            "\u{feff}Country Name" => ["A", "B"],
            " 2010 " => ["1", "2"],
            "2017" => ["3", "4"],
        )
        .unwrap();

        let cleaned = DataPreparer::normalize_columns(&raw).unwrap();
        let names: Vec<String> = cleaned.get_column_names().iter().map(|s| s.to_string()).collect();
        assert_eq!(names, vec!["Country Name", "2010", "2017"]);
        assert_eq!(ids(&cleaned, "Country Name"), ids(&raw, "\u{feff}Country Name"));
    }

    #[test]
    fn test_normalize_columns_suffixes_collisions() {
        let raw = df!(
            "2010" => ["1"],
            " 2010" => ["2"],
        )
        .unwrap();

        let cleaned = DataPreparer::normalize_columns(&raw).unwrap();
        let names: Vec<String> = cleaned.get_column_names().iter().map(|s| s.to_string()).collect();
        assert_eq!(names, vec!["2010", "2010_duplicated_0"]);
    }

    #[test]
    fn test_coerce_turns_blank_into_missing() {
        // Scenario: row B keeps its place with a missing 2010 value
        let cleaned = DataPreparer::prepare(&sample(), &years()).unwrap();
        assert_eq!(cleaned.height(), 2);
        assert_eq!(ids(&cleaned, "Country Name"), vec![Some("A".into()), Some("B".into())]);
        assert_eq!(floats(&cleaned, "2010"), vec![Some(10.0), None]);
        assert_eq!(floats(&cleaned, "2017"), vec![Some(50.0), Some(20.0)]);
    }

    #[test]
    fn test_coerce_handles_malformed_and_numeric_columns() {
        let raw = df!(
            "2010" => ["12.5", "n/a", " 7 ", "inf", "1e2"],
            "2011" => [Some(1i64), None, Some(3), Some(4), Some(5)],
            "Country Name" => ["A", "B", "C", "D", "E"],
        )
        .unwrap();

        let cleaned = DataPreparer::coerce_numeric(&raw, &years()).unwrap();
        assert_eq!(
            floats(&cleaned, "2010"),
            vec![Some(12.5), None, Some(7.0), None, Some(100.0)]
        );
        assert_eq!(
            floats(&cleaned, "2011"),
            vec![Some(1.0), None, Some(3.0), Some(4.0), Some(5.0)]
        );
        assert_eq!(cleaned.column("Country Name").unwrap().dtype(), &DataType::String);
    }

    #[test]
    fn test_threshold_filter_keeps_strictly_greater() {
        // Scenario: 2017 > 30 yields only A
        let cleaned = DataPreparer::prepare(&sample(), &years()).unwrap();
        let result = DataPreparer::threshold_filter(&cleaned, "2017", 30.0).unwrap();
        let rows = result.rows().expect("rows");
        assert_eq!(ids(&rows, "Country Name"), vec![Some("A".into())]);

        let at_boundary = DataPreparer::threshold_filter(&cleaned, "2017", 50.0).unwrap();
        assert!(matches!(at_boundary, Prepared::NoMatches));
    }

    #[test]
    fn test_threshold_filter_missing_column() {
        // Scenario: absent 2017 is column-not-found, not an empty result
        let raw = df!("Country Name" => ["A"], "2010" => ["10"]).unwrap();
        let cleaned = DataPreparer::prepare(&raw, &years()).unwrap();

        match DataPreparer::threshold_filter(&cleaned, "2017", 30.0).unwrap() {
            Prepared::ColumnNotFound { column } => assert_eq!(column, "2017"),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_threshold_filter_excludes_missing_values() {
        let raw = df!("Country Name" => ["A", "B"], "2017" => ["", "x"]).unwrap();
        let cleaned = DataPreparer::prepare(&raw, &years()).unwrap();
        let result = DataPreparer::threshold_filter(&cleaned, "2017", f64::MIN).unwrap();
        assert!(matches!(result, Prepared::NoMatches));
    }

    #[test]
    fn test_top_k_excludes_missing_values() {
        // Scenario: top-2 over A=50, B=20, C=missing yields [A, B]
        let raw = df!(
            "Country Name" => ["C", "B", "A"],
            "2017" => ["", "20", "50"],
        )
        .unwrap();
        let cleaned = DataPreparer::prepare(&raw, &years()).unwrap();

        let top = DataPreparer::top_k(&cleaned, "Country Name", "2017", 2)
            .unwrap()
            .rows()
            .expect("rows");
        assert_eq!(ids(&top, "Country Name"), vec![Some("A".into()), Some("B".into())]);

        let all = DataPreparer::top_k(&cleaned, "Country Name", "2017", 5)
            .unwrap()
            .rows()
            .expect("rows");
        assert_eq!(all.height(), 2);
    }

    #[test]
    fn test_top_k_ties_keep_row_order() {
        let raw = df!(
            "Country Name" => ["first", "second", "third"],
            "2017" => ["40", "40", "40"],
        )
        .unwrap();
        let cleaned = DataPreparer::prepare(&raw, &years()).unwrap();

        let top = DataPreparer::top_k(&cleaned, "Country Name", "2017", 2)
            .unwrap()
            .rows()
            .expect("rows");
        assert_eq!(
            ids(&top, "Country Name"),
            vec![Some("first".into()), Some("second".into())]
        );
    }

    #[test]
    fn test_top_k_drops_missing_identifiers_after_selection() {
        let raw = df!(
            "Country Name" => [Some("A"), None, Some("  "), Some("D")],
            "2017" => ["10", "90", "80", "5"],
        )
        .unwrap();
        let cleaned = DataPreparer::prepare(&raw, &years()).unwrap();

        let top = DataPreparer::top_k(&cleaned, "Country Name", "2017", 3)
            .unwrap()
            .rows()
            .expect("rows");
        // K counts the rows before identifiers are checked
        assert_eq!(ids(&top, "Country Name"), vec![Some("A".into())]);

        let none_left = DataPreparer::top_k(&cleaned, "Country Name", "2017", 2).unwrap();
        assert!(matches!(none_left, Prepared::NoMatches));
    }

    #[test]
    fn test_top_k_long_requires_columns() {
        let cleaned = DataPreparer::prepare(&sample(), &years()).unwrap();

        let no_year = DataPreparer::top_k_long(&cleaned, "Country Name", "2016", 5, &years()).unwrap();
        assert!(matches!(no_year, Prepared::ColumnNotFound { .. }));

        match DataPreparer::top_k_long(&cleaned, "Country", "2017", 5, &years()).unwrap() {
            Prepared::ColumnNotFound { column } => assert_eq!(column, "Country"),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_top_k_long_orders_by_rank_then_year() {
        let cleaned = DataPreparer::prepare(&sample(), &years()).unwrap();
        let long = DataPreparer::top_k_long(&cleaned, "Country Name", "2017", 5, &years())
            .unwrap()
            .rows()
            .expect("rows");

        assert_eq!(long.height(), 4);
        assert_eq!(
            ids(&long, "Country Name"),
            vec![Some("A".into()), Some("A".into()), Some("B".into()), Some("B".into())]
        );
        assert_eq!(ids(&long, YEAR_FIELD), vec![
            Some("2010".into()),
            Some("2017".into()),
            Some("2010".into()),
            Some("2017".into()),
        ]);
        assert_eq!(floats(&long, VALUE_FIELD), vec![Some(10.0), Some(50.0), None, Some(20.0)]);
    }

    #[test]
    fn test_select_columns() {
        let cleaned = DataPreparer::prepare(&sample(), &years()).unwrap();

        let view = DataPreparer::select_columns(&cleaned, &["2017", "Country Name"])
            .unwrap()
            .rows()
            .expect("rows");
        let names: Vec<String> = view.get_column_names().iter().map(|s| s.to_string()).collect();
        assert_eq!(names, vec!["2017", "Country Name"]);

        let missing = DataPreparer::select_columns(&cleaned, &["Country Name", "2016"]).unwrap();
        assert!(matches!(missing, Prepared::ColumnNotFound { column } if column == "2016"));

        let empty = DataPreparer::head(&cleaned, 0);
        let none = DataPreparer::select_columns(&empty, &["2017"]).unwrap();
        assert!(matches!(none, Prepared::NoMatches));
    }

    #[test]
    fn test_head_returns_at_most_n_rows() {
        // Scenario: N=10 on a 3-row dataset returns all 3 unchanged
        let raw = df!("Country Name" => ["A", "B", "C"], "2017" => ["1", "2", "3"]).unwrap();
        let head = DataPreparer::head(&raw, 10);
        assert!(head.equals_missing(&raw));

        assert_eq!(DataPreparer::head(&raw, 2).height(), 2);
        assert_eq!(DataPreparer::head(&raw, 0).height(), 0);
    }

    fn cell() -> impl Strategy<Value = Option<f64>> {
        prop_oneof![
            1 => Just(None),
            4 => (-100.0f64..200.0).prop_map(|v| Some((v * 4.0).round() / 4.0)),
        ]
    }

    fn dataset(rows: Vec<(Option<f64>, Option<f64>)>) -> DataFrame {
        let names: Vec<String> = (0..rows.len()).map(|i| format!("C{i}")).collect();
        let y2010: Vec<String> = rows
            .iter()
            .map(|r| r.0.map(|v| v.to_string()).unwrap_or_default())
            .collect();
        let y2017: Vec<String> = rows
            .iter()
            .map(|r| r.1.map(|v| v.to_string()).unwrap_or_else(|| "n/a".into()))
            .collect();
        let raw = df!("Country Name" => names, "2010" => y2010, "2017" => y2017).unwrap();
        DataPreparer::prepare(&raw, &years()).unwrap()
    }

    proptest! {
        #[test]
        fn prop_normalize_is_idempotent(name in "[ \t\u{feff}]{0,3}[A-Za-z0-9 ]{0,8}[ \t\u{feff}]{0,3}") {
            let once = normalize_column_name(&name);
            prop_assert_eq!(normalize_column_name(&once), once.clone());
            prop_assert!(!once.contains(BYTE_ORDER_MARK));
            prop_assert_eq!(once.trim(), once.as_str());
        }

        #[test]
        fn prop_coercion_is_total(cells in proptest::collection::vec(".{0,6}", 0..20)) {
            let raw = df!("2010" => cells.clone()).unwrap();
            let cleaned = DataPreparer::coerce_numeric(&raw, &years()).unwrap();
            let values = floats(&cleaned, "2010");
            prop_assert_eq!(values.len(), cells.len());
            prop_assert!(values.iter().flatten().all(|v| v.is_finite()));
        }

        #[test]
        fn prop_threshold_partitions_rows(
            rows in proptest::collection::vec((cell(), cell()), 0..25),
            threshold in -50.0f64..150.0,
        ) {
            let df = dataset(rows.clone());
            let expected: Vec<Option<String>> = rows
                .iter()
                .enumerate()
                .filter(|(_, r)| matches!(r.1, Some(v) if v > threshold))
                .map(|(i, _)| Some(format!("C{i}")))
                .collect();

            match DataPreparer::threshold_filter(&df, "2017", threshold).unwrap() {
                Prepared::Rows(kept) => {
                    prop_assert!(floats(&kept, "2017").iter().all(|v| matches!(v, Some(x) if *x > threshold)));
                    prop_assert_eq!(ids(&kept, "Country Name"), expected);
                }
                Prepared::NoMatches => prop_assert!(expected.is_empty()),
                Prepared::ColumnNotFound { .. } => prop_assert!(false, "column exists"),
            }
        }

        #[test]
        fn prop_top_k_is_bounded_and_descending(
            rows in proptest::collection::vec((cell(), cell()), 0..25),
            k in 0usize..8,
        ) {
            let df = dataset(rows);
            if let Prepared::Rows(top) = DataPreparer::top_k(&df, "Country Name", "2017", k).unwrap() {
                prop_assert!(top.height() <= k);
                let values = floats(&top, "2017");
                prop_assert!(values.iter().all(Option::is_some));
                prop_assert!(values.windows(2).all(|w| w[0] >= w[1]));
                prop_assert!(ids(&top, "Country Name").iter().all(Option::is_some));
            }
        }

        #[test]
        fn prop_melt_is_lossless(rows in proptest::collection::vec((cell(), cell()), 1..15)) {
            let df = dataset(rows);
            let long = DataPreparer::melt_years(&df, "Country Name", &years()).unwrap();
            prop_assert_eq!(long.height(), df.height() * 2);

            let long_ids = ids(&long, "Country Name");
            let long_years = ids(&long, YEAR_FIELD);
            let long_values = floats(&long, VALUE_FIELD);
            let wide_ids = ids(&df, "Country Name");

            for (row, id) in wide_ids.iter().enumerate() {
                for (offset, year) in ["2010", "2017"].iter().enumerate() {
                    let at = row * 2 + offset;
                    prop_assert_eq!(&long_ids[at], id);
                    prop_assert_eq!(long_years[at].as_deref(), Some(*year));
                    prop_assert_eq!(long_values[at], floats(&df, year)[row]);
                }
            }
        }
    }
}
