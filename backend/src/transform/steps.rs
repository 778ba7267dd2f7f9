//! Cleaning steps. Each takes the working table and returns a new one.

use std::collections::HashSet;

use crate::error::{PipelineError, PipelineResult};
use crate::models::{Cell, Column, Table};

/// Drop rows equal to an earlier row, keeping first occurrences in order.
///
/// Missing cells compare equal to each other.
pub fn remove_duplicates(table: &Table) -> Table {
    let mut seen: HashSet<Vec<&Cell>> = HashSet::with_capacity(table.row_count());
    let keep: Vec<usize> = (0..table.row_count())
        .filter(|&i| seen.insert(table.row(i)))
        .collect();
    table.take_rows(&keep)
}

/// Arithmetic mean of the numeric cells of a column, `None` when it has none.
///
/// The result is always finite: a sum that overflows is recomputed from
/// pre-divided values, which stay within the range of the inputs.
pub fn column_mean(column: &Column) -> Option<f64> {
    let numbers = || column.values.iter().filter_map(Cell::as_number);

    let count = numbers().count();
    if count == 0 {
        return None;
    }

    let n = count as f64;
    let sum: f64 = numbers().sum();
    let mean = if sum.is_finite() {
        sum / n
    } else {
        numbers().map(|x| x / n).sum()
    };

    mean.is_finite().then_some(mean)
}

/// Replace missing cells of numeric columns with the column mean.
///
/// Other columns are returned unchanged, missing cells included. A numeric
/// column without any value has no mean and stays missing.
pub fn fill_missing_with_mean(table: &Table) -> Table {
    let columns = table
        .columns()
        .iter()
        .map(|column| {
            if !column.kind.is_numeric() {
                return column.clone();
            }
            match column_mean(column) {
                Some(mean) => column.with_values(
                    column
                        .values
                        .iter()
                        .map(|cell| match cell {
                            Cell::Missing => Cell::Number(mean),
                            other => other.clone(),
                        })
                        .collect(),
                ),
                None => column.clone(),
            }
        })
        .collect();

    Table::new(columns, table.row_count())
}

/// Keep the selected columns, in table order.
///
/// An empty selection keeps the rows but no columns.
pub fn select_columns(table: &Table, selection: &[String]) -> PipelineResult<Table> {
    if let Some(unknown) = selection.iter().find(|name| table.column(name).is_none()) {
        return Err(PipelineError::UnknownColumn(unknown.clone()));
    }

    let columns = table
        .columns()
        .iter()
        .filter(|c| selection.contains(&c.name))
        .cloned()
        .collect();

    Ok(Table::new(columns, table.row_count()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ColumnKind;

    fn n(value: f64) -> Cell {
        Cell::Number(value)
    }

    fn t(value: &str) -> Cell {
        Cell::Text(value.to_string())
    }

    /// `[{a:1,b:2},{a:1,b:2},{a:3,b:null}]`
    fn sample() -> Table {
        Table::from_rows(
            vec!["a", "b"],
            vec![
                vec![n(1.0), n(2.0)],
                vec![n(1.0), n(2.0)],
                vec![n(3.0), Cell::Missing],
            ],
        )
    }

    fn names(selection: &[&str]) -> Vec<String> {
        selection.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let deduped = remove_duplicates(&sample());

        assert_eq!(deduped.row_count(), 2);
        assert_eq!(deduped.row(0), vec![&n(1.0), &n(2.0)]);
        assert_eq!(deduped.row(1), vec![&n(3.0), &Cell::Missing]);
    }

    #[test]
    fn test_dedup_preserves_order() {
        let table = Table::from_rows(
            vec!["k"],
            vec![vec![t("b")], vec![t("a")], vec![t("b")], vec![t("c")], vec![t("a")]],
        );
        let deduped = remove_duplicates(&table);

        let values: Vec<String> = deduped.rows().map(|r| r[0].to_string()).collect();
        assert_eq!(values, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_dedup_missing_equals_missing() {
        let table = Table::from_rows(
            vec!["a", "b"],
            vec![vec![n(1.0), Cell::Missing], vec![n(1.0), Cell::Missing]],
        );
        assert_eq!(remove_duplicates(&table).row_count(), 1);
    }

    #[test]
    fn test_dedup_is_idempotent() {
        let once = remove_duplicates(&sample());
        let twice = remove_duplicates(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_fill_missing_with_mean() {
        let filled = fill_missing_with_mean(&remove_duplicates(&sample()));

        assert_eq!(filled.row(0), vec![&n(1.0), &n(2.0)]);
        assert_eq!(filled.row(1), vec![&n(3.0), &n(2.0)]);
    }

    #[test]
    fn test_fill_uses_non_missing_values_only() {
        let table = Table::from_rows(
            vec!["x"],
            vec![vec![n(1.0)], vec![Cell::Missing], vec![n(4.0)], vec![Cell::Missing]],
        );
        let filled = fill_missing_with_mean(&table);
        assert_eq!(filled.column("x").unwrap().values, vec![n(1.0), n(2.5), n(4.0), n(2.5)]);
    }

    #[test]
    fn test_fill_leaves_non_numeric_columns_untouched() {
        let table = Table::from_rows(
            vec!["name", "score"],
            vec![
                vec![t("ann"), n(10.0)],
                vec![Cell::Missing, Cell::Missing],
                vec![t("bob"), n(20.0)],
            ],
        );
        let filled = fill_missing_with_mean(&table);

        assert_eq!(filled.column("name"), table.column("name"));
        assert_eq!(filled.column("name").unwrap().values[1], Cell::Missing);
        assert_eq!(filled.column("score").unwrap().values[1], n(15.0));
    }

    #[test]
    fn test_fill_all_missing_column_stays_missing() {
        let table = Table::from_rows(
            vec!["empty"],
            vec![vec![Cell::Missing], vec![Cell::Missing]],
        );
        assert_eq!(table.column("empty").unwrap().kind, ColumnKind::Numeric);

        let filled = fill_missing_with_mean(&table);
        assert!(filled.column("empty").unwrap().values.iter().all(Cell::is_missing));
    }

    #[test]
    fn test_column_mean() {
        let column = Column::new("v", vec![n(2.0), Cell::Missing, n(4.0)]);
        assert_eq!(column_mean(&column), Some(3.0));
        assert_eq!(column_mean(&Column::new("e", vec![Cell::Missing])), None);
    }

    #[test]
    fn test_fill_with_huge_values_stays_finite() {
        let table = Table::from_rows(vec!["v"], vec![vec![n(1e308)], vec![n(1e308)], vec![Cell::Missing]]);

        assert_eq!(column_mean(&table.columns()[0]), Some(1e308));

        let filled = fill_missing_with_mean(&table);
        let values = &filled.column("v").unwrap().values;
        assert_eq!(values[2], n(1e308));
        assert!(values.iter().all(|c| c.as_number().is_some_and(f64::is_finite)));
    }

    #[test]
    fn test_select_columns() {
        let deduped = remove_duplicates(&sample());
        let selected = select_columns(&deduped, &names(&["a"])).unwrap();

        assert_eq!(selected.column_names(), vec!["a"]);
        assert_eq!(selected.row(0), vec![&n(1.0)]);
        assert_eq!(selected.row(1), vec![&n(3.0)]);
    }

    #[test]
    fn test_select_keeps_table_order() {
        let table = Table::from_rows(vec!["a", "b", "c"], vec![vec![n(1.0), n(2.0), n(3.0)]]);
        let selected = select_columns(&table, &names(&["c", "a"])).unwrap();
        assert_eq!(selected.column_names(), vec!["a", "c"]);
    }

    #[test]
    fn test_select_is_idempotent() {
        let selection = names(&["b"]);
        let once = select_columns(&sample(), &selection).unwrap();
        let twice = select_columns(&once, &selection).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_empty_selection_keeps_row_count() {
        let selected = select_columns(&sample(), &[]).unwrap();
        assert_eq!(selected.column_count(), 0);
        assert_eq!(selected.row_count(), 3);
    }

    #[test]
    fn test_unknown_column() {
        let err = select_columns(&sample(), &names(&["a", "zzz"])).unwrap_err();
        assert!(matches!(err, PipelineError::UnknownColumn(name) if name == "zzz"));
    }
}
