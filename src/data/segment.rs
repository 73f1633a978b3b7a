use thiserror::Error;

/// Labels for the `avg_position` split, lower bucket first.
pub const LEVERAGE_LABELS: [&str; 2] = ["Low Leverage", "High Leverage"];

/// Labels for the `num_trades` split, lower bucket first.
pub const FREQUENCY_LABELS: [&str; 2] = ["Infrequent", "Frequent"];

#[derive(Debug, Error, PartialEq)]
pub enum SegmentError {
    #[error("cannot split '{column}' into two segments: it has {distinct} distinct value(s)")]
    TooFewDistinct { column: String, distinct: usize },

    #[error("cannot split '{column}': row {row} holds non-finite value {value}")]
    NonFinite {
        column: String,
        row: usize,
        value: f64,
    },
}

/// Split `values` into two equal-population buckets around the median.
///
/// Rows are ranked by value ascending; equal values keep their original row
/// order. The first `ceil(n / 2)` ranks get `labels[0]`, the remaining ranks
/// get `labels[1]`, so the bucket sizes never differ by more than one and an
/// odd row goes to the lower bucket.
///
/// Returns one label per input value, in input order.
pub fn median_split<'a>(
    column: &str,
    values: &[f64],
    labels: [&'a str; 2],
) -> Result<Vec<&'a str>, SegmentError> {
    if let Some((row, &value)) = values.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(SegmentError::NonFinite {
            column: column.to_string(),
            row,
            value,
        });
    }

    let distinct = count_distinct(values);
    if distinct < 2 {
        return Err(SegmentError::TooFewDistinct {
            column: column.to_string(),
            distinct,
        });
    }

    let mut order: Vec<usize> = (0..values.len()).collect();
    // `sort_by` is stable, so ties stay in row order.
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let lower_len = values.len().div_ceil(2);
    let mut out = vec![labels[1]; values.len()];
    for &idx in &order[..lower_len] {
        out[idx] = labels[0];
    }
    Ok(out)
}

fn count_distinct(values: &[f64]) -> usize {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted.dedup_by(|a, b| a == b);
    sorted.len()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn count(labels: &[&str], which: &str) -> usize {
        labels.iter().filter(|l| **l == which).count()
    }

    #[test]
    fn one_to_ten_splits_five_five() {
        let values: Vec<f64> = (1..=10).map(f64::from).collect();
        let labels = median_split("num_trades", &values, FREQUENCY_LABELS).unwrap();

        assert_eq!(count(&labels, "Infrequent"), 5);
        assert_eq!(count(&labels, "Frequent"), 5);
        assert!(labels[..5].iter().all(|l| *l == "Infrequent"));
        assert!(labels[5..].iter().all(|l| *l == "Frequent"));
    }

    #[test]
    fn labels_follow_input_order_not_sorted_order() {
        let values = [50.0, 1.0, 30.0, 2.0];
        let labels = median_split("avg_position", &values, LEVERAGE_LABELS).unwrap();
        assert_eq!(
            labels,
            vec!["High Leverage", "Low Leverage", "High Leverage", "Low Leverage"]
        );
    }

    #[test]
    fn odd_count_gives_lower_bucket_the_extra_row() {
        let values = [3.0, 1.0, 2.0, 5.0, 4.0];
        let labels = median_split("x", &values, ["lo", "hi"]).unwrap();
        assert_eq!(count(&labels, "lo"), 3);
        assert_eq!(count(&labels, "hi"), 2);
        // the median value itself is in the lower bucket
        assert_eq!(labels[0], "lo");
    }

    #[test]
    fn ties_at_the_boundary_break_by_row_order() {
        let values = [1.0, 2.0, 2.0, 2.0, 2.0, 3.0];
        let labels = median_split("x", &values, ["lo", "hi"]).unwrap();
        assert_eq!(labels, vec!["lo", "lo", "lo", "hi", "hi", "hi"]);
    }

    #[test]
    fn balance_holds_for_skewed_columns() {
        let mut values = vec![0.0; 7];
        values.extend([1.0, 100.0]);
        let labels = median_split("x", &values, ["lo", "hi"]).unwrap();

        let lo = count(&labels, "lo");
        let hi = count(&labels, "hi");
        assert_eq!(lo + hi, values.len());
        assert!(lo.abs_diff(hi) <= 1);
    }

    #[test]
    fn single_distinct_value_is_rejected() {
        let err = median_split("num_trades", &[4.0, 4.0, 4.0], FREQUENCY_LABELS).unwrap_err();
        assert_eq!(
            err,
            SegmentError::TooFewDistinct {
                column: "num_trades".to_string(),
                distinct: 1,
            }
        );
    }

    #[test]
    fn empty_column_is_rejected() {
        let err = median_split("num_trades", &[], FREQUENCY_LABELS).unwrap_err();
        assert!(matches!(err, SegmentError::TooFewDistinct { distinct: 0, .. }));
    }

    #[test]
    fn nan_is_rejected_with_its_row() {
        let err = median_split("avg_position", &[1.0, f64::NAN, 3.0], LEVERAGE_LABELS).unwrap_err();
        assert!(matches!(err, SegmentError::NonFinite { row: 1, .. }));
    }

    proptest! {
        #[test]
        fn split_is_balanced_and_ordered(
            values in prop::collection::vec((0i32..12).prop_map(f64::from), 0..60),
        ) {
            match median_split("x", &values, ["lo", "hi"]) {
                Ok(labels) => {
                    prop_assert_eq!(labels.len(), values.len());
                    let lo = count(&labels, "lo");
                    let hi = count(&labels, "hi");
                    prop_assert_eq!(lo + hi, values.len());
                    prop_assert!(lo == hi || lo == hi + 1);

                    let max_lo = values.iter().zip(&labels).filter(|(_, l)| **l == "lo").map(|(v, _)| *v).fold(f64::MIN, f64::max);
                    let min_hi = values.iter().zip(&labels).filter(|(_, l)| **l == "hi").map(|(v, _)| *v).fold(f64::MAX, f64::min);
                    prop_assert!(max_lo <= min_hi);
                }
                Err(SegmentError::TooFewDistinct { distinct, .. }) => {
                    prop_assert!(distinct < 2);
                    prop_assert_eq!(distinct, count_distinct(&values));
                }
                Err(other) => prop_assert!(false, "unexpected error: {}", other),
            }
        }

        #[test]
        fn any_finite_column_with_two_values_splits(
            values in prop::collection::vec(-1.0e9f64..1.0e9, 2..80),
        ) {
            prop_assume!(count_distinct(&values) >= 2);
            let labels = median_split("avg_position", &values, LEVERAGE_LABELS).unwrap();
            let low = count(&labels, LEVERAGE_LABELS[0]);
            prop_assert_eq!(low, values.len().div_ceil(2));
        }
    }
}
