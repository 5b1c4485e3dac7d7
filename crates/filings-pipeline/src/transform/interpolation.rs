//! Zero-crossing interpolation for divergence charts
//!
//! A signed metric is split into a positive (`>= 0`) and a negative (`< 0`)
//! series. Wherever two chronologically adjacent dates fall on different
//! sides, a synthetic zero is inserted into both series at the midpoint date
//! so the two shaded areas meet at the baseline. Both series are then
//! reconciled against the full set of dates: a side that does not own a date
//! gets `null` there, never zero.
//!
//! A midpoint can land on a date already in the union: a nulled row between
//! the two signs, or the start of a transition between adjacent days. The zero
//! then goes on every side that does not own that date, so each sign change
//! still meets the baseline.

use super::charts::metric_color;
use super::payload::{DivergenceSeriesPair, LineSeries, Point};
use crate::dataset::{CategoryDataset, Cell};
use crate::error::{PipelineError, Result};
use crate::processing::FiscalPeriod;
use chrono::{NaiveDate, TimeDelta};
use std::collections::{BTreeMap, BTreeSet};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Descriptive fields carried alongside a value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Descriptor {
    pub entity: Option<String>,
    pub cik: Option<u64>,
    pub year: Option<i32>,
    pub quarter: Option<FiscalPeriod>,
}

/// A dated, signed observation of the metric
#[derive(Debug, Clone, PartialEq)]
pub struct SignedRecord {
    pub date: NaiveDate,
    pub value: f64,
    pub descriptor: Descriptor,
}

/// Records split by sign, plus dates whose value could not be read
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Segregated {
    pub positive: Vec<SignedRecord>,
    pub negative: Vec<SignedRecord>,
    pub nulled: Vec<NaiveDate>,
}

/// One entry of a reconciled series
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciledRow {
    pub date: NaiveDate,
    pub value: Option<f64>,
    pub synthetic: bool,
    pub descriptor: Descriptor,
}

/// Builds divergence series from one signed column of a dataset
pub struct InterpolationTransformer<'a> {
    dataset: &'a CategoryDataset,
}

impl<'a> InterpolationTransformer<'a> {
    pub fn new(dataset: &'a CategoryDataset) -> Self {
        Self { dataset }
    }

    /// Split the metric's rows by sign, in date order
    ///
    /// Rows whose value is null or non-numeric are logged and kept only as
    /// dates, so they appear as null on both sides.
    pub fn segregate_by_sign(&self, metric: &str) -> Result<Segregated> {
        let index = self.dataset.column_index(metric).ok_or_else(|| {
            PipelineError::Validation(format!("Missing required column for divergence: {metric}"))
        })?;

        let mut segregated = Segregated::default();
        for row in self.dataset.rows() {
            let value = match &row.cells[index] {
                Cell::Number(value) => *value,
                other => {
                    tracing::warn!(
                        "Nulling unreadable {metric} value {:?} at {}",
                        other,
                        row.key.date
                    );
                    segregated.nulled.push(row.key.date);
                    continue;
                }
            };

            let record = SignedRecord {
                date: row.key.date,
                value,
                descriptor: Descriptor {
                    entity: Some(row.key.entity.clone()),
                    cik: Some(row.key.cik),
                    year: Some(row.key.year),
                    quarter: Some(row.key.quarter),
                },
            };
            if value >= 0.0 {
                segregated.positive.push(record);
            } else {
                segregated.negative.push(record);
            }
        }

        segregated.positive.sort_by_key(|r| r.date);
        segregated.negative.sort_by_key(|r| r.date);
        Ok(segregated)
    }

    /// Adjacent date pairs whose owners differ in sign
    pub fn find_transitions(
        positive: &[SignedRecord],
        negative: &[SignedRecord],
    ) -> Vec<(NaiveDate, NaiveDate)> {
        let positive_dates: BTreeSet<NaiveDate> = positive.iter().map(|r| r.date).collect();
        let negative_dates: BTreeSet<NaiveDate> = negative.iter().map(|r| r.date).collect();
        let all_dates: Vec<NaiveDate> = positive_dates.union(&negative_dates).copied().collect();

        all_dates
            .windows(2)
            .filter(|pair| {
                let (current, next) = (pair[0], pair[1]);
                (positive_dates.contains(&current) && negative_dates.contains(&next))
                    || (negative_dates.contains(&current) && positive_dates.contains(&next))
            })
            .map(|pair| (pair[0], pair[1]))
            .collect()
    }

    /// Temporal midpoint, truncated to whole days
    pub fn midpoint(start: NaiveDate, end: NaiveDate) -> NaiveDate {
        let half = (end - start).num_days() / 2;
        start
            .checked_add_signed(TimeDelta::days(half))
            .unwrap_or(start)
    }

    /// Insert zeros at transition midpoints and align both sides on every date
    pub fn reconcile(
        segregated: &Segregated,
        transitions: &[(NaiveDate, NaiveDate)],
    ) -> (Vec<ReconciledRow>, Vec<ReconciledRow>) {
        let mut all_dates: BTreeSet<NaiveDate> = segregated
            .positive
            .iter()
            .chain(&segregated.negative)
            .map(|r| r.date)
            .chain(segregated.nulled.iter().copied())
            .collect();

        let midpoints: BTreeSet<NaiveDate> = transitions
            .iter()
            .map(|&(start, end)| {
                let midpoint = Self::midpoint(start, end);
                if all_dates.contains(&midpoint) {
                    tracing::debug!("Zero for {start}..{end} shares the existing date {midpoint}");
                }
                midpoint
            })
            .collect();
        all_dates.extend(midpoints.iter().copied());

        let side = |records: &[SignedRecord]| {
            let owned: BTreeMap<NaiveDate, &SignedRecord> =
                records.iter().map(|r| (r.date, r)).collect();
            let mut rows: Vec<ReconciledRow> = all_dates
                .iter()
                .map(|&date| {
                    if let Some(record) = owned.get(&date) {
                        ReconciledRow {
                            date,
                            value: Some(record.value),
                            synthetic: false,
                            descriptor: record.descriptor.clone(),
                        }
                    } else if midpoints.contains(&date) {
                        ReconciledRow {
                            date,
                            value: Some(0.0),
                            synthetic: true,
                            descriptor: Descriptor::default(),
                        }
                    } else {
                        ReconciledRow {
                            date,
                            value: None,
                            synthetic: false,
                            descriptor: Descriptor::default(),
                        }
                    }
                })
                .collect();
            fill_descriptors(&mut rows);
            rows
        };

        (side(&segregated.positive), side(&segregated.negative))
    }

    /// Full transform: `"{metric} positive"` and `"{metric} negative"` series
    pub fn stream(&self, metric: &str) -> Result<DivergenceSeriesPair> {
        let segregated = self.segregate_by_sign(metric)?;
        let transitions = Self::find_transitions(&segregated.positive, &segregated.negative);
        tracing::debug!("{metric}: {} sign transitions", transitions.len());

        let (positive, negative) = Self::reconcile(&segregated, &transitions);
        Ok(DivergenceSeriesPair {
            positive: to_series(format!("{metric} positive"), &positive),
            negative: to_series(format!("{metric} negative"), &negative),
        })
    }
}

fn to_series(id: String, rows: &[ReconciledRow]) -> LineSeries {
    LineSeries {
        color: metric_color(&id),
        id,
        points: rows
            .iter()
            .map(|row| Point {
                x: row.date.format(DATE_FORMAT).to_string(),
                y: row.value,
            })
            .collect(),
    }
}

/// Forward-fill then back-fill each descriptive field independently
fn fill_descriptors(rows: &mut [ReconciledRow]) {
    fill_field(rows, |d| &mut d.entity);
    fill_field(rows, |d| &mut d.cik);
    fill_field(rows, |d| &mut d.year);
    fill_field(rows, |d| &mut d.quarter);
}

fn fill_field<T: Clone>(rows: &mut [ReconciledRow], field: impl Fn(&mut Descriptor) -> &mut Option<T>) {
    let mut last: Option<T> = None;
    for row in rows.iter_mut() {
        let slot = field(&mut row.descriptor);
        if let Some(value) = slot.as_ref() {
            last = Some(value.clone());
        } else {
            slot.clone_from(&last);
        }
    }

    let mut next: Option<T> = None;
    for row in rows.iter_mut().rev() {
        let slot = field(&mut row.descriptor);
        if let Some(value) = slot.as_ref() {
            next = Some(value.clone());
        } else {
            slot.clone_from(&next);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{DatasetRow, PeriodKey};

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn margins(values: &[(&str, Cell)]) -> CategoryDataset {
        let rows = values
            .iter()
            .map(|(d, cell)| DatasetRow {
                key: PeriodKey {
                    entity: "BOEING CO".to_string(),
                    cik: 12927,
                    date: date(d),
                    year: 2016,
                    quarter: FiscalPeriod::Q1,
                },
                cells: vec![cell.clone()],
            })
            .collect();
        CategoryDataset::from_rows(vec!["PROFIT_MARGIN".to_string()], rows).unwrap()
    }

    #[test]
    fn test_sign_changes_insert_zero_midpoints() {
        let dataset = margins(&[
            ("2016-03-31", Cell::Number(5.0)),
            ("2016-06-30", Cell::Number(-2.0)),
            ("2016-09-30", Cell::Number(3.0)),
        ]);
        let transformer = InterpolationTransformer::new(&dataset);

        let segregated = transformer.segregate_by_sign("PROFIT_MARGIN").unwrap();
        let transitions =
            InterpolationTransformer::find_transitions(&segregated.positive, &segregated.negative);
        assert_eq!(
            transitions,
            vec![
                (date("2016-03-31"), date("2016-06-30")),
                (date("2016-06-30"), date("2016-09-30")),
            ]
        );

        let pair = transformer.stream("PROFIT_MARGIN").unwrap();
        assert_eq!(pair.positive.id, "PROFIT_MARGIN positive");
        assert_eq!(pair.negative.id, "PROFIT_MARGIN negative");

        let positive: Vec<(&str, Option<f64>)> =
            pair.positive.points.iter().map(|p| (p.x.as_str(), p.y)).collect();
        assert_eq!(
            positive,
            vec![
                ("2016-03-31", Some(5.0)),
                ("2016-05-15", Some(0.0)),
                ("2016-06-30", None),
                ("2016-08-15", Some(0.0)),
                ("2016-09-30", Some(3.0)),
            ]
        );

        let negative: Vec<Option<f64>> = pair.negative.points.iter().map(|p| p.y).collect();
        assert_eq!(negative, vec![None, Some(0.0), Some(-2.0), Some(0.0), None]);
    }

    #[test]
    fn test_union_is_originals_plus_midpoints() {
        let values = [4.72, 7.5, -0.95, -1.2, 9.54, 7.0, -3.0];
        let dates = [
            "2015-03-31", "2015-06-30", "2015-09-30", "2015-12-31", "2016-03-31", "2016-06-30",
            "2016-09-30",
        ];
        let rows: Vec<(&str, Cell)> = dates
            .iter()
            .zip(values)
            .map(|(d, v)| (*d, Cell::Number(v)))
            .collect();
        let dataset = margins(&rows);
        let transformer = InterpolationTransformer::new(&dataset);

        let segregated = transformer.segregate_by_sign("PROFIT_MARGIN").unwrap();
        let transitions =
            InterpolationTransformer::find_transitions(&segregated.positive, &segregated.negative);
        let k = transitions.len();
        assert_eq!(k, 3);

        let (positive, negative) = InterpolationTransformer::reconcile(&segregated, &transitions);
        for side in [&positive, &negative] {
            assert_eq!(side.len(), dates.len() + k);
            assert_eq!(side.iter().filter(|r| r.synthetic && r.value == Some(0.0)).count(), k);
        }
        let union: BTreeSet<NaiveDate> = positive.iter().map(|r| r.date).collect();
        let originals: BTreeSet<NaiveDate> = dates.iter().map(|d| date(d)).collect();
        assert_eq!(union.difference(&originals).count(), k);
    }

    #[test]
    fn test_no_sign_change_leaves_other_side_null() {
        let dataset = margins(&[
            ("2016-03-31", Cell::Number(1.0)),
            ("2016-06-30", Cell::Number(2.0)),
        ]);
        let pair = InterpolationTransformer::new(&dataset).stream("PROFIT_MARGIN").unwrap();

        assert_eq!(pair.positive.points.len(), 2);
        assert!(pair.negative.points.iter().all(|p| p.y.is_none()));
    }

    #[test]
    fn test_single_record_passes_through() {
        let dataset = margins(&[("2016-03-31", Cell::Number(-4.0))]);
        let pair = InterpolationTransformer::new(&dataset).stream("PROFIT_MARGIN").unwrap();

        assert_eq!(pair.negative.points.len(), 1);
        assert_eq!(pair.negative.points[0].y, Some(-4.0));
        assert_eq!(pair.positive.points[0].y, None);
    }

    #[test]
    fn test_unreadable_values_are_nulled_in_place() {
        let dataset = margins(&[
            ("2016-03-31", Cell::Number(1.0)),
            ("2016-06-30", Cell::Text("n/a".into())),
            ("2016-09-30", Cell::Null),
        ]);
        let pair = InterpolationTransformer::new(&dataset).stream("PROFIT_MARGIN").unwrap();

        let positive: Vec<Option<f64>> = pair.positive.points.iter().map(|p| p.y).collect();
        assert_eq!(positive, vec![Some(1.0), None, None]);
        assert_eq!(pair.negative.points.len(), 3);
    }

    #[test]
    fn test_null_between_signs_carries_the_zero() {
        let dataset = margins(&[
            ("2016-03-31", Cell::Number(5.0)),
            ("2016-06-30", Cell::Null),
            ("2016-09-30", Cell::Number(-2.0)),
        ]);
        let transformer = InterpolationTransformer::new(&dataset);
        let segregated = transformer.segregate_by_sign("PROFIT_MARGIN").unwrap();
        let transitions =
            InterpolationTransformer::find_transitions(&segregated.positive, &segregated.negative);
        assert_eq!(transitions, vec![(date("2016-03-31"), date("2016-09-30"))]);

        let (positive, negative) = InterpolationTransformer::reconcile(&segregated, &transitions);
        for side in [&positive, &negative] {
            assert_eq!(side.len(), 3);
            assert_eq!(side.iter().filter(|r| r.synthetic && r.value == Some(0.0)).count(), 1);
        }

        let pair = transformer.stream("PROFIT_MARGIN").unwrap();
        let positive: Vec<(&str, Option<f64>)> =
            pair.positive.points.iter().map(|p| (p.x.as_str(), p.y)).collect();
        assert_eq!(
            positive,
            vec![
                ("2016-03-31", Some(5.0)),
                ("2016-06-30", Some(0.0)),
                ("2016-09-30", None),
            ]
        );
        let negative: Vec<Option<f64>> = pair.negative.points.iter().map(|p| p.y).collect();
        assert_eq!(negative, vec![None, Some(0.0), Some(-2.0)]);
    }

    #[test]
    fn test_adjacent_days_anchor_zero_on_the_other_side() {
        let dataset = margins(&[
            ("2016-01-01", Cell::Number(5.0)),
            ("2016-01-02", Cell::Number(-2.0)),
        ]);
        let pair = InterpolationTransformer::new(&dataset).stream("PROFIT_MARGIN").unwrap();

        // The midpoint truncates onto 2016-01-01, which the positive side owns
        let positive: Vec<Option<f64>> = pair.positive.points.iter().map(|p| p.y).collect();
        let negative: Vec<Option<f64>> = pair.negative.points.iter().map(|p| p.y).collect();
        assert_eq!(positive, vec![Some(5.0), None]);
        assert_eq!(negative, vec![Some(0.0), Some(-2.0)]);
    }

    #[test]
    fn test_descriptors_are_filled_both_ways() {
        let dataset = margins(&[
            ("2016-03-31", Cell::Number(-1.0)),
            ("2016-06-30", Cell::Number(2.0)),
        ]);
        let transformer = InterpolationTransformer::new(&dataset);
        let segregated = transformer.segregate_by_sign("PROFIT_MARGIN").unwrap();
        let transitions =
            InterpolationTransformer::find_transitions(&segregated.positive, &segregated.negative);
        let (positive, _) = InterpolationTransformer::reconcile(&segregated, &transitions);

        // Leading null and synthetic rows take the descriptor of the later owned row
        assert!(positive.iter().all(|r| r.descriptor.entity.as_deref() == Some("BOEING CO")));
        assert!(positive.iter().all(|r| r.descriptor.cik == Some(12927)));
    }

    #[test]
    fn test_missing_metric_is_validation_error() {
        let dataset = margins(&[("2016-03-31", Cell::Number(1.0))]);
        let result = InterpolationTransformer::new(&dataset).stream("NOPE");
        assert!(matches!(result, Err(PipelineError::Validation(_))));
    }

    #[test]
    fn test_midpoint_truncates() {
        assert_eq!(
            InterpolationTransformer::midpoint(date("2016-03-31"), date("2016-06-30")),
            date("2016-05-15")
        );
        assert_eq!(
            InterpolationTransformer::midpoint(date("2016-01-01"), date("2016-01-02")),
            date("2016-01-01")
        );
    }
}
