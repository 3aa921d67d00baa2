//! Best-fit selection.
//!
//! Within one model:
//! - the minimum finite SSE wins
//! - exact ties go to the lowest grid index (first in grid iteration order)
//! - if no entry is finite there is no fit, and that is an error
//!
//! Across models (when several are fitted to the same data) we compare
//! `BIC = n * ln(SSE/n) + k * ln(n)`; if a simpler model is within 2 BIC points
//! of the best, the simpler model is preferred.

use std::cmp::Ordering;

use crate::domain::{BestFit, ResidualEntry, ResidualTable};
use crate::error::FitError;
use crate::fit::ModelFit;

/// Select the minimizing grid point of a residual table.
pub fn select_best(table: &ResidualTable) -> Result<BestFit, FitError> {
    let mut best: Option<&ResidualEntry> = None;
    for e in table.entries() {
        if !e.sse.is_finite() {
            continue;
        }
        match best {
            None => best = Some(e),
            Some(b) if e.sse < b.sse || (e.sse == b.sse && e.index < b.index) => best = Some(e),
            Some(_) => {}
        }
    }

    let best = best.ok_or(FitError::NoValidFit {
        grid_points: table.len(),
    })?;

    Ok(BestFit {
        index: best.index,
        param_names: table.param_names().to_vec(),
        params: best.params.clone(),
        sse: best.sse,
    })
}

/// The `n` best finite entries, ascending by SSE, ties by grid index.
pub fn top_candidates(table: &ResidualTable, n: usize) -> Vec<ResidualEntry> {
    let mut finite: Vec<&ResidualEntry> = table.entries().iter().filter(|e| e.sse.is_finite()).collect();
    finite.sort_by(|a, b| {
        a.sse
            .partial_cmp(&b.sse)
            .unwrap_or(Ordering::Equal)
            .then(a.index.cmp(&b.index))
    });
    finite.into_iter().take(n).cloned().collect()
}

/// Pick among per-model fits by BIC, preferring fewer parameters within ΔBIC ≤ 2.
///
/// Returns the index into `fits`, or `None` if `fits` is empty.
pub fn select_by_bic(fits: &[ModelFit]) -> Option<usize> {
    let best_bic = fits
        .iter()
        .map(|f| f.quality.bic)
        .min_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal))?;

    // Among fits close enough to the best, take the one with the fewest
    // parameters; ties keep input order.
    fits.iter()
        .enumerate()
        .filter(|(_, f)| f.quality.bic <= best_bic + 2.0)
        .min_by_key(|(i, f)| (f.quality.k, *i))
        .map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FitQuality, ModelKind, ModelSettings};

    fn table(sse: &[f64]) -> ResidualTable {
        let entries = sse
            .iter()
            .enumerate()
            .map(|(i, &s)| ResidualEntry {
                index: i,
                params: vec![i as f64],
                sse: s,
            })
            .collect();
        ResidualTable::new(vec!["p".to_string()], entries)
    }

    #[test]
    fn picks_the_minimum() {
        let best = select_best(&table(&[4.0, 1.0, 3.0, 2.0])).unwrap();
        assert_eq!(best.index, 1);
        assert_eq!(best.params, vec![1.0]);
        assert_eq!(best.sse, 1.0);
    }

    #[test]
    fn ties_go_to_lowest_index() {
        let t = table(&[5.0, 2.0, 9.0, 2.0, 2.0]);
        for _ in 0..10 {
            assert_eq!(select_best(&t).unwrap().index, 1);
        }
    }

    #[test]
    fn non_finite_entries_are_skipped() {
        let best = select_best(&table(&[f64::NAN, f64::INFINITY, 7.0, f64::NAN])).unwrap();
        assert_eq!(best.index, 2);
    }

    #[test]
    fn all_non_finite_is_no_valid_fit() {
        let err = select_best(&table(&[f64::NAN, f64::INFINITY])).unwrap_err();
        assert_eq!(err, FitError::NoValidFit { grid_points: 2 });
    }

    #[test]
    fn selected_minimum_matches_brute_force_scan() {
        let values: Vec<f64> = (0..97).map(|i| ((i * 37) % 101) as f64 * 0.5 + 3.0).collect();
        let best = select_best(&table(&values)).unwrap();
        let mut brute = f64::INFINITY;
        for &v in &values {
            if v < brute {
                brute = v;
            }
        }
        assert_eq!(best.sse, brute);
        assert_eq!(values[best.index], brute);
    }

    #[test]
    fn top_candidates_sorted_with_stable_ties() {
        let top = top_candidates(&table(&[3.0, 1.0, f64::NAN, 1.0, 0.5]), 3);
        let idx: Vec<usize> = top.iter().map(|e| e.index).collect();
        assert_eq!(idx, vec![4, 1, 3]);
    }

    fn fit(kind: ModelKind, bic: f64) -> ModelFit {
        ModelFit {
            settings: match kind {
                ModelKind::Exponential => ModelSettings::Exponential { n0: 1.0, t0: 0.0 },
                ModelKind::Sine => ModelSettings::Sine {
                    amplitude: 1.0,
                    period: 1.0,
                    offset: 0.0,
                },
                ModelKind::Logistic => ModelSettings::Logistic {
                    n0: 1.0,
                    t0: 0.0,
                    integrator: Default::default(),
                },
            },
            best: BestFit {
                index: 0,
                param_names: vec![],
                params: vec![],
                sse: 1.0,
            },
            quality: FitQuality {
                sse: 1.0,
                rmse: 1.0,
                bic,
                n: 10,
                k: kind.param_count(),
            },
            table: table(&[1.0]),
        }
    }

    #[test]
    fn bic_prefers_simpler_when_close() {
        let fits = vec![fit(ModelKind::Logistic, 10.0), fit(ModelKind::Exponential, 11.5)];
        assert_eq!(select_by_bic(&fits), Some(1));
    }

    #[test]
    fn bic_takes_complex_model_when_clearly_better() {
        let fits = vec![fit(ModelKind::Exponential, 20.0), fit(ModelKind::Logistic, 10.0)];
        assert_eq!(select_by_bic(&fits), Some(1));
        assert_eq!(select_by_bic(&[]), None);
    }
}
