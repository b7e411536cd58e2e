//! Evaluation metrics: confusion matrix and per-class report

use std::fmt;

use lsc_common::LungSoundClass;
use serde::Serialize;

const NUM_CLASSES: usize = LungSoundClass::ALL.len();

/// Rows are true classes, columns are predicted classes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConfusionMatrix {
    pub counts: [[usize; NUM_CLASSES]; NUM_CLASSES],
}

impl ConfusionMatrix {
    pub fn from_labels(truth: &[LungSoundClass], predicted: &[LungSoundClass]) -> Self {
        let mut matrix = Self::default();
        for (t, p) in truth.iter().zip(predicted) {
            matrix.counts[t.index()][p.index()] += 1;
        }
        matrix
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    pub fn correct(&self) -> usize {
        (0..NUM_CLASSES).map(|i| self.counts[i][i]).sum()
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.correct(), self.total())
    }

    /// True samples of `class`
    pub fn support(&self, class: LungSoundClass) -> usize {
        self.counts[class.index()].iter().sum()
    }

    fn predicted(&self, class: LungSoundClass) -> usize {
        self.counts.iter().map(|row| row[class.index()]).sum()
    }
}

/// Precision, recall and F1 for one class
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub class: LungSoundClass,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AverageMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Per-class metrics with accuracy plus macro and support-weighted averages.
/// Undefined ratios (zero denominators) are reported as 0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationReport {
    pub classes: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: AverageMetrics,
    pub weighted_avg: AverageMetrics,
    pub confusion_matrix: ConfusionMatrix,
}

impl ClassificationReport {
    pub fn from_confusion(matrix: ConfusionMatrix) -> Self {
        let classes: Vec<ClassMetrics> = LungSoundClass::ALL
            .iter()
            .map(|&class| {
                let tp = matrix.counts[class.index()][class.index()];
                let precision = ratio(tp, matrix.predicted(class));
                let recall = ratio(tp, matrix.support(class));
                let f1 = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };
                ClassMetrics {
                    class,
                    precision,
                    recall,
                    f1,
                    support: matrix.support(class),
                }
            })
            .collect();

        let total = matrix.total();
        let n = classes.len() as f64;
        let macro_avg = AverageMetrics {
            precision: classes.iter().map(|c| c.precision).sum::<f64>() / n,
            recall: classes.iter().map(|c| c.recall).sum::<f64>() / n,
            f1: classes.iter().map(|c| c.f1).sum::<f64>() / n,
            support: total,
        };

        let weighted = |metric: fn(&ClassMetrics) -> f64| -> f64 {
            if total == 0 {
                return 0.0;
            }
            classes
                .iter()
                .map(|c| metric(c) * c.support as f64)
                .sum::<f64>()
                / total as f64
        };
        let weighted_avg = AverageMetrics {
            precision: weighted(|c| c.precision),
            recall: weighted(|c| c.recall),
            f1: weighted(|c| c.f1),
            support: total,
        };

        Self {
            accuracy: matrix.accuracy(),
            classes,
            macro_avg,
            weighted_avg,
            confusion_matrix: matrix,
        }
    }

    pub fn from_labels(truth: &[LungSoundClass], predicted: &[LungSoundClass]) -> Self {
        Self::from_confusion(ConfusionMatrix::from_labels(truth, predicted))
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>14} {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        for c in &self.classes {
            writeln!(
                f,
                "{:>14} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                c.class.as_str(),
                c.precision,
                c.recall,
                c.f1,
                c.support
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>14} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy",
            "",
            "",
            self.accuracy,
            self.macro_avg.support
        )?;
        for (name, avg) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            writeln!(
                f,
                "{:>14} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                name, avg.precision, avg.recall, avg.f1, avg.support
            )?;
        }
        writeln!(f)?;
        writeln!(f, "Confusion matrix (rows: true, columns: predicted)")?;
        for (class, row) in LungSoundClass::ALL.iter().zip(&self.confusion_matrix.counts) {
            writeln!(f, "{:>14} {:>6} {:>6}", class.as_str(), row[0], row[1])?;
        }
        Ok(())
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use LungSoundClass::{Normal, Wheezing};

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_confusion_matrix_counts() {
        let truth = [Normal, Normal, Normal, Wheezing, Wheezing];
        let predicted = [Normal, Normal, Wheezing, Wheezing, Normal];

        let matrix = ConfusionMatrix::from_labels(&truth, &predicted);

        assert_eq!(matrix.counts, [[2, 1], [1, 1]]);
        assert_eq!(matrix.total(), 5);
        assert_eq!(matrix.correct(), 3);
        assert!(approx(matrix.accuracy(), 0.6));
        assert_eq!(matrix.support(Normal), 3);
    }

    #[test]
    fn test_report_values() {
        let truth = [Normal, Normal, Normal, Wheezing, Wheezing];
        let predicted = [Normal, Normal, Wheezing, Wheezing, Normal];

        let report = ClassificationReport::from_labels(&truth, &predicted);

        let normal = &report.classes[0];
        assert!(approx(normal.precision, 2.0 / 3.0));
        assert!(approx(normal.recall, 2.0 / 3.0));
        assert!(approx(normal.f1, 2.0 / 3.0));
        assert_eq!(normal.support, 3);

        let wheezing = &report.classes[1];
        assert!(approx(wheezing.precision, 0.5));
        assert!(approx(wheezing.recall, 0.5));

        assert!(approx(report.macro_avg.f1, (2.0 / 3.0 + 0.5) / 2.0));
        assert!(approx(report.weighted_avg.recall, (2.0 / 3.0 * 3.0 + 0.5 * 2.0) / 5.0));
        assert_eq!(report.weighted_avg.support, 5);
    }

    #[test]
    fn test_undefined_precision_is_zero() {
        // Nothing is ever predicted as wheezing
        let report = ClassificationReport::from_labels(&[Normal, Wheezing], &[Normal, Normal]);

        assert!(approx(report.classes[1].precision, 0.0));
        assert!(approx(report.classes[1].f1, 0.0));
        assert!(approx(report.accuracy, 0.5));
    }

    #[test]
    fn test_report_renders_every_class() {
        let report = ClassificationReport::from_labels(&[Normal, Wheezing], &[Normal, Wheezing]);
        let text = report.to_string();

        assert!(text.contains("normal"));
        assert!(text.contains("wheezing"));
        assert!(text.contains("weighted avg"));
    }
}
