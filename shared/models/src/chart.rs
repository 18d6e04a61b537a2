use serde::{Deserialize, Serialize};

/// Chart-ready series pulled out of a markdown table.
///
/// `headers[i]` names the series whose values sit at `rows[_].values[i]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChartData {
    pub headers: Vec<String>,
    pub rows: Vec<ChartRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChartRow {
    pub label: String,
    pub values: Vec<f64>,
}

impl ChartData {
    pub fn series_count(&self) -> usize {
        self.headers.len()
    }

    /// Largest value across all series, used to scale a chart axis
    pub fn max_value(&self) -> f64 {
        self.rows
            .iter()
            .flat_map(|row| row.values.iter().copied())
            .fold(0.0_f64, f64::max)
    }

    /// Smallest value across all series, never above zero
    pub fn min_value(&self) -> f64 {
        self.rows
            .iter()
            .flat_map(|row| row.values.iter().copied())
            .fold(0.0_f64, f64::min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_bounds() {
        let chart = ChartData {
            headers: vec!["Size".to_string(), "Share".to_string()],
            rows: vec![
                ChartRow { label: "a".to_string(), values: vec![12.0, 3.5] },
                ChartRow { label: "b".to_string(), values: vec![-4.0, 40.0] },
            ],
        };
        assert_eq!(chart.series_count(), 2);
        assert_eq!(chart.max_value(), 40.0);
        assert_eq!(chart.min_value(), -4.0);
    }
}
