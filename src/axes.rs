//! Description of the axes of extracted data, for whatever displays
//! or exports it.

use ndarray::Array1;

#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    /// E.g. `"x"` or `"index of each process"`
    pub kind: String,
    /// Number of points along the axis
    pub shape: usize,
    /// Positions of the points
    pub centers: Array1<f64>,
    pub label: String,
    pub units: String,
    pub log: bool,
}

/// Receives the axis metadata of a diagnostic.
pub trait AxisSink {
    fn append_axis(&mut self, axis: Axis);
    fn set_title(&mut self, title: &str);
    /// The units of the extracted values.
    fn set_units(&mut self, units: &str);
}

/// Collects the axis metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Axes {
    pub axes: Vec<Axis>,
    pub title: String,
    pub units: String,
}

impl AxisSink for Axes {
    fn append_axis(&mut self, axis: Axis) {
        self.axes.push(axis);
    }

    fn set_title(&mut self, title: &str) {
        self.title = title.into();
    }

    fn set_units(&mut self, units: &str) {
        self.units = units.into();
    }
}

/// `n` values evenly spaced from `start` to `end`, both included.
pub fn linspace(start: f64, end: f64, n: usize) -> Array1<f64> {
    match n {
        0 => Array1::zeros(0),
        1 => Array1::from_elem(1, start),
        _ => {
            let step = (end - start) / (n - 1) as f64;
            let mut values = Array1::from_shape_fn(n, |i| start + i as f64 * step);
            values[n - 1] = end;
            values
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    use super::*;

    #[test]
    fn t_linspace() {
        assert_abs_diff_eq!(linspace(0., 10., 6), array![0., 2., 4., 6., 8., 10.]);
        assert_abs_diff_eq!(linspace(0.5, 3.5, 4), array![0.5, 1.5, 2.5, 3.5]);
        assert_eq!(linspace(1., 2., 1), array![1.]);
        assert_eq!(linspace(1., 2., 0).len(), 0);
    }

    #[test]
    fn t_axes_sink() {
        let mut axes = Axes::default();
        axes.set_title("t_a");
        axes.set_units("seconds");
        axes.append_axis(Axis {
            kind: "x".into(),
            shape: 2,
            centers: array![0.5, 1.5],
            label: "x".into(),
            units: "L_r".into(),
            log: false,
        });
        assert_eq!(axes.title, "t_a");
        assert_eq!(axes.units, "seconds");
        assert_eq!(axes.axes.len(), 1);
        assert_eq!(axes.axes[0].shape, 2);
    }
}
