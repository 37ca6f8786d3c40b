/// Tolerances shared by evaluation and validation.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Tolerance {
    /// Tolerance below which a cross product or weight is treated as zero
    pub angular: f64,
    /// Relative slack accepted at the ends of a parameter domain
    pub parametric: f64,
}

impl Tolerance {
    pub const DEFAULT_ANGULAR: f64 = 1e-12;
    pub const DEFAULT_PARAMETRIC: f64 = 1e-10;

    pub fn default_precision() -> Self {
        Self {
            angular: Self::DEFAULT_ANGULAR,
            parametric: Self::DEFAULT_PARAMETRIC,
        }
    }

    /// Check if a value is zero within angular tolerance
    pub fn is_degenerate(self, v: f64) -> bool {
        v.abs() < self.angular
    }

    /// Clamp `t` into `[min, max]` if it lies within the parametric slack,
    /// otherwise return `None`.
    pub fn snap_parameter(self, t: f64, min: f64, max: f64) -> Option<f64> {
        if !t.is_finite() {
            return None;
        }
        let slack = self.parametric * (max - min).abs().max(1.0);
        if t < min - slack || t > max + slack {
            None
        } else {
            Some(t.clamp(min, max))
        }
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::default_precision()
    }
}
