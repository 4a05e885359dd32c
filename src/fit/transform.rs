//! Maps between a bounded interval `(a, b)` and the real line.
//!
//! The elliptical fit searches over `logit`-transformed ellipticity so the
//! optimiser never sits on the `q ∈ {0, 1}` boundary.

/// `ln(x − a) − ln(b − x)`.
pub fn interval_transform(x: f64, a: f64, b: f64) -> f64 {
    (x - a).ln() - (b - x).ln()
}

/// `(b − a) / (1 + e^(−t)) + a`.
pub fn inverse_interval_transform(t: f64, a: f64, b: f64) -> f64 {
    (b - a) / (1.0 + (-t).exp()) + a
}

/// First-order error propagation into the transformed variable.
pub fn interval_transform_stderr(dx: f64, x: f64, a: f64, b: f64) -> f64 {
    (1.0 / (x - a) + 1.0 / (b - x)).abs() * dx
}

/// First-order error propagation back to the bounded variable.
pub fn inverse_interval_transform_stderr(dt: f64, t: f64, a: f64, b: f64) -> f64 {
    let e = (-t).exp();
    let deriv = (b - a) * e / (1.0 + e).powi(2);
    deriv.abs() * dt
}
