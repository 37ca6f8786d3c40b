/// `count` parameters uniformly spaced over `[min, max]`, both ends included.
///
/// A single parameter is placed at `min`. The last value is exactly `max`
/// so boundary evaluation is not disturbed by round-off.
pub fn uniform_parameters(min: f64, max: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![min],
        _ => {
            let step = (max - min) / (count - 1) as f64;
            (0..count)
                .map(|i| if i == count - 1 { max } else { min + step * i as f64 })
                .collect()
        }
    }
}
