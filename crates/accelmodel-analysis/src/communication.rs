/// Time of a tree or ring all-reduce of `output_bytes` taking `steps` exchange steps over a
/// link of `bandwidth` bytes/s.
///
/// Each step moves half of the buffer on average, hence `(output_bytes / 2) · steps / bandwidth`.
pub fn collective_cost(output_bytes: f64, steps: f64, bandwidth: f64) -> f64 {
    (output_bytes / 2.0) * steps / bandwidth
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_steps_no_cost() {
        assert_eq!(collective_cost(1e9, 0.0, 1e10), 0.0);
    }

    #[test]
    fn linear_in_steps_and_bytes() {
        let base = collective_cost(1e6, 1.0, 1e9);

        assert_eq!(base, 5e-4);
        assert_eq!(collective_cost(2e6, 1.0, 1e9), 2.0 * base);
        assert!((collective_cost(1e6, 3.0, 1e9) - 3.0 * base).abs() < 1e-15);
    }
}
