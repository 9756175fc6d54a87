//! Shared rounding and percentage helpers.

/// Round to one decimal place, the precision every percentage is reported at.
pub(crate) fn round1(value: f64) -> f64 { (value * 10.0).round() / 10.0 }

/// `part / whole × 100`, rounded to one decimal. `when_empty` is returned
/// unchanged when `whole` is zero; each caller documents its own choice.
pub(crate) fn percentage(part: usize, whole: usize, when_empty: f64) -> f64 {
  if whole == 0 {
    return when_empty;
  }
  round1(part as f64 * 100.0 / whole as f64)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn two_thirds_rounds_up() {
    assert_eq!(percentage(2, 3, 0.0), 66.7);
  }

  #[test]
  fn empty_whole_returns_caller_default() {
    assert_eq!(percentage(0, 0, 100.0), 100.0);
    assert_eq!(percentage(0, 0, 0.0), 0.0);
  }

  #[test]
  fn round1_keeps_sign() {
    assert_eq!(round1(-33.333), -33.3);
  }
}
