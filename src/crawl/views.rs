//! Humanized view-counter normalization ("12.3K", "1.2M", "45,000" → integers).

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ViewCountError {
    #[error("empty view counter")]
    Empty,
    #[error("non-numeric view counter: {0:?}")]
    NonNumeric(String),
}

/// Parse a humanized view counter into an exact integer.
///
/// Thousands separators are ignored. A trailing `K` scales by 1 000 and `M`
/// by 1 000 000, with fractional digits scaled in integer arithmetic so
/// `"1.2K"` → 1200 and `"12K"` → 12 000 (whole-number mantissas get the full
/// multiplier). Fractional digits beyond the multiplier's precision are
/// truncated toward zero.
pub fn normalize_view_count(raw: &str) -> Result<u64, ViewCountError> {
    let text: String = raw.trim().chars().filter(|c| *c != ',').collect();
    if text.is_empty() {
        return Err(ViewCountError::Empty);
    }

    let (mantissa, multiplier) = match text.strip_suffix('K') {
        Some(rest) => (rest, 1_000u64),
        None => match text.strip_suffix('M') {
            Some(rest) => (rest, 1_000_000u64),
            None => (text.as_str(), 1u64),
        },
    };

    let (whole, frac) = match mantissa.split_once('.') {
        Some((w, f)) => (w, f),
        None => (mantissa, ""),
    };

    if multiplier == 1 && !frac.is_empty() {
        // A bare counter never carries a decimal point.
        return Err(ViewCountError::NonNumeric(raw.to_string()));
    }
    if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ViewCountError::NonNumeric(raw.to_string()));
    }
    if !frac.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ViewCountError::NonNumeric(raw.to_string()));
    }

    let whole: u64 = whole
        .parse()
        .map_err(|_| ViewCountError::NonNumeric(raw.to_string()))?;
    let mut value = whole.saturating_mul(multiplier);

    if !frac.is_empty() {
        let frac_digits: u64 = frac
            .parse()
            .map_err(|_| ViewCountError::NonNumeric(raw.to_string()))?;
        let scale = 10u64.saturating_pow(frac.len() as u32);
        value = value.saturating_add(frac_digits.saturating_mul(multiplier) / scale);
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fractional_suffixes_scale_exactly() {
        assert_eq!(normalize_view_count("1.2K"), Ok(1_200));
        assert_eq!(normalize_view_count("3.4M"), Ok(3_400_000));
        assert_eq!(normalize_view_count("12.34K"), Ok(12_340));
    }

    #[test]
    fn bare_integers_pass_through() {
        assert_eq!(normalize_view_count("523"), Ok(523));
        assert_eq!(normalize_view_count("0"), Ok(0));
    }

    #[test]
    fn thousands_separators_are_ignored() {
        assert_eq!(normalize_view_count("12,000"), Ok(12_000));
        assert_eq!(normalize_view_count("45,000"), Ok(45_000));
        assert_eq!(normalize_view_count("1,234,567"), Ok(1_234_567));
    }

    /// "12K" on the page means twelve thousand. Whole-number mantissas get
    /// the full multiplier; naive strip-the-decimal-point string surgery
    /// would land 10x low here.
    #[test]
    fn whole_number_suffix_scales_by_full_multiplier() {
        assert_eq!(normalize_view_count("12K"), Ok(12_000));
        assert_eq!(normalize_view_count("2M"), Ok(2_000_000));
    }

    #[test]
    fn non_numeric_residue_is_an_error_not_a_panic() {
        assert!(matches!(
            normalize_view_count("views"),
            Err(ViewCountError::NonNumeric(_))
        ));
        assert!(matches!(
            normalize_view_count("1.2B"),
            Err(ViewCountError::NonNumeric(_))
        ));
        assert!(matches!(
            normalize_view_count("1.2.3K"),
            Err(ViewCountError::NonNumeric(_))
        ));
        assert!(matches!(
            normalize_view_count(".5K"),
            Err(ViewCountError::NonNumeric(_))
        ));
        assert_eq!(normalize_view_count(""), Err(ViewCountError::Empty));
        assert_eq!(normalize_view_count("  "), Err(ViewCountError::Empty));
    }

    #[test]
    fn bare_counter_with_decimal_point_is_rejected() {
        assert!(matches!(
            normalize_view_count("1.5"),
            Err(ViewCountError::NonNumeric(_))
        ));
    }
}
