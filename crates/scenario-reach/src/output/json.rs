//! JSON serialization for reports, fits, and certificates.

use serde::Serialize;

/// Serialize a report or certificate to a compact JSON string.
///
/// # Errors
///
/// Returns an error if serialization fails (e.g. a non-finite float in a
/// map key position, which none of this crate's types produce).
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(value)
}

/// Serialize a report or certificate to a pretty-printed JSON string.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn to_json_pretty<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coverage::CoverageReport;
    use nalgebra::DVector;
    use scenario_core::SolveStatus;

    fn make_report() -> CoverageReport {
        CoverageReport {
            misses: 8,
            num_samples: 1500,
            epsilon: 0.02625908542639354,
            risk_level: 1e-9,
            confidence: 1.0 - 1e-9,
            tail_status: SolveStatus::Optimal,
            outside_points: vec![DVector::from_vec(vec![1.5, -0.25])],
            conservative: true,
        }
    }

    #[test]
    fn test_report_json_fields() {
        let json = to_json(&make_report()).unwrap();
        assert!(json.contains("\"misses\":8"));
        assert!(json.contains("\"num_samples\":1500"));
        assert!(json.contains("\"tail_status\":\"Optimal\""));
        assert!(json.contains("\"conservative\":true"));
    }

    #[test]
    fn test_missing_conservative_defaults_to_exact() {
        let json = r#"{"misses":0,"num_samples":10,"epsilon":0.5,"risk_level":1e-9,
            "confidence":0.999999999,"tail_status":"Optimal","outside_points":[]}"#;
        let parsed: CoverageReport = serde_json::from_str(json).unwrap();
        assert!(!parsed.conservative);
    }

    #[test]
    fn test_pretty_json_parses_back() {
        let json = to_json_pretty(&make_report()).unwrap();
        assert!(json.contains('\n'));
        let parsed: CoverageReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.misses, 8);
        assert_eq!(parsed.outside_points.len(), 1);
        assert!((parsed.epsilon - 0.02625908542639354).abs() < 1e-15);
    }
}
