//! Threshold rules mapping a risk probability to an ordered list of
//! recommended clinical tests.

/// Baseline panel considered for every patient, in reporting order.
const BASE_TESTS: [&str; 5] = [
    "Complete Blood Count (CBC)",
    "Basic Metabolic Panel",
    "Lipid Panel",
    "Thyroid Function Test",
    "Urinalysis",
];

/// Appended after the full baseline panel when risk exceeds 0.7.
const HIGH_RISK_ADDITIONS: [&str; 4] = [
    "Chest X-ray",
    "ECG",
    "Liver Function Test",
    "Kidney Function Test",
];

/// Appended after the full baseline panel when risk exceeds 0.5.
const ELEVATED_RISK_ADDITIONS: [&str; 2] = ["ECG", "Liver Function Test"];

/// Map a risk probability to the ordered list of recommended tests.
///
/// Comparisons are strict: exactly 0.5 gets the low-risk list and exactly
/// 0.7 gets the elevated list. Total over any finite input.
pub fn recommended_tests(prediction: f64) -> Vec<String> {
    if prediction > 0.7 {
        collect(BASE_TESTS.iter().chain(HIGH_RISK_ADDITIONS.iter()))
    } else if prediction > 0.5 {
        collect(BASE_TESTS.iter().chain(ELEVATED_RISK_ADDITIONS.iter()))
    } else {
        collect(BASE_TESTS[..3].iter())
    }
}

fn collect<'a>(tests: impl Iterator<Item = &'a &'a str>) -> Vec<String> {
    tests.map(|test| (*test).to_string()).collect()
}
