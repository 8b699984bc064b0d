use keystride::time_series::WpmSample;

/// X (seconds) and Y (wpm) bounds for the results chart.
///
/// The x range runs to the last sample, or to the time limit when nothing
/// was sampled, and never collapses below one second.
pub fn compute_chart_params(samples: &[WpmSample], time_limit_secs: u32) -> (f64, f64) {
    let highest_wpm = samples.iter().map(|s| s.wpm).max().unwrap_or(0);

    let overall_duration = samples
        .last()
        .map(|s| s.elapsed_secs)
        .unwrap_or(time_limit_secs)
        .max(1);

    (f64::from(overall_duration), f64::from(highest_wpm))
}

pub fn chart_points(samples: &[WpmSample]) -> Vec<(f64, f64)> {
    samples.iter().map(WpmSample::as_point).collect()
}

/// Format a simple numeric label consistently
pub fn format_label(val: f64) -> String {
    if (val - val.round()).abs() < f64::EPSILON {
        format!("{}", val.round())
    } else {
        format!("{val:.2}")
    }
}
