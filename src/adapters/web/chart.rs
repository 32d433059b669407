//! Inline SVG line chart of a day's forecast against the comparison actuals.

use crate::domain::observation::SLOTS_PER_DAY;

const WIDTH: f64 = 720.0;
const HEIGHT: f64 = 260.0;
const PADDING: f64 = 40.0;

pub struct Series<'a> {
    pub name: &'a str,
    pub color: &'a str,
    /// One entry per slot; `None` leaves a gap.
    pub values: &'a [Option<f64>],
}

pub fn render_day_chart(series: &[Series<'_>]) -> String {
    let finite = series
        .iter()
        .flat_map(|s| s.values.iter().flatten())
        .copied()
        .filter(|v| v.is_finite());
    let (min, max) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !min.is_finite() {
        return "<p class=\"muted\">No chart data.</p>".to_string();
    }

    let plot_width = WIDTH - 2.0 * PADDING;
    let plot_height = HEIGHT - 2.0 * PADDING;
    let range = max - min;
    let scale_y = if range > 0.0 { plot_height / range } else { 1.0 };
    let scale_x = plot_width / (SLOTS_PER_DAY - 1) as f64;
    let y_of = |v: f64| {
        if range > 0.0 {
            HEIGHT - PADDING - (v - min) * scale_y
        } else {
            HEIGHT / 2.0
        }
    };

    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {WIDTH:.0} {HEIGHT:.0}" class="chart" role="img">"#
    );
    svg.push_str(&format!(
        r##"<line x1="{p:.0}" y1="{p:.0}" x2="{p:.0}" y2="{b:.0}" stroke="#999"/><line x1="{p:.0}" y1="{b:.0}" x2="{r:.0}" y2="{b:.0}" stroke="#999"/>"##,
        p = PADDING,
        b = HEIGHT - PADDING,
        r = WIDTH - PADDING,
    ));
    svg.push_str(&format!(
        r#"<text x="4" y="{:.0}" font-size="11">{:.2}</text><text x="4" y="{:.0}" font-size="11">{:.2}</text>"#,
        PADDING,
        max,
        HEIGHT - PADDING,
        min
    ));
    for hour in [0usize, 6, 12, 18, 24] {
        let x = PADDING + (hour * 4).min(SLOTS_PER_DAY - 1) as f64 * scale_x;
        svg.push_str(&format!(
            r#"<text x="{x:.1}" y="{:.0}" font-size="11" text-anchor="middle">{hour:02}:00</text>"#,
            HEIGHT - PADDING / 2.0
        ));
    }

    for s in series {
        for run in runs(s.values) {
            let points: Vec<String> = run
                .iter()
                .map(|&(slot, v)| format!("{:.1},{:.1}", PADDING + slot as f64 * scale_x, y_of(v)))
                .collect();
            svg.push_str(&format!(
                r#"<polyline fill="none" stroke="{}" stroke-width="1.5" points="{}"><title>{}</title></polyline>"#,
                s.color,
                points.join(" "),
                s.name
            ));
        }
    }
    svg.push_str("</svg>");
    svg
}

/// Contiguous stretches of finite values.
fn runs(values: &[Option<f64>]) -> Vec<Vec<(usize, f64)>> {
    let mut out = Vec::new();
    let mut current = Vec::new();
    for (slot, value) in values.iter().enumerate() {
        match value.filter(|v| v.is_finite()) {
            Some(v) => current.push((slot, v)),
            None if !current.is_empty() => out.push(std::mem::take(&mut current)),
            None => {}
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}
