use crate::{
    analysis::{BestSet, SessionComparison, SessionSummary},
    settings::WeightUnit,
};
use maud::{DOCTYPE, Markup, html};
use std::path::Path;

trait FormatWeight {
    fn fmt_weight(self) -> String;
}

impl FormatWeight for f64 {
    /// Whole numbers print without decimals, everything else with one.
    fn fmt_weight(self) -> String {
        if self.fract() == 0.0 {
            format!("{:.0}", self)
        } else {
            format!("{:.1}", self)
        }
    }
}

pub fn format_duration(minutes: Option<i64>) -> String {
    minutes
        .map(|m| format!("{m} min"))
        .unwrap_or_else(|| "--".into())
}

/// `Exercise A — 10 × 55`
pub fn best_set_line(best: &BestSet) -> String {
    format!(
        "{} — {} × {}",
        best.exercise_name,
        best.reps,
        best.weight.fmt_weight()
    )
}

/// Plain text lines shown on the summary screen.
pub fn summary_lines(summary: &SessionSummary, unit: WeightUnit) -> Vec<String> {
    let mut lines = vec![
        format!("Total session time: {}", format_duration(summary.duration_minutes)),
        format!("Estimated work time: {} sec", summary.estimated_work_seconds),
        format!(
            "Total weight lifted: {} {}",
            summary.total_weight_lifted.fmt_weight(),
            unit.label()
        ),
        format!("Total sets: {}", summary.total_sets),
    ];
    if let Some(best) = &summary.best_set {
        lines.push(format!("Best Set: {}", best_set_line(best)));
    }
    for ex in &summary.breakdown {
        lines.push(format!(
            "{} — {} sets — {} total volume",
            ex.name,
            ex.sets,
            ex.volume.fmt_weight()
        ));
    }
    for (name, note) in &summary.notes {
        lines.push(format!("{name}: {note}"));
    }
    if let Some(mood) = summary.mood {
        lines.push(format!("Mood: {}", mood.label()));
    }
    if summary.has_changes {
        lines.push("Changed from template: review changes".into());
    }
    lines
}

pub fn comparison_line(cmp: &SessionComparison, unit: WeightUnit) -> String {
    let sign = if cmp.weight_delta >= 0.0 { "+" } else { "-" };
    format!(
        "vs last time: {}{} {}, {:+} sets",
        sign,
        cmp.weight_delta.abs().fmt_weight(),
        unit.label(),
        cmp.sets_delta
    )
}

pub fn export_html_summary<P: AsRef<Path>>(
    path: P,
    title: &str,
    summary: &SessionSummary,
    comparison: Option<&SessionComparison>,
    unit: WeightUnit,
) -> std::io::Result<()> {
    let markup = build_html(title, summary, comparison, unit);
    std::fs::write(path, markup.into_string())
}

fn build_html(
    title: &str,
    summary: &SessionSummary,
    comparison: Option<&SessionComparison>,
    unit: WeightUnit,
) -> Markup {
    html! {
        (DOCTYPE)
        html {
            head { meta charset="utf-8"; title { (title) } }
            body {
                h1 { "Summary" }
                table border="1" {
                    tr { th { "Total Session Time" } td { (format_duration(summary.duration_minutes)) } }
                    tr { th { "Estimated Work Time" } td { (summary.estimated_work_seconds) " sec" } }
                    tr { th { "Total Weight Lifted" } td { (summary.total_weight_lifted.fmt_weight()) " " (unit.label()) } }
                    tr { th { "Total Sets" } td { (summary.total_sets) } }
                    tr {
                        th { "Best Set" }
                        td { (summary.best_set.as_ref().map(best_set_line).unwrap_or_else(|| "-".into())) }
                    }
                }
                @if let Some(cmp) = comparison {
                    p { (comparison_line(cmp, unit)) }
                }
                h1 { "Exercises" }
                table border="1" {
                    tr { th { "Exercise" } th { "Sets" } th { "Volume" } }
                    @for ex in &summary.breakdown {
                        tr {
                            td { (ex.name) }
                            td { (ex.sets) }
                            td { (ex.volume.fmt_weight()) }
                        }
                    }
                }
                @if !summary.notes.is_empty() {
                    h1 { "Notes" }
                    ul {
                        @for (name, note) in &summary.notes {
                            li { (name) ": " (note) }
                        }
                    }
                }
            }
        }
    }
}
