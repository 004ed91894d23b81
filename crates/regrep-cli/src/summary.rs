use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{
    Attribute, Cell, CellAlignment, Color, ColumnConstraint, ContentArrangement, Table, Width,
};

use regrep_model::{Finding, OverallStatus, Severity};
use regrep_cli::pipeline::BatchResult;

pub fn print_summary(result: &BatchResult) {
    println!("Package: {}", result.package_id);
    println!("Report type: {}", result.report_type);

    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Record"),
        header_cell("Status"),
        header_cell("Errors"),
        header_cell("Warnings"),
        header_cell("Infos"),
        header_cell("Missing"),
        header_cell("Unresolved"),
    ]);
    apply_summary_table_style(&mut table);
    for index in 2..7 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    align_column(&mut table, 1, CellAlignment::Center);

    for outcome in &result.records {
        let counts = &outcome.report.counts;
        table.add_row(vec![
            Cell::new(outcome.record.as_str()).fg(Color::Blue),
            status_cell(outcome.report.overall_status),
            count_cell(counts.errors, Color::Red),
            count_cell(counts.warnings, Color::Yellow),
            count_cell(counts.infos, Color::DarkGrey),
            count_cell(counts.mandatory_missing, Color::Red),
            count_cell(counts.conditional_unresolved, Color::DarkGrey),
        ]);
    }
    let (passed, warned, failed) = result.status_totals();
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(format!("{passed} pass / {warned} warn / {failed} fail"))
            .add_attribute(Attribute::Bold),
        total_cell(result, |finding| finding.is_failure_at(Severity::Error), Color::Red),
        total_cell(result, |finding| finding.is_failure_at(Severity::Warning), Color::Yellow),
        total_cell(result, |finding| finding.is_failure_at(Severity::Info), Color::DarkGrey),
        dim_cell("-"),
        dim_cell("-"),
    ]);
    println!("{table}");
    print_finding_table(result);
}

/// Failed findings of every record, most severe first.
fn print_finding_table(result: &BatchResult) {
    let mut rows: Vec<(&str, &Finding)> = result
        .records
        .iter()
        .flat_map(|outcome| {
            outcome
                .report
                .findings
                .iter()
                .filter(|finding| !finding.passed)
                .map(move |finding| (outcome.record.as_str(), finding))
        })
        .collect();
    if rows.is_empty() {
        return;
    }
    rows.sort_by_key(|(_, finding)| finding.severity.rank());

    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Record"),
        header_cell("Severity"),
        header_cell("Subject"),
        header_cell("Code"),
        header_cell("Path"),
        header_cell("Message"),
    ]);
    apply_finding_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Center);
    for (record, finding) in rows {
        table.add_row(vec![
            Cell::new(record).fg(Color::Blue),
            severity_cell(finding.severity),
            Cell::new(&finding.subject_id),
            Cell::new(finding.code.as_str()),
            finding
                .path
                .as_deref()
                .map_or_else(|| dim_cell("-"), Cell::new),
            Cell::new(&finding.message),
        ]);
    }
    println!();
    println!("Findings:");
    println!("{table}");
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_finding_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth)
        .set_width(180);
    if table.column_count() >= 6 {
        table.set_constraints(vec![
            ColumnConstraint::UpperBoundary(Width::Fixed(12)),
            ColumnConstraint::UpperBoundary(Width::Fixed(9)),
            ColumnConstraint::UpperBoundary(Width::Fixed(14)),
            ColumnConstraint::UpperBoundary(Width::Fixed(26)),
            ColumnConstraint::UpperBoundary(Width::Percentage(25)),
            ColumnConstraint::UpperBoundary(Width::Percentage(50)),
        ]);
    }
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn status_cell(status: OverallStatus) -> Cell {
    let cell = Cell::new(status.label()).add_attribute(Attribute::Bold);
    match status {
        OverallStatus::Pass => cell.fg(Color::Green),
        OverallStatus::Warn => cell.fg(Color::Yellow),
        OverallStatus::Fail => cell.fg(Color::Red),
    }
}

fn severity_cell(severity: Severity) -> Cell {
    let cell = Cell::new(severity.label());
    match severity {
        Severity::Error => cell.fg(Color::Red),
        Severity::Warning => cell.fg(Color::Yellow),
        Severity::Info => cell.fg(Color::DarkGrey),
    }
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn total_cell(result: &BatchResult, predicate: impl Fn(&Finding) -> bool, color: Color) -> Cell {
    let total = result
        .records
        .iter()
        .flat_map(|outcome| &outcome.report.findings)
        .filter(|finding| predicate(finding))
        .count();
    count_cell(total, color).add_attribute(Attribute::Bold)
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value.to_string()).fg(Color::DarkGrey)
}
