use chrono::NaiveDate;
use comfy_table::{presets::NOTHING, *};
use covidtrack_core::{MetricSeries, PipelineSummary, Snapshot, Table as SourceTable};

fn styled_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            header
                .into_iter()
                .map(|title| Cell::new(title).add_attribute(Attribute::Bold))
                .collect::<Vec<_>>(),
        )
        .set_style(TableComponent::BottomBorder, '─')
        .set_style(TableComponent::MiddleHeaderIntersections, '─')
        .set_style(TableComponent::HeaderLines, '─')
        .set_style(TableComponent::BottomBorderIntersections, '─')
        .set_style(TableComponent::TopBorder, '─')
        .set_style(TableComponent::TopBorderIntersections, '─');
    table
}

fn count(value: Option<i64>) -> String {
    value.map(|value| value.to_string()).unwrap_or_default()
}

fn decimal(value: Option<f64>) -> String {
    value.map(|value| format!("{value:.4}")).unwrap_or_default()
}

fn date_cell(date: Option<NaiveDate>) -> String {
    date.map(|date| date.to_string()).unwrap_or_default()
}

pub fn display_entities(table: &SourceTable, include_aggregates: bool) {
    let mut out = styled_table(vec!["Code", "Name", "Rows", "First date", "Last date"]);
    for entity in table.entities() {
        if entity.is_aggregate() && !include_aggregates {
            continue;
        }
        let rows = table.with_records(table.rows_for(entity).cloned().collect());
        out.add_row(vec![
            entity.code.clone(),
            entity.name.clone(),
            rows.len().to_string(),
            date_cell(rows.earliest_date()),
            date_cell(rows.latest_date()),
        ]);
    }
    if let (Some(first), Some(last)) = (table.earliest_date(), table.latest_date()) {
        println!("\nSource covers {first} to {last}");
    }
    println!("\n{}", out);
}

pub fn display_series(series: &MetricSeries<'_>) {
    let metric = series.metric().canonical_name();
    let mut out = styled_table(vec!["Code", "Name", "Date", metric]);
    for (entity, points) in series.iter() {
        for point in points {
            out.add_row(vec![
                entity.code.clone(),
                entity.name.clone(),
                point.date.to_string(),
                decimal(point.value),
            ]);
        }
    }
    println!("\n{}", out);
}

pub fn display_snapshot(snapshot: &Snapshot, limit: Option<usize>) {
    let mut out = styled_table(vec![
        "Code",
        "Name",
        "Continent",
        "Total cases",
        "Total deaths",
        "Cases per million",
    ]);
    let shown = limit.unwrap_or(snapshot.rows.len());
    for row in snapshot.rows.iter().take(shown) {
        out.add_row(vec![
            row.entity_code.clone(),
            row.entity_name.clone(),
            row.continent.clone().unwrap_or_default(),
            count(row.total_cases),
            count(row.total_deaths),
            decimal(row.cases_per_million),
        ]);
    }
    println!("\nLatest date: {}", snapshot.date);
    println!("{}", out);
}

pub fn display_summary(summary: &PipelineSummary) {
    let mut out = styled_table(vec!["Field", "Value"]);
    let source = summary
        .source
        .as_ref()
        .map(|source| source.location.clone())
        .unwrap_or_default();
    let mut rows: Vec<(&str, String)> = vec![
        ("Source", source),
        ("Input rows", summary.clean.input_rows.to_string()),
        ("Clean rows", summary.clean.output_rows.to_string()),
        ("Derived rows", summary.row_count.to_string()),
        ("Entities", summary.selected_entities.join(", ")),
        ("Window", summary.window.to_string()),
        ("Revisions clamped", summary.revisions_clamped.to_string()),
        (
            "Cells forward-filled",
            summary.clean.cells_forward_filled.to_string(),
        ),
        (
            "Insufficient history",
            summary.insufficient_history.join(", "),
        ),
    ];
    if let Some(range) = &summary.date_range {
        rows.push(("Date range", format!("{} to {}", range.start, range.end)));
    }
    for (field, value) in rows {
        out.add_row(vec![field.to_string(), value]);
    }
    println!("\n{}", out);
}
