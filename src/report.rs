//! Plain-text monitoring report.

use crate::db::Record;

/// Number of records detailed in a report.
pub const PREVIEW_LIMIT: usize = 5;

/// Formats monitoring records into the report sent to people.
///
/// `records` must already be ordered (the query sorts by difference); the
/// count line reports every record while only the first [`PREVIEW_LIMIT`]
/// are detailed.
pub fn format_monitoring_results(
    records: &[Record],
    table_name: &str,
    target_column: &str,
) -> String {
    if records.is_empty() {
        return format!("No records found exceeding threshold in {table_name}.{target_column}");
    }

    let mut output = vec![
        format!("Monitoring Results for {table_name}.{target_column}:"),
        format!("Found {} records exceeding threshold", records.len()),
        "\nTop 5 records:".to_string(),
    ];

    for (i, record) in records.iter().take(PREVIEW_LIMIT).enumerate() {
        output.push(format!("\n{}. ID: {}", i + 1, record.id));
        output.push(format!("   Value: {}", record.value));
        output.push(format!("   Difference: {}", record.difference));
    }

    output.join("\n")
}
