//! Threshold query rendering.
//!
//! Every input is substituted into the template as literal text. Table and
//! column names cannot be bound as parameters, so the identifiers, the
//! threshold and the start date all come from the caller unescaped: callers
//! must never pass untrusted input here.

use crate::config::MonitoringRequest;
use crate::db::format_float;

/// Selects rows above the threshold, largest overshoot first.
pub const THRESHOLD_QUERY: &str = "
    select
        {id_column} as id,
        {target_column} as value,
        ({target_column} - {threshold}) as difference
    from {database}.{schema}.{table_name}
    where 1 = 1
        and {target_column} > {threshold}
        and {date_column} > '{start_date}'
    order by difference desc
";

/// Renders the threshold query for `request`.
pub fn build_query(request: &MonitoringRequest) -> String {
    let threshold = format_float(request.threshold);
    THRESHOLD_QUERY
        .replace("{id_column}", &request.id_column)
        .replace("{target_column}", &request.target_column)
        .replace("{threshold}", &threshold)
        .replace("{database}", &request.database)
        .replace("{schema}", &request.schema)
        .replace("{table_name}", &request.table_name)
        .replace("{date_column}", &request.date_column)
        .replace("{start_date}", &request.start_date)
}
