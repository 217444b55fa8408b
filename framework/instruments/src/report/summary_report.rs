mod checks_table;
mod operations_table;
mod thresholds_table;

use tabled::settings::Style;
use tabled::Table;

use crate::report::summary_report::checks_table::CheckRow;
use crate::report::summary_report::operations_table::OperationRow;
use crate::report::summary_report::thresholds_table::ThresholdRow;
use crate::report::RunReport;

/// Prints the end of run summary tables to stdout.
pub(crate) fn print_summary(report: &RunReport) {
    println!("\nIterations: {}", report.stats.iterations);

    if !report.stats.operations.is_empty() {
        println!("\nSummary of operations");
        let rows = report
            .stats
            .operations
            .iter()
            .map(|(operation_id, op)| OperationRow {
                operation_id: operation_id.clone(),
                total_operations: op.count(),
                failed: op.failed(),
                avg_time_ms: op.avg_ms(),
                min_time_ms: op.min_ms(),
                med_time_ms: op.med_ms(),
                max_time_ms: op.max_ms(),
                p90_time_ms: op.percentile_ms(90.0),
                p95_time_ms: op.percentile_ms(95.0),
            })
            .collect::<Vec<_>>();
        print_table(rows);
    }

    if !report.stats.checks.is_empty() {
        println!("\nChecks");
        let rows = report
            .stats
            .checks
            .iter()
            .map(|(check, stats)| CheckRow {
                check: check.clone(),
                passes: stats.passes,
                fails: stats.fails,
                pass_rate: stats.pass_rate(),
            })
            .collect::<Vec<_>>();
        print_table(rows);
    }

    if !report.thresholds.is_empty() {
        println!("\nThresholds");
        let rows = report
            .thresholds
            .iter()
            .map(|result| ThresholdRow {
                metric: result.metric.to_string(),
                expression: result.expression.clone(),
                actual: result.actual,
                passed: result.passed,
            })
            .collect::<Vec<_>>();
        print_table(rows);
    }
}

fn print_table<R: tabled::Tabled>(rows: Vec<R>) {
    let mut table = Table::new(rows);
    table.with(Style::modern());

    println!("{table}");
}
