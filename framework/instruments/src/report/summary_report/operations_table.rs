use tabled::Tabled;

#[derive(Tabled)]
pub struct OperationRow {
    pub operation_id: String,
    pub total_operations: u64,
    pub failed: u64,
    #[tabled(display = "float2")]
    pub avg_time_ms: Option<f64>,
    #[tabled(display = "float2")]
    pub min_time_ms: Option<f64>,
    #[tabled(display = "float2")]
    pub med_time_ms: Option<f64>,
    #[tabled(display = "float2")]
    pub max_time_ms: Option<f64>,
    #[tabled(display = "float2")]
    pub p90_time_ms: Option<f64>,
    #[tabled(display = "float2")]
    pub p95_time_ms: Option<f64>,
}

fn float2(n: &Option<f64>) -> String {
    match n {
        Some(n) => format!("{:.2}", n),
        None => "-".to_string(),
    }
}
