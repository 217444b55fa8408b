use tabled::Tabled;

#[derive(Tabled)]
pub struct ThresholdRow {
    pub metric: String,
    pub expression: String,
    #[tabled(display = "actual")]
    pub actual: Option<f64>,
    #[tabled(display = "outcome")]
    pub passed: bool,
}

fn actual(n: &Option<f64>) -> String {
    match n {
        Some(n) => format!("{:.4}", n),
        None => "no data".to_string(),
    }
}

fn outcome(passed: &bool) -> String {
    if *passed { "pass" } else { "FAIL" }.to_string()
}
