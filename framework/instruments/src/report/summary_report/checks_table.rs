use tabled::Tabled;

#[derive(Tabled)]
pub struct CheckRow {
    pub check: String,
    pub passes: u64,
    pub fails: u64,
    #[tabled(display = "percent")]
    pub pass_rate: Option<f64>,
}

fn percent(rate: &Option<f64>) -> String {
    match rate {
        Some(rate) => format!("{:.2}%", rate * 100.0),
        None => "-".to_string(),
    }
}
