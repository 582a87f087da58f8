// Reporting for fee sweep results

use serde_json::json;

use crate::experiment::fee_sweep::{SweepMode, SweepRow};
use crate::models::ChannelId;

pub const CSV_HEADER: &str = "iteration,fee_rate,successes,failures,total_fees,average_fee,channel_fee_earned";

// Reporter for fee sweep results
pub struct SweepReporter {
    target: ChannelId,
    mode: SweepMode,
}

impl SweepReporter {
    pub fn new(target: ChannelId, mode: SweepMode) -> Self {
        SweepReporter { target, mode }
    }

    // One line per iteration, ready for pandas or a spreadsheet
    pub fn generate_csv(&self, rows: &[SweepRow]) -> String {
        let mut csv = String::from(CSV_HEADER);
        csv.push('\n');

        for row in rows {
            csv.push_str(&format!("{},{},{},{},{},{:.4},{}\n",
                                  row.iteration, row.fee_rate, row.successes, row.failures,
                                  row.total_fees, row.average_fee, row.channel_fee_earned));
        }

        csv
    }

    // Generate a text report of the sweep
    pub fn generate_text_report(&self, rows: &[SweepRow]) -> String {
        let mut report = String::from("## Channel Fee Variation Report\n\n");
        report.push_str(&format!("Target channel: {}\n", self.target));
        report.push_str(&format!("Balance mode: {:?}\n", self.mode));
        report.push_str(&format!("Iterations: {}\n\n", rows.len()));

        if let Some(best) = rows.iter().max_by(|a, b| {
            a.channel_fee_earned.cmp(&b.channel_fee_earned)
                .then_with(|| b.fee_rate.total_cmp(&a.fee_rate))
        }) {
            report.push_str(&format!("Highest channel revenue: {} sat at fee rate {} (iteration {})\n\n",
                                     best.channel_fee_earned, best.fee_rate, best.iteration));
        }

        report.push_str("| Iteration | Fee Rate | Successes | Failures | Total Fees | Channel Fee Earned |\n");
        report.push_str("|---|---|---|---|---|---|\n");
        for row in rows {
            report.push_str(&format!("| {} | {} | {} | {} | {} | {} |\n",
                                     row.iteration, row.fee_rate, row.successes, row.failures,
                                     row.total_fees, row.channel_fee_earned));
        }

        report
    }

    // Generate a JSON report
    pub fn generate_json_report(&self, rows: &[SweepRow]) -> String {
        let total_successes: usize = rows.iter().map(|r| r.successes).sum();
        let total_failures: usize = rows.iter().map(|r| r.failures).sum();

        let report = json!({
            "target_channel": self.target,
            "mode": self.mode,
            "iterations": rows.len(),
            "total_successes": total_successes,
            "total_failures": total_failures,
            "rows": rows,
        });

        serde_json::to_string_pretty(&report)
            .unwrap_or_else(|_| "Error generating JSON report".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<SweepRow> {
        vec![
            SweepRow { iteration: 1, fee_rate: 0.0, successes: 3, failures: 1, total_fees: 40,
                       average_fee: 13.333333, channel_fee_earned: 0 },
            SweepRow { iteration: 2, fee_rate: 0.25, successes: 2, failures: 2, total_fees: 900,
                       average_fee: 450.0, channel_fee_earned: 850 },
        ]
    }

    #[test]
    fn test_csv_output() {
        let reporter = SweepReporter::new(ChannelId(3), SweepMode::Fresh);
        let csv = reporter.generate_csv(&rows());
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], CSV_HEADER);
        assert_eq!(lines[1], "1,0,3,1,40,13.3333,0");
        assert_eq!(lines[2], "2,0.25,2,2,900,450.0000,850");
    }

    #[test]
    fn test_text_report_names_best_rate() {
        let reporter = SweepReporter::new(ChannelId(3), SweepMode::Cumulative);
        let report = reporter.generate_text_report(&rows());

        assert!(report.contains("Target channel: chan3"));
        assert!(report.contains("Balance mode: Cumulative"));
        assert!(report.contains("Highest channel revenue: 850 sat at fee rate 0.25 (iteration 2)"));
    }

    #[test]
    fn test_json_report() {
        let reporter = SweepReporter::new(ChannelId(3), SweepMode::Fresh);
        let json: serde_json::Value = serde_json::from_str(&reporter.generate_json_report(&rows())).unwrap();

        assert_eq!(json["target_channel"], 3);
        assert_eq!(json["mode"], "fresh");
        assert_eq!(json["total_successes"], 5);
        assert_eq!(json["rows"][1]["channel_fee_earned"], 850);
    }
}
