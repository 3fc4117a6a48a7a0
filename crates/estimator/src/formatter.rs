#![allow(clippy::format_push_string)]

use crate::aggregator::CostEstimate;

pub struct EstimateFormatter;

impl EstimateFormatter {
    #[must_use]
    pub fn format(estimate: &CostEstimate) -> String {
        let mut output = String::new();

        output.push('\n');
        output.push_str("═══════════════════════════════════════════════════════════════\n");
        output.push_str("                  TRANSACTION COST ESTIMATE                    \n");
        output.push_str("═══════════════════════════════════════════════════════════════\n");
        output.push('\n');

        output.push_str("Market\n");
        output.push_str("───────────────────────────────────────────────────────────────\n");
        output.push_str(&format!(
            "Instrument:            {} {}\n",
            estimate.exchange, estimate.symbol
        ));
        output.push_str(&format!(
            "Snapshot:              {}\n",
            estimate.timestamp.format("%Y-%m-%d %H:%M:%S%.3f UTC")
        ));
        output.push_str(&format!("Mid Price:             {:.4}\n", estimate.mid_price));
        output.push_str(&format!("Spread:                {:.4}%\n", estimate.spread_pct));
        output.push('\n');

        output.push_str("Order\n");
        output.push_str("───────────────────────────────────────────────────────────────\n");
        output.push_str(&format!("Quantity:              ${:.2}\n", estimate.quantity));
        output.push_str(&format!(
            "Volatility:            {:.2}%\n",
            estimate.volatility * 100.0
        ));
        output.push_str(&format!("Fee Tier:              {}\n", estimate.fee_tier));
        output.push('\n');

        output.push_str("Costs\n");
        output.push_str("───────────────────────────────────────────────────────────────\n");
        output.push_str(&format!("Expected Slippage:     {:.4}%\n", estimate.slippage_pct));
        output.push_str(&format!("Market Impact:         {:.4}%\n", estimate.impact_pct));
        output.push_str(&format!("Fees:                  ${:.4}\n", estimate.fees));
        output.push_str(&format!("Net Cost:              ${:.4}\n", estimate.net_cost));
        output.push_str(&format!(
            "Maker / Taker:         {:.2}% / {:.2}%\n",
            estimate.maker_pct, estimate.taker_pct
        ));
        output.push('\n');

        output.push_str(&format!(
            "Latency:               {:.3} ms\n",
            estimate.processing_time_ms
        ));
        output.push_str("═══════════════════════════════════════════════════════════════\n");

        if estimate.maker_pct == 50.0 && estimate.slippage_pct == 0.0 && estimate.impact_pct == 0.0 {
            output.push_str("\n⚠️  Book could not be modelled; showing neutral defaults.\n\n");
        }

        output
    }
}
