use std::fmt;

use crate::cowin_client::{Center, Session};

/// Separator printed after every block.
pub const BLOCK_SEPARATOR: &str = "-----------------------------";

/// Matching sessions, one formatted block per session, in upstream order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    blocks: Vec<String>,
}

impl Report {
    /// An empty report
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the block for one qualifying session.
    pub fn push_session(&mut self, center: &Center, session: &Session) {
        self.blocks.push(render_block(center, session));
    }

    /// Number of sessions in the report
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// `true` when nothing matched
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Formatted blocks
    pub fn blocks(&self) -> &[String] {
        &self.blocks
    }

    /// Full report text handed to the notifier
    pub fn to_text(&self) -> String {
        self.blocks.concat()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for block in &self.blocks {
            f.write_str(block)?;
        }
        Ok(())
    }
}

fn render_block(center: &Center, session: &Session) -> String {
    let mut lines = vec![
        format!("Center\t{}", center.name),
        format!("State\t{}", center.state_name),
        format!("District\t{}", center.district_name),
        format!("Block\t{}", center.block_name),
        format!("PinCode\t{}", center.pincode),
        format!("Fee\t{}", center.fee_type),
    ];

    if !center.vaccine_fees.is_empty() {
        lines.push("Vaccine\t".to_string());
        for fee in &center.vaccine_fees {
            lines.push(format!("\tName\t{}", fee.vaccine));
            lines.push(format!("\tFees\t{}", fee.fee));
        }
    }

    lines.push("Sessions\t".to_string());
    lines.push(format!("\tDate\t{}", session.date));
    lines.push(format!(
        "\tAvailableCapacity\t{}",
        session.available_capacity
    ));
    lines.push(format!(
        "\tAvailableCapacityDose1\t{}",
        session.available_dose1
    ));
    lines.push(format!(
        "\tAvailableCapacityDose2\t{}",
        session.available_dose2
    ));
    lines.push(format!("\tMinAgeLimit\t{}", session.min_age_limit));
    lines.push(format!("\tVaccine\t{}", session.vaccine));
    lines.push("\tSlots".to_string());
    for slot in &session.slots {
        lines.push(format!("\t\t{}", slot));
    }
    lines.push(BLOCK_SEPARATOR.to_string());

    let mut block = lines.join("\n");
    block.push('\n');
    block
}
