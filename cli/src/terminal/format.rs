use cfst_common::network::candidate::{FinalResult, PopLabel};
use colored::*;

use crate::terminal::colors;

/// Plain-text columns of one result, in table and CSV order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cells {
    pub address: String,
    pub pop: String,
    pub latency: String,
    pub speed: String,
    pub score: String,
}

pub fn cells(result: &FinalResult) -> Cells {
    Cells {
        address: result.candidate.address.to_string(),
        pop: result.pop.to_string(),
        latency: format!("{:.1}", result.tcp_latency_ms),
        speed: format!("{:.2}", result.download_speed),
        score: result.score.to_string(),
    }
}

pub fn table_head() -> String {
    format!(
        "{:>4}  {:<15}  {:<5}  {:>9}  {:>9}  {:>11}",
        "#", "IP", "Colo", "Latency", "MB/s", "Score"
    )
    .color(colors::SEPARATOR)
    .to_string()
}

/// One colored table row. `fast` is the speed that counts as fast.
pub fn table_row(rank: usize, result: &FinalResult, fast: f64) -> String {
    let cells = cells(result);
    let rank: ColoredString = format!("{:>4}", format!("[{rank}]")).color(colors::ACCENT);
    let address: ColoredString = format!("{:<15}", cells.address).color(colors::ADDRESS);
    let pop: ColoredString = pop_color(&result.pop, format!("{:<5}", cells.pop));
    let latency: ColoredString = format!("{:>9}", format!("{}ms", cells.latency)).color(colors::TEXT_DEFAULT);
    let speed: ColoredString = speed_color(result, fast, format!("{:>9}", cells.speed));
    let score: ColoredString = if result.is_rate_limited() {
        format!("{:>11}", cells.score).color(colors::DEAD)
    } else {
        format!("{:>11}", cells.score).bold()
    };

    format!("{rank}  {address}  {pop}  {latency}  {speed}  {score}")
}

fn pop_color(pop: &PopLabel, text: String) -> ColoredString {
    match pop {
        PopLabel::Known(_) => text.color(colors::POP).bold(),
        PopLabel::Unknown => text.dimmed(),
        PopLabel::ProbeError => text.color(colors::DEAD),
    }
}

fn speed_color(result: &FinalResult, fast: f64, text: String) -> ColoredString {
    if result.is_rate_limited() || result.download_speed <= 0.0 {
        text.color(colors::DEAD)
    } else if result.download_speed >= fast {
        text.color(colors::FAST).bold()
    } else {
        text.color(colors::SLOW)
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
