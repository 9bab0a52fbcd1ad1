use cfst_common::network::candidate::PopLabel;

/// Speed (MiB/s) that earns the full speed score.
pub const FULL_SPEED: f64 = 40.0;
/// Latency (ms) below which the latency score exceeds 100.
pub const BASE_LATENCY: f64 = 30.0;
pub const LATENCY_PENALTY: f64 = 0.5;
pub const POP_BONUS: f64 = 5.0;

const SPEED_WEIGHT: f64 = 0.8;
const LATENCY_WEIGHT: f64 = 0.2;

pub fn speed_score(download_speed: f64) -> f64 {
    if download_speed >= FULL_SPEED {
        100.0
    } else {
        download_speed / FULL_SPEED * 100.0
    }
}

pub fn latency_score(tcp_latency_ms: f64) -> f64 {
    (100.0 - (tcp_latency_ms - BASE_LATENCY) * LATENCY_PENALTY).max(0.0)
}

/// Ranks a tested endpoint. Higher is better.
///
/// The result is not clamped: a resolved location adds a bonus on top of 100.
pub fn score(download_speed: f64, tcp_latency_ms: f64, pop: &PopLabel) -> f64 {
    let bonus = if pop.is_resolved() { POP_BONUS } else { 0.0 };
    SPEED_WEIGHT * speed_score(download_speed) + LATENCY_WEIGHT * latency_score(tcp_latency_ms) + bonus
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;

    fn lax() -> PopLabel {
        PopLabel::Known("LAX".to_string())
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn full_speed_at_base_latency_with_pop() {
        assert!(close(score(40.0, 30.0, &lax()), 105.0));
    }

    #[test]
    fn half_speed_at_fifty_ms_with_pop() {
        assert!(close(speed_score(20.0), 50.0));
        assert!(close(latency_score(50.0), 90.0));
        assert!(close(score(20.0, 50.0, &lax()), 63.0));
    }

    #[test]
    fn latency_score_bottoms_out_at_230ms() {
        assert_eq!(latency_score(230.0), 0.0);
        assert_eq!(latency_score(500.0), 0.0);
        assert!(latency_score(229.0) > 0.0);
    }

    #[test]
    fn speed_score_caps_at_full_speed() {
        assert_eq!(speed_score(400.0), 100.0);
        assert_eq!(speed_score(0.0), 0.0);
    }

    #[test]
    fn sentinel_labels_earn_no_bonus() {
        let known = score(10.0, 80.0, &lax());
        assert!(close(score(10.0, 80.0, &PopLabel::Unknown), known - POP_BONUS));
        assert!(close(score(10.0, 80.0, &PopLabel::ProbeError), known - POP_BONUS));
        assert!(close(score(10.0, 80.0, &PopLabel::Known(String::new())), known - POP_BONUS));
    }
}
