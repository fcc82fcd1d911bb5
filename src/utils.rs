use crate::constants::LAMPORTS_PER_SOL;

pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL
}

/// Short form of an address for labels: first four and last four characters.
pub fn shorten_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 8 {
        return address.to_string();
    }

    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Wall-clock time in unix milliseconds.
pub fn now_millis() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

/// Block time in seconds to unix milliseconds, falling back to `now_millis`
/// when the ledger did not report one. The fallback is not ledger-accurate.
pub fn block_time_to_millis(block_time_seconds: Option<i64>) -> u64 {
    match block_time_seconds {
        Some(seconds) if seconds >= 0 => (seconds as u64).saturating_mul(1_000),
        _ => now_millis(),
    }
}
