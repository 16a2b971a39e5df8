/// Countdown rendering: minutes and zero-padded seconds, e.g. `2:05`.
pub fn format_clock(total_seconds: u32) -> String {
    format!("{}:{:02}", total_seconds / 60, total_seconds % 60)
}
