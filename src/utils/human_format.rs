//! Human-readable formatting for memory sizes in logs and CLI output

/// Format a size given in KiB with a binary unit suffix
pub fn format_kib(kib: u64) -> String {
    const UNITS: &[&str] = &["KiB", "MiB", "GiB", "TiB"];

    let mut size = kib as f64;
    let mut unit_index = 0;
    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{kib}{}", UNITS[0])
    } else if size >= 10.0 {
        format!("{size:.1}{}", UNITS[unit_index])
    } else {
        format!("{size:.2}{}", UNITS[unit_index])
    }
}

/// Format a byte count, rounding up to whole KiB first
pub fn format_bytes(bytes: usize) -> String {
    format_kib((bytes as u64).div_ceil(1024))
}
