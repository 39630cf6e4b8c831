pub(crate) fn enabled() -> bool {
    std::env::var("IPMI_DEBUG")
        .map(|v| !v.is_empty())
        .unwrap_or(false)
}

/// Hex-dump a datagram when `IPMI_DEBUG` is set.
pub(crate) fn dump_hex(label: &str, bytes: &[u8]) {
    if !enabled() {
        return;
    }

    #[cfg(feature = "tracing")]
    tracing::trace!("{}", format_hex(label, bytes));

    #[cfg(not(feature = "tracing"))]
    eprintln!("{}", format_hex(label, bytes));
}

fn format_hex(label: &str, bytes: &[u8]) -> String {
    use core::fmt::Write;

    let mut out = String::with_capacity(label.len() + bytes.len() * 3 + 8);
    let _ = write!(out, "{label} ({}):", bytes.len());
    for b in bytes {
        let _ = write!(out, " {b:02x}");
    }
    out
}
