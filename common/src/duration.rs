use std::fmt;
use std::fmt::Formatter;

// Original Code: Polars
// https://github.com/pola-rs/polars/blob/master/polars/polars-core/src/fmt.rs
// License Apache-2.0

const NAMES: [&str; 5] = ["y", "d", "h", "m", "s"];
const SIZES_MS: [i64; 5] = [86_400_000 * 365, 86_400_000, 3_600_000, 60_000, 1_000];

/// Writes a millisecond duration using the largest units first, e.g. `1h5m30s250ms`.
pub fn fmt_duration_ms(f: &mut Formatter<'_>, v: i64) -> fmt::Result {
    if v == 0 {
        return write!(f, "0ms");
    }
    if v < 0 {
        write!(f, "-")?;
    }
    let v = v.unsigned_abs() as i64;
    format_duration(f, v, SIZES_MS.as_slice(), NAMES.as_slice())?;
    if v % 1_000 != 0 {
        write!(f, "{}ms", (v % 1_000))?;
    }
    Ok(())
}

fn format_duration(f: &mut Formatter, v: i64, sizes: &[i64], names: &[&str]) -> fmt::Result {
    for (i, (size, name)) in sizes.iter().zip(names.iter()).enumerate() {
        let whole_num = if i == 0 {
            v / size
        } else {
            (v % sizes[i - 1]) / size
        };
        if whole_num != 0 {
            write!(f, "{}{}", whole_num, name)?;
        }
    }
    Ok(())
}

/// Helper for rendering a millisecond duration through `Display`.
pub struct DurationMs(pub i64);

impl fmt::Display for DurationMs {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        fmt_duration_ms(f, self.0)
    }
}
