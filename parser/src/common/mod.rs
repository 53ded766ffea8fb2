use std::fmt;
use std::fmt::{Display, Formatter};

pub use operator::*;

mod operator;

pub fn write_number(f: &mut Formatter<'_>, value: f64) -> fmt::Result {
    if value.is_finite() {
        write!(f, "{}", value)
    } else if value.is_nan() {
        write!(f, "NaN")
    } else if value.is_sign_positive() {
        write!(f, "+Inf")
    } else {
        write!(f, "-Inf")
    }
}

pub(crate) fn write_comma_separated<T: Display>(
    values: impl Iterator<Item = T>,
    f: &mut Formatter,
    use_parens: bool,
) -> Result<(), fmt::Error> {
    if use_parens {
        write!(f, "(")?;
    }
    for (i, arg) in values.enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", arg)?;
    }
    if use_parens {
        write!(f, ")")?;
    }
    Ok(())
}

pub fn join_vector<T: Display>(v: &[T], sep: &str, sort: bool) -> String {
    let mut vs = v.iter().map(|x| x.to_string()).collect::<Vec<String>>();
    if sort {
        vs.sort();
    }
    vs.join(sep)
}

/// Compares floats treating NaN as equal to NaN. Used by the literal nodes so that
/// two parses of `NaN` produce equal trees.
pub(crate) fn are_floats_equal(a: f64, b: f64) -> bool {
    if a.is_nan() {
        return b.is_nan();
    }
    a == b
}
