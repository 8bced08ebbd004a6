//! Unit-algebra registry for sanity-checking declared units.
//!
//! Units are advisory metadata, not hard type constraints: the engine keeps
//! an unparseable unit string verbatim and logs a warning instead of
//! rejecting the configuration. The registry exists so that typos like
//! `"m/ss"` or `"degreees"` surface during configuration review rather than
//! in a published dataset.
//!
//! The registry is an explicitly-constructed, immutable service. Build one
//! [`UnitRegistry::standard`] instance per process and share it by reference;
//! it is never reinitialized per validation call.

use std::collections::HashSet;

/// SI prefixes accepted in front of any registered symbol, longest first so
/// that `da` is tried before `d`.
const PREFIXES: &[&str] = &[
    "da", "Y", "Z", "E", "P", "T", "G", "M", "k", "h", "d", "c", "m", "u", "µ", "n", "p", "f",
    "a", "z", "y",
];

/// A unit expression could not be interpreted against the registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnitError {
    /// The expression was empty or contained only operators.
    #[error("empty unit expression")]
    Empty,

    /// A symbol that is not in the registry, even after prefix stripping.
    #[error("unknown unit symbol '{0}'")]
    UnknownSymbol(String),

    /// The expression does not follow unit-algebra grammar.
    #[error("malformed unit expression '{expr}': {reason}")]
    Malformed {
        /// The full expression.
        expr: String,
        /// Which grammar rule it broke.
        reason: String,
    },
}

/// Immutable registry of recognized unit symbols and their algebra.
///
/// Accepts expressions combining registered symbols with `*`, `/`, and
/// whitespace as multiplication, and integer exponents written as `m^2`,
/// `s^-1`, or `s-2`. The literal `"1"` denotes a unitless quantity.
#[derive(Debug, Clone)]
pub struct UnitRegistry {
    symbols: HashSet<&'static str>,
}

impl UnitRegistry {
    /// Builds the standard registry: SI base and derived units plus the
    /// non-SI symbols common in instrument metadata.
    pub fn standard() -> Self {
        let symbols: HashSet<&'static str> = [
            // SI base
            "m", "meter", "meters", "metre", "metres", "s", "sec", "secs", "second", "seconds",
            "g", "gram", "grams", "A", "K", "mol", "cd",
            // SI derived
            "Hz", "N", "Pa", "J", "W", "C", "V", "F", "ohm", "S", "Wb", "T", "H", "lm", "lx",
            "Bq", "Gy", "Sv",
            // angle
            "rad", "radian", "radians", "sr", "deg", "degree", "degrees", "arcdeg", "arcmin",
            "arcsec",
            // temperature
            "degC", "degF", "degK", "celsius", "fahrenheit", "kelvin",
            // time beyond seconds
            "min", "minute", "minutes", "h", "hr", "hour", "hours", "day", "days", "week",
            "weeks", "yr", "year", "years",
            // dimensionless
            "percent", "count", "counts", "unitless", "ppm", "ppb", "dB",
            // length/volume/pressure/speed common in field data
            "L", "liter", "liters", "litre", "litres", "bar", "mbar", "atm", "psi", "inHg",
            "mmHg", "ft", "feet", "foot", "inch", "inches", "mi", "mile", "miles", "nmi",
            "knot", "knots", "mph", "rpm", "gauss",
        ]
        .into_iter()
        .collect();
        Self { symbols }
    }

    /// Checks a unit-algebra expression against the registry.
    ///
    /// Returns `Ok(())` for a well-formed expression built from registered
    /// symbols (with optional SI prefixes and integer exponents) and numeric
    /// factors. The caller decides how to surface the error; the attribute
    /// model downgrades it to a warning.
    pub fn parse(&self, expr: &str) -> Result<(), UnitError> {
        let trimmed = expr.trim();
        if trimmed.is_empty() {
            return Err(UnitError::Empty);
        }

        let mut saw_symbol = false;
        for token in trimmed
            .split(|c: char| c.is_whitespace() || c == '*' || c == '/' || c == '·')
        {
            if token.is_empty() {
                // Adjacent operators like `m//s` leave an empty token.
                continue;
            }
            if token.parse::<f64>().is_ok() {
                saw_symbol = true;
                continue;
            }
            self.check_token(trimmed, token)?;
            saw_symbol = true;
        }

        if saw_symbol {
            Ok(())
        } else {
            Err(UnitError::Empty)
        }
    }

    /// Returns true if `symbol` is registered, directly or via SI prefix.
    pub fn contains(&self, symbol: &str) -> bool {
        if self.symbols.contains(symbol) {
            return true;
        }
        PREFIXES.iter().any(|prefix| {
            symbol
                .strip_prefix(prefix)
                .is_some_and(|rest| !rest.is_empty() && self.symbols.contains(rest))
        })
    }

    fn check_token(&self, expr: &str, token: &str) -> Result<(), UnitError> {
        let base = match token.split_once('^') {
            Some((base, exponent)) => {
                if exponent.parse::<i32>().is_err() {
                    return Err(UnitError::Malformed {
                        expr: expr.to_string(),
                        reason: format!("'{exponent}' is not an integer exponent"),
                    });
                }
                base
            }
            None => {
                // Allow a trailing signed integer exponent: `m2`, `s-1`.
                let stripped = token.trim_end_matches(|c: char| c.is_ascii_digit());
                let stripped = stripped.strip_suffix(&['-', '+'][..]).unwrap_or(stripped);
                if stripped.is_empty() {
                    token
                } else {
                    stripped
                }
            }
        };
        if base.is_empty() {
            return Err(UnitError::Malformed {
                expr: expr.to_string(),
                reason: "exponent with no unit symbol".to_string(),
            });
        }
        if self.contains(base) {
            Ok(())
        } else {
            Err(UnitError::UnknownSymbol(base.to_string()))
        }
    }
}

impl Default for UnitRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_simple_and_compound_units() {
        let registry = UnitRegistry::standard();
        for expr in ["m", "m/s", "m/s^2", "kg m^-2", "W/m^2", "degC", "km", "hPa", "deg"] {
            assert!(registry.parse(expr).is_ok(), "expected '{expr}' to parse");
        }
    }

    #[test]
    fn accepts_unitless_one() {
        let registry = UnitRegistry::standard();
        assert!(registry.parse("1").is_ok());
    }

    #[test]
    fn rejects_unknown_symbols() {
        let registry = UnitRegistry::standard();
        assert_eq!(
            registry.parse("furlongs"),
            Err(UnitError::UnknownSymbol("furlongs".to_string()))
        );
        assert!(matches!(
            registry.parse("m/blorp"),
            Err(UnitError::UnknownSymbol(_))
        ));
    }

    #[test]
    fn rejects_empty_expressions() {
        let registry = UnitRegistry::standard();
        assert_eq!(registry.parse(""), Err(UnitError::Empty));
        assert_eq!(registry.parse("  "), Err(UnitError::Empty));
    }

    #[test]
    fn rejects_non_integer_exponents() {
        let registry = UnitRegistry::standard();
        assert!(matches!(
            registry.parse("m^two"),
            Err(UnitError::Malformed { .. })
        ));
    }

    #[test]
    fn prefix_stripping_requires_a_registered_base() {
        let registry = UnitRegistry::standard();
        assert!(registry.contains("mm"));
        assert!(registry.contains("GHz"));
        assert!(!registry.contains("kzz"));
    }
}
