use std::str::FromStr;

use bigdecimal::BigDecimal;
use rust_decimal::Decimal;

use crate::error::Db2Error;

/// Factor by which ODBC-transport DECIMAL reads come back scaled up.
///
/// The driver reports these values multiplied by 10^7; they are handed to callers
/// as-is. Use [`compensate_odbc_scale`] when the raw value is not wanted.
pub const ODBC_DECIMAL_SCALE_FACTOR: i64 = 10_000_000;

/// Host decimal to the native arbitrary-precision decimal, via the invariant string form.
///
/// # Errors
///
/// Returns `Db2Error::ConversionError` if the formatted value does not re-parse.
pub fn to_native_decimal(value: Decimal) -> Result<BigDecimal, Db2Error> {
    let text = value.to_string();
    BigDecimal::from_str(&text)
        .map_err(|e| Db2Error::ConversionError(format!("decimal {text} is not a valid native decimal: {e}")))
}

/// Native decimal back to the host decimal.
///
/// # Errors
///
/// Returns `Db2Error::ConversionError` if the value exceeds the host decimal's range.
pub fn to_host_decimal(value: &BigDecimal) -> Result<Decimal, Db2Error> {
    parse_host_decimal(&value.to_string())
}

/// Parse plain (`-12.50`) or scientific (`0E-7`, `1.5E+3`) decimal text.
///
/// # Errors
///
/// Returns `Db2Error::ConversionError` when the text is not a decimal in host range.
pub fn parse_host_decimal(text: &str) -> Result<Decimal, Db2Error> {
    let text = text.trim();
    let parsed = if text.contains(['e', 'E']) {
        Decimal::from_scientific(text)
    } else {
        Decimal::from_str(text)
    };
    parsed.map_err(|e| Db2Error::ConversionError(format!("'{text}' is not a host decimal: {e}")))
}

/// Undo the ODBC DECIMAL read scaling.
#[must_use]
pub fn compensate_odbc_scale(value: Decimal) -> Decimal {
    value / Decimal::from(ODBC_DECIMAL_SCALE_FACTOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::prelude::FromPrimitive;

    fn round_trip(value: Decimal) -> Decimal {
        to_host_decimal(&to_native_decimal(value).unwrap()).unwrap()
    }

    #[test]
    fn round_trips_float_derived_values() {
        let floats: [f32; 10] = [
            -1.0, 0.0, 1.0, 3.5, -3.5, 1.0e-7, 123_456.79, -0.25, 10_000.0, 0.1,
        ];
        for f in floats {
            let value = Decimal::from_f32(f).unwrap();
            assert_eq!(round_trip(value), value, "float {f}");
        }
    }

    #[test]
    fn round_trips_range_limits() {
        assert_eq!(round_trip(Decimal::MIN), Decimal::MIN);
        assert_eq!(round_trip(Decimal::MAX), Decimal::MAX);
        assert_eq!(
            Decimal::MAX.to_string(),
            "79228162514264337593543950335"
        );
    }

    #[test]
    fn parses_scientific_zero() {
        let value = parse_host_decimal("0E-7").unwrap();
        assert!(value.is_zero());
        let native = BigDecimal::from_str("0E-7").unwrap();
        assert!(to_host_decimal(&native).unwrap().is_zero());
    }

    #[test]
    fn keeps_scale_through_native_form() {
        let value = Decimal::new(-125_000, 4);
        let native = to_native_decimal(value).unwrap();
        assert_eq!(native, BigDecimal::from_str("-12.5000").unwrap());
        assert_eq!(round_trip(value).to_string(), "-12.5000");
    }

    #[test]
    fn rejects_values_beyond_host_range() {
        let too_big = BigDecimal::from_str("792281625142643375935439503350").unwrap();
        assert!(matches!(to_host_decimal(&too_big), Err(Db2Error::ConversionError(_))));
    }

    #[test]
    fn compensates_odbc_scale() {
        let raw = Decimal::from(12_500_000_000_i64);
        assert_eq!(compensate_odbc_scale(raw), Decimal::from(1250));
    }
}
