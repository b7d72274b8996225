mod pg_bigint_u32;
mod pg_numeric_u128;
mod pg_numeric_u64;
mod pg_smallint_u8;

pub use pg_bigint_u32::PgBigIntU32;
pub use pg_numeric_u128::PgNumericU128;
pub use pg_numeric_u64::PgNumericU64;
pub use pg_smallint_u8::PgSmallIntU8;

use bytes::{BufMut, BytesMut};

const NUMERIC_SIGN_POSITIVE: u16 = 0x0000;
const NUMERIC_SIGN_NEGATIVE: u16 = 0x4000;
const NUMERIC_SIGN_NAN: u16 = 0xC000;

/// Writes an unsigned integer into the Postgres `NUMERIC` binary wire format: a header of
/// `ndigits`, `weight`, `sign` and `dscale` followed by base-10000 digits, most significant first.
pub(crate) fn write_numeric(out: &mut BytesMut, value: u128) {
    if value == 0 {
        out.put_i16(0);
        out.put_i16(0);
        out.put_u16(NUMERIC_SIGN_POSITIVE);
        out.put_i16(0);
        return;
    }
    let mut digits: Vec<i16> = vec![];
    let mut rest = value;
    while rest > 0 {
        digits.push((rest % 10_000) as i16);
        rest /= 10_000;
    }
    digits.reverse();
    out.put_i16(digits.len() as i16);
    out.put_i16((digits.len() - 1) as i16);
    out.put_u16(NUMERIC_SIGN_POSITIVE);
    out.put_i16(0);
    for digit in digits.into_iter() {
        out.put_i16(digit);
    }
}

/// Reads an integral `NUMERIC` value from its binary wire format. Negative, NaN or fractional
/// values are rejected, they have no valid unsigned integer representation.
pub(crate) fn read_numeric(raw: &[u8]) -> Result<u128, String> {
    if raw.len() < 8 {
        return Err("truncated NUMERIC header".to_string());
    }
    let ndigits = i16::from_be_bytes([raw[0], raw[1]]) as usize;
    let weight = i16::from_be_bytes([raw[2], raw[3]]) as i64;
    let sign = u16::from_be_bytes([raw[4], raw[5]]);
    match sign {
        NUMERIC_SIGN_POSITIVE => {}
        NUMERIC_SIGN_NEGATIVE => {
            return Err("negative NUMERIC cannot be read as an unsigned integer".to_string())
        }
        NUMERIC_SIGN_NAN => return Err("NaN NUMERIC cannot be read as an unsigned integer".to_string()),
        _ => return Err(format!("invalid NUMERIC sign: {sign:#06x}")),
    };
    if raw.len() < 8 + ndigits * 2 {
        return Err("truncated NUMERIC digits".to_string());
    }
    let mut value: u128 = 0;
    let mut last_exponent: i64 = 0;
    for i in 0..ndigits {
        let offset = 8 + i * 2;
        let digit = i16::from_be_bytes([raw[offset], raw[offset + 1]]) as u128;
        let exponent = weight - i as i64;
        if exponent < 0 {
            if digit != 0 {
                return Err("fractional NUMERIC cannot be read as an unsigned integer".to_string());
            }
            continue;
        }
        value = value
            .checked_mul(10_000)
            .and_then(|v| v.checked_add(digit))
            .ok_or("NUMERIC value overflows u128".to_string())?;
        last_exponent = exponent;
    }
    for _ in 0..last_exponent {
        value = value
            .checked_mul(10_000)
            .ok_or("NUMERIC value overflows u128".to_string())?;
    }
    Ok(value)
}

#[cfg(test)]
mod test {
    use bytes::BytesMut;
    use test_case::test_case;

    use super::{read_numeric, write_numeric};

    #[test_case(0; "zero")]
    #[test_case(1; "one")]
    #[test_case(9_999; "single digit group")]
    #[test_case(10_000; "digit group boundary")]
    #[test_case(50_000; "trailing zero group")]
    #[test_case(2_099_999_997_689_999; "last sat ordinal")]
    #[test_case(21_000_000_000_000_000_000_000_000; "scaled brc20 supply")]
    #[test_case(u128::MAX; "max u128")]
    fn numeric_wire_round_trip(value: u128) {
        let mut buf = BytesMut::new();
        write_numeric(&mut buf, value);
        assert_eq!(read_numeric(&buf).unwrap(), value);
    }

    #[test]
    fn rejects_negative_numeric() {
        // -1 encoded as NUMERIC
        let raw: Vec<u8> = vec![0, 1, 0, 0, 0x40, 0, 0, 0, 0, 1];
        assert!(read_numeric(&raw).is_err());
    }

    #[test]
    fn rejects_fractional_numeric() {
        // 0.5 encoded as NUMERIC: ndigits=1, weight=-1, dscale=1, digit 5000
        let raw: Vec<u8> = vec![0, 1, 0xff, 0xff, 0, 0, 0, 1, 0x13, 0x88];
        assert!(read_numeric(&raw).is_err());
    }
}
