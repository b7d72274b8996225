pub mod brc20_pg;
pub mod cache;
pub mod index;
pub mod models;
pub mod parser;
pub mod verifier;

use config::{Config, OrdinalsBrc20Config};

use self::cache::Brc20MemoryCache;

/// BRC-20 amounts are fixed-point integers scaled by the token's `decimals`. The protocol caps
/// decimals at 18, so any amount fits the `u128` range with room to spare.
pub const MAX_DECIMALS: u8 = 18;

pub fn brc20_new_cache(config: &Config) -> Option<Brc20MemoryCache> {
    config
        .ordinals_brc20_config()
        .map(|brc20| Brc20MemoryCache::new(brc20.lru_cache_size))
}

pub fn brc20_activation_height(config: &OrdinalsBrc20Config) -> u64 {
    config.genesis_block
}

pub fn brc20_self_mint_activation_height(config: &OrdinalsBrc20Config) -> u64 {
    config.self_mint_activation_block
}

/// Parses a decimal amount string into its scaled integer representation. Rejects excessive
/// precision, non-numeric input and overflow. `"1.5"` at 2 decimals becomes `150`.
pub fn decimals_str_amount_to_u128(amt: &str, decimals: u8) -> Result<u128, String> {
    let (integer, fraction) = match amt.split_once('.') {
        Some((integer, fraction)) => (integer, fraction),
        None => (amt, ""),
    };
    if integer.is_empty() && fraction.is_empty() {
        return Err(format!("invalid amount: {amt}"));
    }
    if fraction.len() > decimals as usize {
        return Err(format!("amount {amt} exceeds {decimals} decimals"));
    }
    if !integer.chars().all(|c| c.is_ascii_digit())
        || !fraction.chars().all(|c| c.is_ascii_digit())
    {
        return Err(format!("invalid amount: {amt}"));
    }
    let scale = 10u128.pow(decimals as u32);
    let integer_part = if integer.is_empty() {
        0u128
    } else {
        integer
            .parse::<u128>()
            .map_err(|e| format!("invalid amount {amt}: {e}"))?
    };
    let fraction_part = if fraction.is_empty() {
        0u128
    } else {
        let padded = format!("{:0<width$}", fraction, width = decimals as usize);
        padded
            .parse::<u128>()
            .map_err(|e| format!("invalid amount {amt}: {e}"))?
    };
    integer_part
        .checked_mul(scale)
        .and_then(|v| v.checked_add(fraction_part))
        .ok_or(format!("amount {amt} out of range"))
}

/// Formats a scaled integer amount back into its decimal string form, keeping the full scale:
/// `150` at 2 decimals becomes `"1.50"`.
pub fn u128_amount_to_decimals_str(amount: u128, decimals: u8) -> String {
    if decimals == 0 {
        return amount.to_string();
    }
    let scale = 10u128.pow(decimals as u32);
    format!(
        "{}.{:0>width$}",
        amount / scale,
        amount % scale,
        width = decimals as usize
    )
}

#[cfg(test)]
mod test {
    use test_case::test_case;

    use super::{decimals_str_amount_to_u128, u128_amount_to_decimals_str};

    #[test_case("21000000", 18 => Ok(21_000_000_000_000_000_000_000_000); "integer at max decimals")]
    #[test_case("1.5", 2 => Ok(150); "fraction below scale")]
    #[test_case("0.000000000000000001", 18 => Ok(1); "smallest unit")]
    #[test_case(".5", 1 => Ok(5); "missing integer part")]
    #[test_case("100", 0 => Ok(100); "zero decimals")]
    #[test_case("1.55", 1 => Err("amount 1.55 exceeds 1 decimals".to_string()); "excessive precision")]
    #[test_case("1,5", 1 => Err("invalid amount: 1,5".to_string()); "invalid separator")]
    #[test_case("-5", 0 => Err("invalid amount: -5".to_string()); "negative amount")]
    #[test_case(".", 2 => Err("invalid amount: .".to_string()); "lone dot")]
    fn parses_decimal_amounts(amt: &str, decimals: u8) -> Result<u128, String> {
        decimals_str_amount_to_u128(amt, decimals)
    }

    #[test_case(150, 2 => "1.50"; "trailing zero kept")]
    #[test_case(21_000_000_000_000_000_000_000_000, 18 => "21000000.000000000000000000"; "full scale")]
    #[test_case(100, 0 => "100"; "zero decimals")]
    #[test_case(1, 18 => "0.000000000000000001"; "smallest unit")]
    fn formats_decimal_amounts(amount: u128, decimals: u8) -> String {
        u128_amount_to_decimals_str(amount, decimals)
    }

    #[test]
    fn round_trips_scaled_amounts() {
        let amt = decimals_str_amount_to_u128("9000", 18).unwrap();
        assert_eq!(u128_amount_to_decimals_str(amt, 18), "9000.000000000000000000");
    }
}
