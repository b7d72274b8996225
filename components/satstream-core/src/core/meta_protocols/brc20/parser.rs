use regex::Regex;
use satstream_types::OrdinalInscriptionRevealData;

use crate::ord::media::{Language, Media};

use super::{decimals_str_amount_to_u128, MAX_DECIMALS};

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct ParsedBrc20TokenDeployData {
    /// Case-folded ticker, the token identity.
    pub tick: String,
    /// Ticker exactly as inscribed.
    pub display_tick: String,
    pub max: u128,
    pub lim: u128,
    pub dec: u8,
    pub self_mint: bool,
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct ParsedBrc20BalanceData {
    pub tick: String,
    /// Raw amount string; scaling requires the token's decimals, which only the verifier knows.
    pub amt: String,
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub enum ParsedBrc20Operation {
    Deploy(ParsedBrc20TokenDeployData),
    Mint(ParsedBrc20BalanceData),
    Transfer(ParsedBrc20BalanceData),
}

#[derive(Deserialize)]
struct Brc20DeployJson {
    p: String,
    op: String,
    tick: String,
    max: String,
    lim: Option<String>,
    dec: Option<String>,
    self_mint: Option<String>,
}

#[derive(Deserialize)]
struct Brc20MintOrTransferJson {
    p: String,
    op: String,
    tick: String,
    amt: String,
}

lazy_static! {
    pub static ref NUMERIC_FLOAT_REGEX: Regex =
        Regex::new(r#"^(([0-9]+)|([0-9]*\.?[0-9]+))$"#).unwrap();
    pub static ref NUMERIC_INT_REGEX: Regex = Regex::new(r#"^([0-9]+)$"#).unwrap();
}

pub fn amt_has_valid_decimals(amt: &str, max_decimals: u8) -> bool {
    if amt.contains('.')
        && amt.split('.').nth(1).map_or(0, |s| s.chars().count()) > max_decimals as usize
    {
        return false;
    }
    true
}

fn parse_decimal_numeric_value(n: &str, max_decimals: u8) -> Option<u128> {
    if !NUMERIC_FLOAT_REGEX.is_match(n) {
        return None;
    }
    if !amt_has_valid_decimals(n, max_decimals) {
        return None;
    }
    decimals_str_amount_to_u128(n, max_decimals).ok()
}

fn parse_int_numeric_value(n: &str) -> Option<u64> {
    if !NUMERIC_INT_REGEX.is_match(n) {
        return None;
    }
    n.parse::<u64>().ok()
}

/// Attempts to parse an inscription reveal into a BRC-20 operation by following the rules
/// explained in https://layer1.gitbook.io/layer1-foundation/protocols/brc-20/indexing
///
/// Inscriptions that are not BRC-20 at all parse to `None`; so do BRC-20-looking payloads that
/// break a syntactic rule, which the protocol treats as inert content.
pub fn parse_brc20_operation(
    reveal: &OrdinalInscriptionRevealData,
) -> Result<Option<ParsedBrc20Operation>, String> {
    match Media::from_content_type(&reveal.content_type) {
        Media::Code(Language::Json) | Media::Text => {}
        _ => return Ok(None),
    };
    let Ok(content_bytes) = hex::decode(&reveal.content_bytes) else {
        return Ok(None);
    };
    match serde_json::from_slice::<Brc20DeployJson>(&content_bytes) {
        Ok(json) => {
            if json.p != "brc-20" || json.op != "deploy" {
                return Ok(None);
            }
            let self_mint = match json.self_mint.as_deref() {
                Some("true") => true,
                Some(_) => return Ok(None),
                None => false,
            };
            // 4-byte tickers are the legacy namespace; 5-byte tickers exist only for self-mint.
            match (json.tick.as_bytes().len(), self_mint) {
                (4, false) | (5, true) => {}
                _ => return Ok(None),
            };
            let mut deploy = ParsedBrc20TokenDeployData {
                tick: json.tick.to_lowercase(),
                display_tick: json.tick.clone(),
                max: 0,
                lim: 0,
                dec: MAX_DECIMALS,
                self_mint,
            };
            if let Some(dec) = json.dec {
                let Some(parsed_dec) = parse_int_numeric_value(&dec) else {
                    return Ok(None);
                };
                if parsed_dec > MAX_DECIMALS as u64 {
                    return Ok(None);
                }
                deploy.dec = parsed_dec as u8;
            }
            match parse_decimal_numeric_value(&json.max, deploy.dec) {
                Some(0) | None => return Ok(None),
                Some(parsed_max) => deploy.max = parsed_max,
            };
            match json.lim {
                Some(lim) => match parse_decimal_numeric_value(&lim, deploy.dec) {
                    Some(0) | None => return Ok(None),
                    Some(parsed_lim) => deploy.lim = parsed_lim,
                },
                None => deploy.lim = deploy.max,
            };
            if deploy.lim > deploy.max {
                return Ok(None);
            }
            Ok(Some(ParsedBrc20Operation::Deploy(deploy)))
        }
        Err(_) => match serde_json::from_slice::<Brc20MintOrTransferJson>(&content_bytes) {
            Ok(json) => {
                if json.p != "brc-20" {
                    return Ok(None);
                }
                let tick_len = json.tick.as_bytes().len();
                if tick_len != 4 && tick_len != 5 {
                    return Ok(None);
                }
                // The token's actual decimals are unknown until verification, validate against
                // the protocol maximum only.
                match parse_decimal_numeric_value(&json.amt, MAX_DECIMALS) {
                    Some(0) | None => return Ok(None),
                    Some(_) => {}
                };
                let data = ParsedBrc20BalanceData {
                    tick: json.tick.to_lowercase(),
                    amt: json.amt,
                };
                match json.op.as_str() {
                    "mint" => Ok(Some(ParsedBrc20Operation::Mint(data))),
                    "transfer" => Ok(Some(ParsedBrc20Operation::Transfer(data))),
                    _ => Ok(None),
                }
            }
            Err(_) => Ok(None),
        },
    }
}

#[cfg(test)]
mod test {
    use satstream_types::{OrdinalInscriptionNumber, OrdinalInscriptionRevealData};
    use serde_json::json;
    use test_case::test_case;

    use super::{
        parse_brc20_operation, ParsedBrc20BalanceData, ParsedBrc20Operation,
        ParsedBrc20TokenDeployData,
    };

    fn reveal(content_type: &str, body: serde_json::Value) -> OrdinalInscriptionRevealData {
        OrdinalInscriptionRevealData {
            content_bytes: hex::encode(body.to_string()),
            content_type: content_type.to_string(),
            content_length: body.to_string().len(),
            inscription_number: OrdinalInscriptionNumber {
                classic: 0,
                jubilee: 0,
            },
            inscription_fee: 100,
            inscription_output_value: 10000,
            inscription_id: "b61b0172d95e266c18aea0c624db987e971a5d6d4ebc2aaed85da4642d635735i0"
                .to_string(),
            inscription_input_index: 0,
            inscription_pointer: None,
            inscriber_address: Some("324A7GHA2azecbVBAFy4pzEhcPT1GjbUAp".to_string()),
            delegate: None,
            metaprotocol: None,
            metadata: None,
            parents: vec![],
            ordinal_number: 257418248345364,
            ordinal_block_height: 51483,
            ordinal_offset: 0,
            tx_index: 0,
            satpoint_post_inscription:
                "b61b0172d95e266c18aea0c624db987e971a5d6d4ebc2aaed85da4642d635735:0:0".to_string(),
            curse_type: None,
            charms: 0,
        }
    }

    #[test]
    fn parses_deploy() {
        let op = parse_brc20_operation(&reveal(
            "text/plain;charset=utf-8",
            json!({"p": "brc-20", "op": "deploy", "tick": "PEPE", "max": "21000000", "lim": "1000", "dec": "18"}),
        ))
        .unwrap();
        assert_eq!(
            op,
            Some(ParsedBrc20Operation::Deploy(ParsedBrc20TokenDeployData {
                tick: "pepe".to_string(),
                display_tick: "PEPE".to_string(),
                max: 21_000_000_000_000_000_000_000_000,
                lim: 1_000_000_000_000_000_000_000,
                dec: 18,
                self_mint: false,
            }))
        );
    }

    #[test]
    fn deploy_lim_defaults_to_max() {
        let op = parse_brc20_operation(&reveal(
            "application/json",
            json!({"p": "brc-20", "op": "deploy", "tick": "ordi", "max": "100", "dec": "0"}),
        ))
        .unwrap();
        let Some(ParsedBrc20Operation::Deploy(deploy)) = op else {
            panic!("expected deploy");
        };
        assert_eq!(deploy.lim, 100);
        assert_eq!(deploy.max, 100);
    }

    #[test]
    fn parses_mint_and_transfer() {
        let mint = parse_brc20_operation(&reveal(
            "text/plain",
            json!({"p": "brc-20", "op": "mint", "tick": "pepe", "amt": "1000"}),
        ))
        .unwrap();
        assert_eq!(
            mint,
            Some(ParsedBrc20Operation::Mint(ParsedBrc20BalanceData {
                tick: "pepe".to_string(),
                amt: "1000".to_string(),
            }))
        );
        let transfer = parse_brc20_operation(&reveal(
            "text/plain",
            json!({"p": "brc-20", "op": "transfer", "tick": "PEPE", "amt": "9000"}),
        ))
        .unwrap();
        assert_eq!(
            transfer,
            Some(ParsedBrc20Operation::Transfer(ParsedBrc20BalanceData {
                tick: "pepe".to_string(),
                amt: "9000".to_string(),
            }))
        );
    }

    #[test_case(json!({"p": "brc-20", "op": "deploy", "tick": "toolong", "max": "100"}); "six byte ticker")]
    #[test_case(json!({"p": "brc-20", "op": "deploy", "tick": "pepes", "max": "100"}); "five byte ticker without self mint")]
    #[test_case(json!({"p": "brc-20", "op": "deploy", "tick": "pepe", "max": "0"}); "zero max")]
    #[test_case(json!({"p": "brc-20", "op": "deploy", "tick": "pepe", "max": "100", "lim": "200"}); "lim above max")]
    #[test_case(json!({"p": "brc-20", "op": "deploy", "tick": "pepe", "max": "100", "dec": "19"}); "decimals above cap")]
    #[test_case(json!({"p": "brc-20", "op": "deploy", "tick": "pepe", "max": "1.123", "dec": "2"}); "max with excessive precision")]
    #[test_case(json!({"p": "brc-21", "op": "deploy", "tick": "pepe", "max": "100"}); "wrong protocol")]
    #[test_case(json!({"p": "brc-20", "op": "mint", "tick": "pepe", "amt": "0"}); "zero mint")]
    #[test_case(json!({"p": "brc-20", "op": "burn", "tick": "pepe", "amt": "10"}); "unknown op")]
    fn rejects_invalid_payloads(body: serde_json::Value) {
        assert_eq!(
            parse_brc20_operation(&reveal("text/plain", body)).unwrap(),
            None
        );
    }

    #[test]
    fn rejects_invalid_content_type() {
        assert_eq!(
            parse_brc20_operation(&reveal(
                "image/png",
                json!({"p": "brc-20", "op": "mint", "tick": "pepe", "amt": "10"}),
            ))
            .unwrap(),
            None
        );
    }

    #[test]
    fn accepts_self_mint_deploy() {
        let op = parse_brc20_operation(&reveal(
            "text/plain",
            json!({"p": "brc-20", "op": "deploy", "tick": "$pepe", "max": "100", "dec": "0", "self_mint": "true"}),
        ))
        .unwrap();
        let Some(ParsedBrc20Operation::Deploy(deploy)) = op else {
            panic!("expected deploy");
        };
        assert!(deploy.self_mint);
        assert_eq!(deploy.tick, "$pepe");
    }
}
