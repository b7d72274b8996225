#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrdinalOperation {
    InscriptionRevealed(OrdinalInscriptionRevealData),
    InscriptionTransferred(OrdinalInscriptionTransferData),
}

/// Jubilee vs classic inscription numbering. The jubilee number is the canonical `number`; the
/// classic number keeps the pre-jubilee sign, so `classic < 0` marks a cursed inscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct OrdinalInscriptionNumber {
    pub classic: i64,
    pub jubilee: i64,
}

impl OrdinalInscriptionNumber {
    pub fn zero() -> Self {
        OrdinalInscriptionNumber {
            classic: 0,
            jubilee: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrdinalInscriptionCurseType {
    DuplicateField,
    IncompleteField,
    NotAtOffsetZero,
    NotInFirstInput,
    Pointer,
    Pushnum,
    Stutter,
    UnrecognizedEvenField,
    Generic,
    Reinscription,
}

impl OrdinalInscriptionCurseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DuplicateField => "duplicate_field",
            Self::IncompleteField => "incomplete_field",
            Self::NotAtOffsetZero => "not_at_offset_zero",
            Self::NotInFirstInput => "not_in_first_input",
            Self::Pointer => "pointer",
            Self::Pushnum => "pushnum",
            Self::Stutter => "stutter",
            Self::UnrecognizedEvenField => "unrecognized_even_field",
            Self::Generic => "generic",
            Self::Reinscription => "reinscription",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct OrdinalInscriptionRevealData {
    /// Inscription content, hex encoded.
    pub content_bytes: String,
    pub content_type: String,
    pub content_length: usize,
    pub inscription_number: OrdinalInscriptionNumber,
    pub inscription_fee: u64,
    pub inscription_output_value: u64,
    /// `<txid>i<input_index>`
    pub inscription_id: String,
    pub inscription_input_index: usize,
    pub inscription_pointer: Option<u64>,
    pub inscriber_address: Option<String>,
    pub delegate: Option<String>,
    pub metaprotocol: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub parents: Vec<String>,
    pub ordinal_number: u64,
    pub ordinal_block_height: u64,
    pub ordinal_offset: u64,
    pub tx_index: usize,
    /// `<txid>:<vout>:<offset>` of the sat right after the reveal.
    pub satpoint_post_inscription: String,
    pub curse_type: Option<OrdinalInscriptionCurseType>,
    pub charms: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "value")]
pub enum OrdinalInscriptionTransferDestination {
    /// Sat landed on a spendable output owned by the given address.
    Transferred(String),
    /// Sat was consumed as miner fees; it stays with its previous owner at an unbound satpoint.
    SpentInFees,
    /// Sat landed on an unspendable output (the value carries the script repr).
    Burnt(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct OrdinalInscriptionTransferData {
    pub ordinal_number: u64,
    pub destination: OrdinalInscriptionTransferDestination,
    /// `<txid>:<vout>:<offset>` the sat was spent from.
    pub satpoint_pre_transfer: String,
    /// `<txid>:<vout>:<offset>` the sat now sits at.
    pub satpoint_post_transfer: String,
    pub post_transfer_output_value: Option<u64>,
    pub tx_index: usize,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn deserializes_apply_event() {
        let payload = r#"{
            "apply": {
                "block_identifier": { "index": 767430, "hash": "56f6cb9b7f64d7d2b6e8a1c3a9c6e7b1f0c889ca1a8b9e6f2e4a1db86d1f11f0" },
                "parent_block_identifier": { "index": 767429, "hash": "aa3b26b2fcae3b52fb0e69a197da41d1303b745e1a3f682db8a0a937290b59e4" },
                "timestamp": 1677803510,
                "transactions": [
                    {
                        "transaction_identifier": { "hash": "b61b0172d95e266c18aea0c624db987e971a5d6d4ebc2aaed85da4642d635735" },
                        "ordinal_operations": [
                            {
                                "inscription_transferred": {
                                    "ordinal_number": 257418248345364,
                                    "destination": { "type": "transferred", "value": "bc1pd99n363yjz8gd2zhy7gstsmk4qkdz4t029j44wewhmee3dta429sm5xqrd" },
                                    "satpoint_pre_transfer": "a321f9e0e3cb35a6b60b5c4b4b6b9b1e7b73bb01d4a6e83937cd42a91d3f2d0a:0:0",
                                    "satpoint_post_transfer": "b61b0172d95e266c18aea0c624db987e971a5d6d4ebc2aaed85da4642d635735:0:0",
                                    "post_transfer_output_value": 10000,
                                    "tx_index": 4
                                }
                            }
                        ]
                    }
                ]
            }
        }"#;
        let event: crate::BlockEvent = serde_json::from_str(payload).unwrap();
        let crate::BlockEvent::Apply(block) = event else {
            panic!("expected apply event");
        };
        assert_eq!(block.block_identifier.index, 767430);
        let OrdinalOperation::InscriptionTransferred(transfer) =
            &block.transactions[0].ordinal_operations[0]
        else {
            panic!("expected transfer operation");
        };
        assert_eq!(transfer.ordinal_number, 257418248345364);
        assert_eq!(transfer.post_transfer_output_value, Some(10000));
    }
}
