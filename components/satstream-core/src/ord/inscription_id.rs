use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// An inscription id: `<txid>i<input_index>`, with the txid as lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InscriptionId {
    pub txid: String,
    pub index: u32,
}

impl Display for InscriptionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}i{}", self.txid, self.index)
    }
}

impl FromStr for InscriptionId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((txid, index)) = s.split_once('i') else {
            return Err(format!("invalid inscription id: {s}"));
        };
        if txid.len() != 64 || !txid.chars().all(|c| c.is_ascii_hexdigit() && !c.is_uppercase()) {
            return Err(format!("invalid inscription id txid: {s}"));
        }
        let index = index
            .parse::<u32>()
            .map_err(|_| format!("invalid inscription id index: {s}"))?;
        Ok(InscriptionId {
            txid: txid.to_string(),
            index,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::InscriptionId;

    #[test]
    fn parses_and_formats() {
        let id = InscriptionId::from_str(
            "38c46a8bf7ec90bc7f6b797e7dc84baa97f4e5fd4286b92fe1b50176d03b18dci0",
        )
        .unwrap();
        assert_eq!(id.index, 0);
        assert_eq!(
            id.to_string(),
            "38c46a8bf7ec90bc7f6b797e7dc84baa97f4e5fd4286b92fe1b50176d03b18dci0"
        );
    }

    #[test]
    fn rejects_malformed_ids() {
        assert!(InscriptionId::from_str("not-an-id").is_err());
        assert!(InscriptionId::from_str("38c46a8bi0").is_err());
        assert!(InscriptionId::from_str(
            "38C46A8BF7EC90BC7F6B797E7DC84BAA97F4E5FD4286B92FE1B50176D03B18DCi0"
        )
        .is_err());
        assert!(InscriptionId::from_str(
            "38c46a8bf7ec90bc7f6b797e7dc84baa97f4e5fd4286b92fe1b50176d03b18dcix"
        )
        .is_err());
    }
}
