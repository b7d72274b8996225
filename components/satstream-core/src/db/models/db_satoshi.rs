use satstream_postgres::types::PgNumericU64;
use satstream_types::OrdinalInscriptionRevealData;

use crate::ord::sat::Sat;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbSatoshi {
    pub ordinal_number: PgNumericU64,
    pub rarity: String,
    pub coinbase_height: PgNumericU64,
}

impl DbSatoshi {
    pub fn from_reveal(reveal: &OrdinalInscriptionRevealData) -> Result<Self, String> {
        let sat = Sat::from_ordinal(reveal.ordinal_number)?;
        Ok(DbSatoshi {
            ordinal_number: PgNumericU64(reveal.ordinal_number),
            rarity: sat.rarity().to_string(),
            coinbase_height: PgNumericU64(sat.height()),
        })
    }
}
