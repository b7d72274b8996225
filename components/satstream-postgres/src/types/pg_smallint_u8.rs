use std::error::Error;

use bytes::{BufMut, BytesMut};
use tokio_postgres::types::{to_sql_checked, FromSql, IsNull, ToSql, Type};

/// A `u8` stored in a Postgres `SMALLINT` column. Used for BRC-20 token decimals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct PgSmallIntU8(pub u8);

impl ToSql for PgSmallIntU8 {
    fn to_sql(&self, _ty: &Type, out: &mut BytesMut) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        out.put_i16(self.0 as i16);
        Ok(IsNull::No)
    }

    fn accepts(ty: &Type) -> bool {
        matches!(*ty, Type::INT2)
    }

    to_sql_checked!();
}

impl<'a> FromSql<'a> for PgSmallIntU8 {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        if raw.len() != 2 {
            return Err("invalid SMALLINT wire length".into());
        }
        let value = i16::from_be_bytes(raw.try_into()?);
        let value: u8 = value
            .try_into()
            .map_err(|_| format!("SMALLINT value {value} does not fit in u8"))?;
        Ok(PgSmallIntU8(value))
    }

    fn accepts(ty: &Type) -> bool {
        matches!(*ty, Type::INT2)
    }
}

impl std::fmt::Display for PgSmallIntU8 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
