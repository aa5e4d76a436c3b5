//! Garment sizes.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown size: {0}")]
pub struct SizeError(pub String);

macro_rules! sizes {
    ($($variant:ident => $label:literal),+ $(,)?) => {
        /// A size from the fixed storefront size chart.
        ///
        /// Letter sizes cover tops; numeric sizes are waist measurements.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum Size {
            $(
                #[serde(rename = $label)]
                $variant,
            )+
        }

        impl Size {
            /// Every size in chart order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $label,)+
                }
            }
        }

        impl FromStr for Size {
            type Err = SizeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $($label => Ok(Self::$variant),)+
                    other => Err(SizeError(other.to_owned())),
                }
            }
        }
    };
}

sizes! {
    Xs => "XS",
    S => "S",
    M => "M",
    L => "L",
    Xl => "XL",
    Xxl => "XXL",
    Xxxl => "XXXL",
    Xxxxl => "XXXXL",
    Xxxxxl => "XXXXXL",
    Xxxxxxl => "XXXXXXL",
    W26 => "26",
    W28 => "28",
    W30 => "30",
    W31 => "31",
    W32 => "32",
    W33 => "33",
    W34 => "34",
    W36 => "36",
    W38 => "38",
    W40 => "40",
    W42 => "42",
    W44 => "44",
    W46 => "46",
    W48 => "48",
    W50 => "50",
    W52 => "52",
    W54 => "54",
    W56 => "56",
    W58 => "58",
    W60 => "60",
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Size {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Size {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(s.parse()?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Size {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <&str as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.as_str(), buf)
    }
}
