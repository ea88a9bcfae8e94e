use crate::{Error, ErrorKind, Result, SqlError};
use rust_decimal::{Decimal, prelude::ToPrimitive};
use std::borrow::Cow;
use time::{Date, PrimitiveDateTime, Time};
use uuid::Uuid;

/// A positional query parameter, as the engine receives it.
#[derive(Debug, Clone, PartialEq)]
pub enum Param<'a> {
    Null,
    Int32(i32),
    Int64(i64),
    Double(f64),
    Text(Cow<'a, str>),
    Blob(Cow<'a, [u8]>),
}

impl Param<'_> {
    pub fn type_name(&self) -> &'static str {
        match self {
            Param::Null => "null",
            Param::Int32(..) => "int32",
            Param::Int64(..) => "int64",
            Param::Double(..) => "double",
            Param::Text(..) => "text",
            Param::Blob(..) => "blob",
        }
    }
}

/// Conversion of native values into a [`Param`].
///
/// Text and binary values are borrowed when possible, the engine copies them at bind time.
/// ```rust
/// use rowbind_core::{AsParam, Param};
/// assert_eq!(7i32.as_param().unwrap(), Param::Int32(7));
/// assert_eq!(None::<i64>.as_param().unwrap(), Param::Null);
/// ```
pub trait AsParam {
    fn as_param(&self) -> Result<Param<'_>>;
}

impl<T: AsParam + ?Sized> AsParam for &T {
    fn as_param(&self) -> Result<Param<'_>> {
        (**self).as_param()
    }
}

impl AsParam for Param<'_> {
    fn as_param(&self) -> Result<Param<'_>> {
        Ok(match self {
            Param::Text(v) => Param::Text(Cow::Borrowed(v.as_ref())),
            Param::Blob(v) => Param::Blob(Cow::Borrowed(v.as_ref())),
            other => other.clone(),
        })
    }
}

impl AsParam for () {
    fn as_param(&self) -> Result<Param<'_>> {
        Ok(Param::Null)
    }
}

impl<T: AsParam> AsParam for Option<T> {
    fn as_param(&self) -> Result<Param<'_>> {
        match self {
            Some(v) => v.as_param(),
            None => Ok(Param::Null),
        }
    }
}

macro_rules! impl_as_param {
    ($variant:ident, $target:ty, $($source:ty),+) => {
        $(
            impl AsParam for $source {
                fn as_param(&self) -> Result<Param<'_>> {
                    Ok(Param::$variant(*self as $target))
                }
            }
        )+
    };
}

impl_as_param!(Int32, i32, bool, i8, i16, i32, u8, u16);
impl_as_param!(Int64, i64, i64, u32);
impl_as_param!(Double, f64, f32, f64);

impl AsParam for u64 {
    fn as_param(&self) -> Result<Param<'_>> {
        i64::try_from(*self).map(Param::Int64).map_err(|_| {
            out_of_range(format!(
                "Cannot bind u64 value `{}` into an integer parameter because it's out of bounds",
                self
            ))
        })
    }
}

impl AsParam for Decimal {
    fn as_param(&self) -> Result<Param<'_>> {
        self.to_f64().map(Param::Double).ok_or_else(|| {
            out_of_range(format!("Cannot convert the Decimal value `{}` to f64", self))
        })
    }
}

impl AsParam for str {
    fn as_param(&self) -> Result<Param<'_>> {
        Ok(Param::Text(Cow::Borrowed(self)))
    }
}

impl AsParam for String {
    fn as_param(&self) -> Result<Param<'_>> {
        Ok(Param::Text(Cow::Borrowed(self.as_str())))
    }
}

impl AsParam for Cow<'_, str> {
    fn as_param(&self) -> Result<Param<'_>> {
        Ok(Param::Text(Cow::Borrowed(self.as_ref())))
    }
}

impl AsParam for char {
    fn as_param(&self) -> Result<Param<'_>> {
        Ok(Param::Text(Cow::Owned(self.to_string())))
    }
}

impl AsParam for [u8] {
    fn as_param(&self) -> Result<Param<'_>> {
        Ok(Param::Blob(Cow::Borrowed(self)))
    }
}

impl<const N: usize> AsParam for [u8; N] {
    fn as_param(&self) -> Result<Param<'_>> {
        Ok(Param::Blob(Cow::Borrowed(self.as_slice())))
    }
}

impl AsParam for Vec<u8> {
    fn as_param(&self) -> Result<Param<'_>> {
        Ok(Param::Blob(Cow::Borrowed(self.as_slice())))
    }
}

macro_rules! impl_as_param_display {
    ($($source:ty),+) => {
        $(
            impl AsParam for $source {
                fn as_param(&self) -> Result<Param<'_>> {
                    Ok(Param::Text(Cow::Owned(self.to_string())))
                }
            }
        )+
    };
}

impl_as_param_display!(Uuid, Date, Time, PrimitiveDateTime);

fn out_of_range(message: String) -> Error {
    let error = Error::new(SqlError::new(ErrorKind::Bind, message));
    log::error!("{:#}", error);
    error
}
