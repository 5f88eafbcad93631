//! Integer coding for enums that cross the persistence boundary.
//!
//! Stores persist algorithm, window, status and label as small integers.
//! The pipeline itself only ever sees the typed enums.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodeError {
    #[error("unknown {kind} code: {code}")]
    UnknownCode { kind: &'static str, code: i64 },

    #[error("unknown {kind} name: '{name}'")]
    UnknownName { kind: &'static str, name: String },
}

/// Pure encode/decode pair between an enum and its stored integer.
pub trait IntCode: Sized + Copy {
    /// Name used in error messages.
    const KIND: &'static str;

    fn encode(self) -> i64;

    fn decode(code: i64) -> Result<Self, CodeError>;
}

/// Implements `IntCode` plus a `name()`/`FromStr` pair for a fieldless enum.
macro_rules! int_coded {
    ($ty:ident, $kind:literal, { $($variant:ident = $code:literal => $name:literal),+ $(,)? }) => {
        impl $crate::domain::codes::IntCode for $ty {
            const KIND: &'static str = $kind;

            fn encode(self) -> i64 {
                match self {
                    $($ty::$variant => $code,)+
                }
            }

            fn decode(code: i64) -> Result<Self, $crate::domain::codes::CodeError> {
                match code {
                    $($code => Ok($ty::$variant),)+
                    other => Err($crate::domain::codes::CodeError::UnknownCode {
                        kind: $kind,
                        code: other,
                    }),
                }
            }
        }

        impl $ty {
            /// Upper-case name, as shown to users and written to artifact paths.
            pub fn name(self) -> &'static str {
                match self {
                    $($ty::$variant => $name,)+
                }
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.pad(self.name())
            }
        }

        impl std::str::FromStr for $ty {
            type Err = $crate::domain::codes::CodeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let upper = s.trim().to_ascii_uppercase();
                match upper.as_str() {
                    $($name => Ok($ty::$variant),)+
                    _ => Err($crate::domain::codes::CodeError::UnknownName {
                        kind: $kind,
                        name: s.to_string(),
                    }),
                }
            }
        }
    };
}

pub(crate) use int_coded;
