//! `define_port_error!`: one declaration per port error enum.
//!
//! A declaration lists each variant with its fields, the
//! [`ErrorCode`](crate::domain::ErrorCode) it reports and its display
//! format:
//!
//! ```text
//! define_port_error! {
//!     pub enum NotifyError {
//!         Delivery { message: String } => ServiceUnavailable: "delivery failed: {message}",
//!     }
//! }
//! ```
//!
//! The macro emits the `thiserror` enum, a snake_case constructor per
//! variant whose arguments accept anything `Into` the field type, a `code()`
//! accessor, and the conversion into the domain [`Error`](crate::domain::Error).

macro_rules! define_port_error {
    (@constructor $variant:ident) => {
        ::paste::paste! {
            #[doc = concat!("`", stringify!($variant), "` failure.")]
            pub fn [<$variant:snake>]() -> Self {
                Self::$variant
            }
        }
    };

    (@constructor $variant:ident { $($field:ident : $ty:ty),* }) => {
        ::paste::paste! {
            #[doc = concat!("`", stringify!($variant), "` failure.")]
            pub fn [<$variant:snake>]($($field: impl Into<$ty>),*) -> Self {
                Self::$variant { $($field: $field.into()),* }
            }
        }
    };

    (
        $(#[$enum_meta:meta])*
        pub enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident $( { $($field:ident : $ty:ty),* $(,)? } )?
                    => $code:ident : $format:literal
            ),* $(,)?
        }
    ) => {
        $(#[$enum_meta])*
        #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
        pub enum $name {
            $(
                $(#[$variant_meta])*
                #[error($format)]
                $variant $( { $(#[doc = stringify!($field)] $field: $ty),* } )?,
            )*
        }

        impl $name {
            $( define_port_error!(@constructor $variant $( { $($field : $ty),* } )?); )*

            /// Category reported when this failure reaches a service.
            pub fn code(&self) -> $crate::domain::ErrorCode {
                match self {
                    $( Self::$variant { .. } => $crate::domain::ErrorCode::$code, )*
                }
            }
        }

        impl From<$name> for $crate::domain::Error {
            fn from(failure: $name) -> Self {
                Self::new(failure.code(), failure.to_string())
            }
        }
    };
}

pub(crate) use define_port_error;

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use crate::domain::{Error, ErrorCode};
    use rstest::rstest;

    define_port_error! {
        /// Sample port error.
        pub enum LedgerError {
            Rejected { message: String } => ServiceUnavailable: "ledger rejected: {message}",
            MissingRow { row: usize } => NotFound: "row {row} is missing",
            Drift { account: String, cents: i64 } =>
                InternalError: "account {account} drifted by {cents}",
            Locked => Conflict: "ledger locked",
        }
    }

    #[rstest]
    #[case(LedgerError::rejected("quota"), "ledger rejected: quota", ErrorCode::ServiceUnavailable)]
    #[case(LedgerError::missing_row(7_usize), "row 7 is missing", ErrorCode::NotFound)]
    #[case(LedgerError::drift("dues", -250_i64), "account dues drifted by -250", ErrorCode::InternalError)]
    #[case(LedgerError::locked(), "ledger locked", ErrorCode::Conflict)]
    fn constructors_format_and_classify(
        #[case] failure: LedgerError,
        #[case] text: &str,
        #[case] code: ErrorCode,
    ) {
        assert_eq!(failure.to_string(), text);
        assert_eq!(failure.code(), code);
    }

    #[test]
    fn conversion_keeps_code_and_message() {
        let error: Error = LedgerError::missing_row(3_usize).into();
        assert_eq!(error.code(), ErrorCode::NotFound);
        assert_eq!(error.message(), "row 3 is missing");
    }
}
