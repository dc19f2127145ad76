//! Internal macros.

/// Generates a string-backed enum with a stable wire representation.
///
/// The generated type serializes as the given literal, round-trips through
/// `Display`/`FromStr` (parsing is case-insensitive and ignores surrounding
/// whitespace), and exposes `as_str()` plus an `ALL` slice in declaration
/// order. Declaration order also defines `Ord`.
///
/// # Parameters
///
/// - variant list: `Variant => "literal",`
/// - `parse_error`: a callable `fn(&str) -> DqWatchError` used by `FromStr`
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $(
                $(#[$vmeta:meta])*
                $variant:ident => $value:literal,
            )+
        }
        parse_error = $err:expr;
    ) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            serde::Serialize,
            serde::Deserialize
        )]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $value)]
                $variant,
            )+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Returns the stable string representation.
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $value,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::error::DqWatchError;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                let normalized = s.trim().to_ascii_lowercase();
                match normalized.as_str() {
                    $($value => Ok(Self::$variant),)+
                    _ => Err(($err)(s)),
                }
            }
        }
    };
}
