//! Enum-like identifiers that appear as strings in configuration documents.
//!
//! Every lookup normalizes the name first (`-` becomes `_`, then uppercase),
//! so `debian`, `Debian` and `DEBIAN` all resolve to [`Distro::Debian`].

use crate::error::{Error, Result};
use serde::Serialize;
use std::fmt;

/// Lookup-by-name shared by the identifier enums below.
pub trait NamedEnum: Sized + Copy + 'static {
    /// Human label used in error messages.
    const KIND: &'static str;

    /// All variants, in declaration order.
    fn variants() -> &'static [Self];

    /// Canonical uppercase name.
    fn name(&self) -> &'static str;

    /// Resolve a variant by name after normalizing case.
    fn from_name(name: &str) -> Result<Self> {
        let normalized = normalize_name(name);
        Self::variants()
            .iter()
            .copied()
            .find(|v| v.name() == normalized)
            .ok_or_else(|| Error::UnknownEnumValue {
                kind: Self::KIND,
                value: name.to_string(),
            })
    }
}

fn normalize_name(name: &str) -> String {
    name.trim().replace('-', "_").to_uppercase()
}

macro_rules! named_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal { $($(#[$vmeta:meta])* $variant:ident => $label:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl NamedEnum for $name {
            const KIND: &'static str = $kind;

            fn variants() -> &'static [Self] {
                &[$($name::$variant),+]
            }

            fn name(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }

        impl std::str::FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                Self::from_name(s)
            }
        }
    };
}

named_enum! {
    /// Supported operating-system distributions.
    Distro, "distro" {
        Debian => "DEBIAN",
    }
}

impl Distro {
    /// Lowercase form used in distro document file names.
    pub fn file_stem(&self) -> String {
        self.name().to_lowercase()
    }
}

named_enum! {
    /// How a single override directive is applied to the base value.
    UpdateMode, "update mode" {
        /// Concatenate the directive's sequence onto the base sequence.
        Append => "APPEND",
        /// Replace the base value wholesale.
        Override => "OVERRIDE",
    }
}

named_enum! {
    PackageCommand, "package command" {
        Install => "INSTALL",
        Remove => "REMOVE",
    }
}

named_enum! {
    WindowManager, "window manager" {
        Xfce4 => "XFCE4",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(Distro::from_name("debian").unwrap(), Distro::Debian);
        assert_eq!(Distro::from_name("DeBiAn").unwrap(), Distro::Debian);
        assert_eq!(UpdateMode::from_name("append").unwrap(), UpdateMode::Append);
        assert_eq!(
            UpdateMode::from_name("Override").unwrap(),
            UpdateMode::Override
        );
    }

    #[test]
    fn test_surrounding_whitespace_is_ignored() {
        assert_eq!(Distro::from_name(" debian ").unwrap(), Distro::Debian);
        assert_eq!(PackageCommand::from_name("remove").unwrap(), PackageCommand::Remove);
    }

    #[test]
    fn test_unknown_name_is_error() {
        let err = UpdateMode::from_name("merge").unwrap_err();
        assert!(matches!(
            err,
            Error::UnknownEnumValue { kind: "update mode", ref value } if value == "merge"
        ));

        assert!(Distro::from_name("arch").is_err());
    }

    #[test]
    fn test_display_and_helpers() {
        assert_eq!(Distro::Debian.to_string(), "DEBIAN");
        assert_eq!(Distro::Debian.file_stem(), "debian");
        assert_eq!("xfce4".parse::<WindowManager>().unwrap(), WindowManager::Xfce4);
    }
}
