//! Registry hive inference from a policy file's path.
//!
//! Group Policy stores user settings under `User\Registry.pol` and machine
//! settings under `Machine\Registry.pol`; the path is the only signal.

use std::fmt;

/// Registry scope a policy record applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hive {
    /// HKEY_CURRENT_USER.
    CurrentUser,
    /// HKEY_LOCAL_MACHINE.
    LocalMachine,
    /// Path carried neither marker.
    Unknown,
}

impl Hive {
    /// Derives the hive from a file path or label.
    ///
    /// Matching is case-sensitive and `User` wins over `Machine`.
    ///
    /// ```
    /// use regpol_parser::Hive;
    ///
    /// assert_eq!(Hive::from_label(r"{GUID}\User\Registry.pol"), Hive::CurrentUser);
    /// assert_eq!(Hive::from_label(r"{GUID}\Machine\Registry.pol"), Hive::LocalMachine);
    /// assert_eq!(Hive::from_label("registry.pol"), Hive::Unknown);
    /// ```
    pub fn from_label(label: &str) -> Self {
        if label.contains("User") {
            Hive::CurrentUser
        } else if label.contains("Machine") {
            Hive::LocalMachine
        } else {
            Hive::Unknown
        }
    }

    /// Returns the short hive name, or `?` when unknown.
    pub fn as_str(self) -> &'static str {
        match self {
            Hive::CurrentUser => "HKCU",
            Hive::LocalMachine => "HKLM",
            Hive::Unknown => "?",
        }
    }
}

impl fmt::Display for Hive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Hive {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hive_inference() {
        assert_eq!(Hive::from_label("/gpo/{31B2}/User/Registry.pol").as_str(), "HKCU");
        assert_eq!(Hive::from_label("/gpo/{31B2}/Machine/Registry.pol").as_str(), "HKLM");
        assert_eq!(Hive::from_label("/gpo/{31B2}/Registry.pol").as_str(), "?");
    }

    #[test]
    fn test_user_checked_first() {
        assert_eq!(Hive::from_label("Machine/User/Registry.pol"), Hive::CurrentUser);
    }

    #[test]
    fn test_case_sensitive() {
        assert_eq!(Hive::from_label("/gpo/machine/registry.pol"), Hive::Unknown);
    }
}
