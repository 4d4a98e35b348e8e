//! Blob header: name, size, target interface and format version.
//!
//! A loader checks the header before it reads any other table; see
//! [`Version::is_compatible_with`] for the acceptance rule.

use std::fmt;

/// Format version this workspace writes and reads.
pub const LOADABLE_VERSION: Version = Version::new(0, 7, 0);

/// Engine interface a blob or task targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Interface {
    /// No interface (invalid as a blob target)
    #[default]
    None,
    /// First-generation DLA accelerator
    Dla1,
    /// CPU emulation engine
    Emu1,
}

impl Interface {
    /// Raw interface code used on the wire.
    pub const fn as_raw(self) -> u32 {
        match self {
            Self::None => 0,
            Self::Dla1 => 1,
            Self::Emu1 => 2,
        }
    }

    /// Interface for a raw wire code.
    pub const fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::None),
            1 => Some(Self::Dla1),
            2 => Some(Self::Emu1),
            _ => None,
        }
    }

    /// True for the accelerator interface.
    pub const fn is_accelerator(self) -> bool {
        matches!(self, Self::Dla1)
    }
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "NONE"),
            Self::Dla1 => write!(f, "DLA1"),
            Self::Emu1 => write!(f, "EMU1"),
        }
    }
}

/// Three-component format version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Version {
    /// Major version; a mismatch is never compatible
    pub major: u8,
    /// Minor version
    pub minor: u8,
    /// Sub-minor version
    pub sub_minor: u8,
}

impl Version {
    /// Create a version.
    pub const fn new(major: u8, minor: u8, sub_minor: u8) -> Self {
        Self {
            major,
            minor,
            sub_minor,
        }
    }

    /// Whether a blob at `self` can be read by a runtime at `runtime`.
    ///
    /// Majors must match and the blob must not be newer than the runtime.
    pub fn is_compatible_with(&self, runtime: &Version) -> bool {
        self.major == runtime.major && (self.minor, self.sub_minor) <= (runtime.minor, runtime.sub_minor)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.sub_minor)
    }
}

/// Loadable header record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    /// Network name
    pub name: String,
    /// Total serialized size in bytes
    pub size: u64,
    /// Target interface
    pub interface: Interface,
    /// Format version
    pub version: Version,
}

impl Blob {
    /// Header for a DLA1 loadable at the current format version.
    pub fn dla1(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: 0,
            interface: Interface::Dla1,
            version: LOADABLE_VERSION,
        }
    }

    /// Set the declared version.
    #[must_use]
    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    /// Set the declared interface.
    #[must_use]
    pub fn with_interface(mut self, interface: Interface) -> Self {
        self.interface = interface;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn older_minor_is_compatible() {
        let runtime = Version::new(0, 7, 0);
        assert!(Version::new(0, 6, 9).is_compatible_with(&runtime));
        assert!(Version::new(0, 7, 0).is_compatible_with(&runtime));
    }

    #[test]
    fn newer_or_other_major_is_rejected() {
        let runtime = Version::new(0, 7, 0);
        assert!(!Version::new(0, 7, 1).is_compatible_with(&runtime));
        assert!(!Version::new(0, 8, 0).is_compatible_with(&runtime));
        assert!(!Version::new(1, 0, 0).is_compatible_with(&runtime));
    }

    #[test]
    fn interface_raw_codes() {
        for iface in [Interface::None, Interface::Dla1, Interface::Emu1] {
            assert_eq!(Interface::from_raw(iface.as_raw()), Some(iface));
        }
        assert_eq!(Interface::from_raw(9), None);
        assert_eq!(Interface::Dla1.to_string(), "DLA1");
    }
}
