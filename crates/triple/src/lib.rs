use std::fmt::{Display, Formatter};

use thiserror::Error;

/// A parsed target triple of the form `architecture-vendor-os`.
///
/// Only the architecture component affects code generation decisions; the
/// vendor and operating system are retained so a triple can round-trip
/// through [`Display`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetTriple {
    pub architecture: Architecture,
    pub vendor: Vendor,
    pub operating_system: OperatingSystem,
}

impl TargetTriple {
    pub fn new(
        architecture: Architecture,
        vendor: Vendor,
        operating_system: OperatingSystem,
    ) -> Self {
        Self {
            architecture,
            vendor,
            operating_system,
        }
    }

    pub fn parse(s: &str) -> Result<Self, InvalidTriple> {
        let mut triple = s.split('-');

        let arch = triple.next().filter(|c| !c.is_empty());
        let arch = Architecture::parse(arch.ok_or(InvalidTriple::InvalidFormat(s))?);
        let vendor = triple.next().map(Vendor::parse).unwrap_or_default();
        let os = triple.next().map(OperatingSystem::parse).unwrap_or_default();

        Ok(Self::new(arch, vendor, os))
    }
}

impl Display for TargetTriple {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}-{}-{}",
            self.architecture, self.vendor, self.operating_system
        )
    }
}

/// Architectures the transform knows how to classify.
///
/// Anything that is not one of the three supported families parses as
/// [`Architecture::Unknown`] rather than failing; unknown targets are
/// treated like x86-64 for addressing purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Architecture {
    X86_64,
    X86_32,
    PowerPc,
    Unknown,
}

impl Architecture {
    fn parse(s: &str) -> Self {
        let s = s.to_ascii_lowercase();
        if s.contains("x86_64") || s.contains("amd64") {
            Self::X86_64
        } else if ["i386", "i486", "i586", "i686"].iter().any(|a| s.contains(a)) {
            Self::X86_32
        } else if s.contains("powerpc") {
            Self::PowerPc
        } else {
            Self::Unknown
        }
    }

    /// Returns `true` if data references on this architecture are encoded
    /// relative to the instruction pointer.
    ///
    /// Unknown architectures answer `true`, matching x86-64. This is an
    /// aggressive default: a target without PC-relative data addressing that
    /// falls through to this arm will be handed an adjacent relocation table
    /// it cannot reach.
    pub fn is_data_pc_relative(self) -> bool {
        match self {
            Self::X86_64 | Self::Unknown => true,
            Self::X86_32 | Self::PowerPc => false,
        }
    }

    pub fn default_pointer_width(self) -> PointerWidth {
        match self {
            Self::X86_64 | Self::Unknown => PointerWidth::W64,
            Self::X86_32 | Self::PowerPc => PointerWidth::W32,
        }
    }
}

impl Display for Architecture {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::X86_64 => write!(f, "x86_64"),
            Self::X86_32 => write!(f, "i686"),
            Self::PowerPc => write!(f, "powerpc"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Vendor {
    Pc,
    Apple,
    #[default]
    Unknown,
}

impl Vendor {
    fn parse(s: &str) -> Self {
        match s {
            "pc" => Self::Pc,
            "apple" => Self::Apple,
            _ => Self::Unknown,
        }
    }
}

impl Display for Vendor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pc => write!(f, "pc"),
            Self::Apple => write!(f, "apple"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperatingSystem {
    Linux,
    Darwin,
    #[default]
    Unknown,
}

impl OperatingSystem {
    fn parse(s: &str) -> Self {
        match s {
            "linux" => Self::Linux,
            "darwin" => Self::Darwin,
            _ => Self::Unknown,
        }
    }
}

impl Display for OperatingSystem {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Linux => write!(f, "linux"),
            Self::Darwin => write!(f, "darwin"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Pointer width of a module's data layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerWidth {
    W32,
    W64,
}

impl PointerWidth {
    pub fn bits(self) -> usize {
        match self {
            Self::W32 => 32,
            Self::W64 => 64,
        }
    }

    pub fn bytes(self) -> usize {
        self.bits() / 8
    }
}

#[derive(Debug, Clone, Copy, Error)]
pub enum InvalidTriple<'a> {
    #[error("the format of triple must be `architecture-vendor-os`: but got `{0}`")]
    InvalidFormat(&'a str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_x86_64() {
        let triple = TargetTriple::parse("x86_64-unknown-linux").unwrap();

        assert_eq!(triple.architecture, Architecture::X86_64);
        assert_eq!(triple.operating_system, OperatingSystem::Linux);
        assert!(triple.architecture.is_data_pc_relative());
        assert_eq!(triple.architecture.default_pointer_width().bits(), 64);
    }

    #[test]
    fn parse_x86_32_family() {
        for arch in ["i386", "i486", "i586", "i686"] {
            let triple = TargetTriple::parse(&format!("{arch}-pc-linux")).unwrap();
            assert_eq!(triple.architecture, Architecture::X86_32);
            assert!(!triple.architecture.is_data_pc_relative());
        }
    }

    #[test]
    fn parse_powerpc() {
        let triple = TargetTriple::parse("powerpc-apple-darwin").unwrap();

        assert_eq!(triple.architecture, Architecture::PowerPc);
        assert_eq!(triple.vendor, Vendor::Apple);
        assert!(!triple.architecture.is_data_pc_relative());
        assert_eq!(triple.architecture.default_pointer_width().bits(), 32);
    }

    #[test]
    fn unknown_architecture_is_pc_relative() {
        let triple = TargetTriple::parse("riscv64-unknown-linux").unwrap();

        assert_eq!(triple.architecture, Architecture::Unknown);
        assert!(triple.architecture.is_data_pc_relative());
    }

    #[test]
    fn empty_triple_is_rejected() {
        assert!(TargetTriple::parse("").is_err());
    }
}
