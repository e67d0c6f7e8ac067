//! Target platforms, SDKs, and instruction-set architectures

use std::collections::BTreeSet;
use std::fmt;

/// A single instruction-set architecture identifier, e.g. "arm64"
///
/// Architecture sets are compared for membership, never ordered; the `Ord`
/// impl exists only so sets render deterministically.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Architecture(String);

impl Architecture {
    /// Create an architecture from its identifier
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Identifier string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl From<&str> for Architecture {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// A toolchain SDK targeted by one build invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sdk {
    /// Desktop SDK
    MacOsx,
    /// Mobile device SDK
    Iphoneos,
    /// Mobile simulator SDK
    Iphonesimulator,
}

impl Sdk {
    /// SDK name as passed to the build tool
    pub fn name(self) -> &'static str {
        match self {
            Self::MacOsx => "macosx",
            Self::Iphoneos => "iphoneos",
            Self::Iphonesimulator => "iphonesimulator",
        }
    }

    /// Architectures a build against this SDK is expected to produce
    pub fn architectures(self) -> BTreeSet<Architecture> {
        let names: &[&str] = match self {
            Self::MacOsx => &["x86_64"],
            Self::Iphoneos => &["armv7", "arm64"],
            Self::Iphonesimulator => &["i386"],
        };
        names.iter().copied().map(Architecture::from).collect()
    }
}

impl fmt::Display for Sdk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A buildable target platform
///
/// Each platform maps to one build folder and one or more SDK invocations;
/// a multi-SDK platform's outputs are merged into one universal artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    /// Host desktop target
    Desktop,
    /// Mobile device family target (device + simulator)
    Mobile,
}

impl Platform {
    /// All supported platforms in build order
    pub fn all() -> Vec<Platform> {
        vec![Self::Desktop, Self::Mobile]
    }

    /// Folder name under the build output directory
    pub fn name(self) -> &'static str {
        match self {
            Self::Desktop => "Mac",
            Self::Mobile => "iOS",
        }
    }

    /// SDKs built for this platform, one invocation each
    pub fn sdks(self) -> &'static [Sdk] {
        match self {
            Self::Desktop => &[Sdk::MacOsx],
            Self::Mobile => &[Sdk::Iphoneos, Sdk::Iphonesimulator],
        }
    }

    /// Union of architectures expected in this platform's merged artifact
    pub fn architectures(self) -> BTreeSet<Architecture> {
        self.sdks()
            .iter()
            .flat_map(|sdk| sdk.architectures())
            .collect()
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
