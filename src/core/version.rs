use serde::de::{self, Deserialize, Deserializer};
use std::fmt::Display;
use std::str::FromStr;

/// A four-field design version `major.minor.patch.production`.
///
/// Each numeric field must fit in one byte so the version can be encoded into
/// the 32-bit USR_ACCESS register of the bitstream. The trailing field marks
/// a production (1) versus prototype (0) build.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct DesignVersion {
    major: u8,
    minor: u8,
    patch: u8,
    production: bool,
}

impl DesignVersion {
    pub fn new(major: u8, minor: u8, patch: u8, production: bool) -> Self {
        Self {
            major,
            minor,
            patch,
            production,
        }
    }

    /// The 4-byte access code: flag byte, then major, minor, patch.
    pub fn access_code(&self) -> [u8; 4] {
        [self.production as u8, self.major, self.minor, self.patch]
    }

    /// Renders the access code as the hex literal handed to the toolchain
    /// for the USR_ACCESS register.
    pub fn usr_access(&self) -> String {
        let code = self.access_code();
        format!(
            "0x{:02x}{:02x}{:02x}{:02x}",
            code[0], code[1], code[2], code[3]
        )
    }
}

impl Default for DesignVersion {
    fn default() -> Self {
        Self::new(0, 0, 0, false)
    }
}

impl Display for DesignVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.patch, self.production as u8
        )
    }
}

impl FromStr for DesignVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split('.').collect();
        if fields.len() != 4 {
            return Err(VersionError::FieldCount(fields.len()));
        }
        let parse = |f: &str| {
            f.parse::<u8>()
                .map_err(|_| VersionError::InvalidField(f.to_string()))
        };
        let production = match fields[3] {
            "0" => false,
            "1" => true,
            other => return Err(VersionError::InvalidFlag(other.to_string())),
        };
        Ok(Self::new(
            parse(fields[0])?,
            parse(fields[1])?,
            parse(fields[2])?,
            production,
        ))
    }
}

impl<'de> Deserialize<'de> for DesignVersion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(de::Error::custom)
    }
}

/// A Xilinx tool release, e.g. `2019.1`.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct ToolVersion {
    year: u16,
    minor: u16,
}

impl ToolVersion {
    /// Selects the toolchain family for this release.
    ///
    /// The fields are compared independently, exactly how the historical
    /// scripts decided it: a release is legacy SDK when year <= 2019 and
    /// minor <= 1, so `2018.9` is legacy while `2019.2` and `2020.1` are not.
    pub fn generation(&self) -> Generation {
        if self.year <= 2019 && self.minor <= 1 {
            Generation::Sdk
        } else {
            Generation::Vitis
        }
    }

    /// The version spelled for use inside an environment variable name.
    pub fn env_fragment(&self) -> String {
        format!("{}_{}", self.year, self.minor)
    }
}

impl Default for ToolVersion {
    fn default() -> Self {
        Self {
            year: 2019,
            minor: 1,
        }
    }
}

impl Display for ToolVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.year, self.minor)
    }
}

impl FromStr for ToolVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split('.').collect();
        if fields.len() != 2 {
            return Err(VersionError::FieldCount(fields.len()));
        }
        let parse = |f: &str| {
            f.parse::<u16>()
                .map_err(|_| VersionError::InvalidField(f.to_string()))
        };
        Ok(Self {
            year: parse(fields[0])?,
            minor: parse(fields[1])?,
        })
    }
}

impl<'de> Deserialize<'de> for ToolVersion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(de::Error::custom)
    }
}

/// The vendor tool family a release belongs to.
///
/// Affects the hardware-description extension the build produces and which
/// secondary tool regenerates the software support package.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Generation {
    Sdk,
    Vitis,
}

impl Generation {
    /// The hardware-description file extension produced by this family.
    pub fn artifact_ext(&self) -> &'static str {
        match self {
            Self::Sdk => "hdf",
            Self::Vitis => "xsa",
        }
    }

    /// The 0/1 flag handed to the build tcl.
    pub fn as_flag(&self) -> u8 {
        match self {
            Self::Sdk => 0,
            Self::Vitis => 1,
        }
    }
}

impl Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sdk => write!(f, "SDK"),
            Self::Vitis => write!(f, "Vitis"),
        }
    }
}

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum VersionError {
    #[error("expected dot-separated numeric fields, found {0} fields")]
    FieldCount(usize),
    #[error("field {0:?} is not a number in range")]
    InvalidField(String),
    #[error("production flag must be 0 or 1, found {0:?}")]
    InvalidFlag(String),
}
