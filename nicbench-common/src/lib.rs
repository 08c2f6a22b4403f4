//! Common types shared by the benchmark collector and the result aggregator.
//!
//! The collector writes raw tool output in the order given by the grid
//! enumerations in [`grid`], and the aggregator maps the Nth block of a file
//! back to the Nth grid cell. Keeping both sides on the same definitions is
//! what keeps the raw file format and the grid in lockstep.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

pub mod grid;

pub use grid::{FioPoint, GridPoint, IperfPoint, ScalePoint, WrkPoint};

/// Name of the sub-directory holding receive-side results.
pub const RX_DIR: &str = "rx";

/// Name of the sub-directory holding transmit-side results.
pub const TX_DIR: &str = "tx";

/// One of the compared system configurations.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Unmodified Corundum.
    Baseline,
    /// Corundum with the generated modules spliced in.
    Modified,
    /// Third-party reference NIC.
    Reference,
}

impl Variant {
    /// All variants, in table order.
    pub const ALL: [Self; 3] = [Self::Baseline, Self::Modified, Self::Reference];

    /// Tag embedded in result file names.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Baseline => "corig",
            Self::Modified => "csf",
            Self::Reference => "mel",
        }
    }

    /// Label written to the `type` column of aggregated tables.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Baseline => "$\\mathbf{C_{Orig}}$",
            Self::Modified => "$\\mathbf{C_{SF}}$",
            Self::Reference => "$\\mathbf{M}$",
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Baseline => "baseline",
            Self::Modified => "modified",
            Self::Reference => "reference",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Variant {
    type Err = String;

    /// Accepts the variant name, its file tag or its table label.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| s == v.name() || s == v.tag() || s == v.label())
            .ok_or_else(|| format!("Unknown variant: {s}"))
    }
}

/// Traffic direction as seen from the FPGA machine.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Tx,
    Rx,
}

impl Direction {
    pub const ALL: [Self; 2] = [Self::Tx, Self::Rx];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tx => TX_DIR,
            Self::Rx => RX_DIR,
        }
    }

    #[must_use]
    pub const fn upper(self) -> &'static str {
        match self {
            Self::Tx => "TX",
            Self::Rx => "RX",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tx" => Ok(Self::Tx),
            "rx" => Ok(Self::Rx),
            _ => Err(format!("Unknown direction: {s}")),
        }
    }
}

/// Whether iperf runs one-way (half) or both ways at once (full).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Duplex {
    Half,
    Full,
}

impl Duplex {
    pub const ALL: [Self; 2] = [Self::Half, Self::Full];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Half => "half",
            Self::Full => "full",
        }
    }

    /// Extra iperf client flag for this mode.
    #[must_use]
    pub const fn iperf_flag(self) -> &'static str {
        match self {
            Self::Half => "",
            Self::Full => "-d",
        }
    }
}

impl fmt::Display for Duplex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Duplex {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "half" => Ok(Self::Half),
            "full" => Ok(Self::Full),
            _ => Err(format!("Unknown duplex mode: {s}")),
        }
    }
}

/// Link MTU used in the iperf sweep.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Mtu {
    Standard,
    Jumbo,
}

impl Mtu {
    pub const ALL: [Self; 2] = [Self::Standard, Self::Jumbo];

    #[must_use]
    pub const fn bytes(self) -> u32 {
        match self {
            Self::Standard => 1500,
            Self::Jumbo => 9000,
        }
    }
}

impl TryFrom<u32> for Mtu {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            1500 => Ok(Self::Standard),
            9000 => Ok(Self::Jumbo),
            _ => Err(format!("Unsupported MTU: {value}")),
        }
    }
}

impl From<Mtu> for u32 {
    fn from(mtu: Mtu) -> Self {
        mtu.bytes()
    }
}

impl fmt::Display for Mtu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bytes())
    }
}

impl FromStr for Mtu {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes: u32 = s
            .trim()
            .parse()
            .map_err(|e| format!("Invalid MTU '{s}': {e}"))?;
        Self::try_from(bytes)
    }
}

/// fio block size.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum BlockSize {
    K4,
    K256,
}

impl BlockSize {
    pub const ALL: [Self; 2] = [Self::K4, Self::K256];

    /// Value passed to fio through `BLOCKSIZE`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::K4 => "4K",
            Self::K256 => "256K",
        }
    }

    /// Lowercase form used in output file names.
    #[must_use]
    pub const fn file_tag(self) -> &'static str {
        match self {
            Self::K4 => "4k",
            Self::K256 => "256k",
        }
    }
}

impl fmt::Display for BlockSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlockSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|b| b.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown block size: {s}"))
    }
}

/// Benchmark families, each with its own raw format and grid.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Family {
    Fio,
    Iperf,
    NginxWrk,
    NginxScale,
}

impl Family {
    pub const ALL: [Self; 4] = [Self::Fio, Self::Iperf, Self::NginxWrk, Self::NginxScale];

    /// Directory holding this family's raw results.
    #[must_use]
    pub const fn dir_name(self) -> &'static str {
        match self {
            Self::Fio => "fio",
            Self::Iperf => "iperf",
            Self::NginxWrk => "nginx_wrk",
            Self::NginxScale => "nginx_scale",
        }
    }

    /// Prefix of raw result file names written by the collector.
    #[must_use]
    pub const fn file_prefix(self) -> &'static str {
        match self {
            Self::Fio => "fio",
            Self::Iperf => "data",
            Self::NginxWrk => "wrk",
            Self::NginxScale => "scale_wrk",
        }
    }

    /// Whether results are split into `rx`/`tx` sub-directories.
    #[must_use]
    pub const fn is_directional(self) -> bool {
        matches!(self, Self::Fio | Self::NginxWrk)
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}
