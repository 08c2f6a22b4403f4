//! Parameter grids swept by each benchmark family.
//!
//! `grid()` returns the cells in collection order: the Nth block written by
//! the collector belongs to the Nth cell.

use std::fmt::Debug;

use crate::{BlockSize, Direction, Duplex, Mtu};

/// fio queue depths, swept for each block size.
pub const FIO_IO_DEPTHS: [u32; 13] = [1, 2, 4, 8, 16, 32, 64, 128, 256, 512, 1024, 2048, 4096];

/// Largest number of parallel iperf connections.
pub const IPERF_MAX_PARALLEL: u8 = 8;

/// nginx worker counts in the wrk sweep.
pub const WRK_CORES: [u32; 2] = [1, 8];

/// Served file sizes (bytes) in the wrk sweep.
pub const WRK_FILE_SIZES: [u64; 5] = [4096, 16384, 65536, 262_144, 1_048_576];

/// wrk connection counts in the scalability sweep.
pub const SCALE_CONNECTIONS: [u32; 12] = [
    64, 128, 256, 512, 1024, 2048, 4096, 8192, 16384, 32768, 65536, 131_072,
];

/// nginx worker count used throughout the scalability sweep.
pub const SCALE_CORES: u32 = 8;

/// Served file size used throughout the scalability sweep.
pub const SCALE_FILE_SIZE: u64 = 262_144;

/// A cell of a benchmark's parameter grid.
pub trait GridPoint: Copy + Ord + Debug {
    /// Column header for the swept parameter.
    const AXIS: &'static str;

    /// All cells in collection order.
    fn grid() -> Vec<Self>;

    /// Value written to the grid column of aggregated tables.
    fn axis_value(&self) -> String;
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FioPoint {
    pub block_size: BlockSize,
    pub io_depth: u32,
}

impl GridPoint for FioPoint {
    const AXIS: &'static str = "IOdepth";

    fn grid() -> Vec<Self> {
        BlockSize::ALL
            .into_iter()
            .flat_map(|block_size| {
                FIO_IO_DEPTHS.into_iter().map(move |io_depth| Self {
                    block_size,
                    io_depth,
                })
            })
            .collect()
    }

    fn axis_value(&self) -> String {
        self.io_depth.to_string()
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct IperfPoint {
    pub mtu: Mtu,
    pub duplex: Duplex,
    pub direction: Direction,
    pub parallel: u8,
}

/// Column order of one iperf result row after the connection count.
pub const IPERF_ROW_COLUMNS: [(Duplex, Direction); 4] = [
    (Duplex::Half, Direction::Tx),
    (Duplex::Half, Direction::Rx),
    (Duplex::Full, Direction::Tx),
    (Duplex::Full, Direction::Rx),
];

impl GridPoint for IperfPoint {
    const AXIS: &'static str = "parallel connections";

    fn grid() -> Vec<Self> {
        let mut points = Vec::new();
        for mtu in Mtu::ALL {
            for parallel in 1..=IPERF_MAX_PARALLEL {
                for (duplex, direction) in IPERF_ROW_COLUMNS {
                    points.push(Self {
                        mtu,
                        duplex,
                        direction,
                        parallel,
                    });
                }
            }
        }
        points
    }

    fn axis_value(&self) -> String {
        self.parallel.to_string()
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct WrkPoint {
    pub cores: u32,
    pub file_size: u64,
}

impl GridPoint for WrkPoint {
    const AXIS: &'static str = "size";

    fn grid() -> Vec<Self> {
        WRK_CORES
            .into_iter()
            .flat_map(|cores| {
                WRK_FILE_SIZES
                    .into_iter()
                    .map(move |file_size| Self { cores, file_size })
            })
            .collect()
    }

    /// File size in KiB.
    fn axis_value(&self) -> String {
        (self.file_size / 1024).to_string()
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ScalePoint {
    pub connections: u32,
}

impl GridPoint for ScalePoint {
    const AXIS: &'static str = "connections";

    fn grid() -> Vec<Self> {
        SCALE_CONNECTIONS
            .into_iter()
            .map(|connections| Self { connections })
            .collect()
    }

    fn axis_value(&self) -> String {
        self.connections.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fio_grid_order() {
        let grid = FioPoint::grid();
        assert_eq!(grid.len(), 26);
        assert_eq!(grid[0].block_size, BlockSize::K4);
        assert_eq!(grid[12].io_depth, 4096);
        assert_eq!(grid[13].block_size, BlockSize::K256);
        assert_eq!(grid[13].io_depth, 1);
    }

    #[test]
    fn test_iperf_grid_order() {
        let grid = IperfPoint::grid();
        assert_eq!(grid.len(), 64);
        assert_eq!(
            grid[1],
            IperfPoint {
                mtu: Mtu::Standard,
                duplex: Duplex::Half,
                direction: Direction::Rx,
                parallel: 1,
            }
        );
        assert_eq!(grid[4].parallel, 2);
        assert_eq!(grid[32].mtu, Mtu::Jumbo);
    }

    #[test]
    fn test_wrk_and_scale_labels() {
        let wrk = WrkPoint::grid();
        assert_eq!(wrk.len(), 10);
        let labels: Vec<_> = wrk[..5].iter().map(|p| p.axis_value()).collect();
        assert_eq!(labels, ["4", "16", "64", "256", "1024"]);
        assert_eq!(wrk[5].cores, 8);

        let scale = ScalePoint::grid();
        assert_eq!(scale.len(), 12);
        assert_eq!(scale[11].axis_value(), "131072");
    }
}
