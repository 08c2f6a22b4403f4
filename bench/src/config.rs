//! Configuration file support for the benchmark testbed
//!
//! The testbed file lists the machines taking part in the benchmarks, the
//! interfaces they use and the timing knobs of the collectors.

use std::{collections::HashSet, fs, net::Ipv4Addr, path::Path, time::Duration};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Configuration for a single machine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MachineConfig {
    /// Host name reachable over SSH (e.g. "f01")
    pub name: String,
    /// PCI address of the Alveo card, for machines hosting the FPGA NIC
    #[serde(default)]
    pub alveo_port: Option<String>,
    /// Interface the FPGA NIC shows up as when it is not `eth0`
    #[serde(default)]
    pub fpga_alt_iface: Option<String>,
    /// Commodity NIC interface, for machines acting as server
    #[serde(default)]
    pub iface: Option<String>,
}

/// Delays and timeouts used by the collectors, in seconds
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TimingConfig {
    /// Pause before starting a listener and before connecting to it
    pub wait_secs: u64,
    /// Pause after a successful iperf measurement
    pub sleep_secs: u64,
    /// iperf measurement length
    pub bench_secs: u64,
    /// Upper bound on one fio run
    pub fio_timeout_secs: u64,
    /// Pause after killing a stuck fio before restarting it
    pub restart_backoff_secs: u64,
    /// Pause for a freshly started server (fio, nginx) or driver to settle
    pub settle_secs: u64,
    /// wrk measurement length
    pub wrk_secs: u64,
    /// Pause after loading the NIC driver
    pub driver_load_secs: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            wait_secs: 2,
            sleep_secs: 4,
            bench_secs: 10,
            fio_timeout_secs: 90,
            restart_backoff_secs: 10,
            settle_secs: 5,
            wrk_secs: 70,
            driver_load_secs: 3,
        }
    }
}

impl TimingConfig {
    /// All delays zero; used where no real hardware is involved.
    #[must_use]
    pub fn immediate() -> Self {
        Self {
            wait_secs: 0,
            sleep_secs: 0,
            restart_backoff_secs: 0,
            settle_secs: 0,
            driver_load_secs: 0,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn wait(&self) -> Duration {
        Duration::from_secs(self.wait_secs)
    }

    #[must_use]
    pub fn sleep(&self) -> Duration {
        Duration::from_secs(self.sleep_secs)
    }

    #[must_use]
    pub fn fio_timeout(&self) -> Duration {
        Duration::from_secs(self.fio_timeout_secs)
    }

    #[must_use]
    pub fn restart_backoff(&self) -> Duration {
        Duration::from_secs(self.restart_backoff_secs)
    }

    #[must_use]
    pub fn settle(&self) -> Duration {
        Duration::from_secs(self.settle_secs)
    }

    #[must_use]
    pub fn driver_load(&self) -> Duration {
        Duration::from_secs(self.driver_load_secs)
    }
}

/// Remote locations of the tools driven by the collectors
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RemotePaths {
    /// Corundum checkout, relative to the home directory
    pub corundum: String,
    /// wrk checkout holding the binary and `http.size.lua`
    pub wrk: String,
    /// Base directory exported as `TBASE` to nginx
    pub nginx_base: String,
    /// nginx configuration file
    pub nginx_conf: String,
    /// Read-ahead knob of the served block device
    pub read_ahead: String,
}

impl Default for RemotePaths {
    fn default() -> Self {
        Self {
            corundum: "corundum".to_string(),
            wrk: "~/wrk".to_string(),
            nginx_base: "~/autonomous-asplos21-artifact/TestSuite/".to_string(),
            nginx_conf: "~/autonomous-asplos21-artifact/TestSuite/Tests/nginx/nginx.conf"
                .to_string(),
            read_ahead: "/sys/block/nvme0n1/queue/read_ahead_kb".to_string(),
        }
    }
}

/// Configuration for the entire testbed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TestbedConfig {
    /// All machines that may take part in a benchmark
    pub machines: Vec<MachineConfig>,
    /// Server used when none is given on the command line
    #[serde(default = "default_server")]
    pub default_server: String,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub paths: RemotePaths,
}

fn default_server() -> String {
    "f00".to_string()
}

impl TestbedConfig {
    /// Load testbed configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Save testbed configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content =
            serde_json::to_string_pretty(self).context("Failed to serialize configuration")?;

        fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.machines.is_empty() {
            anyhow::bail!("Testbed has no machines");
        }

        let mut seen = HashSet::new();
        for machine in &self.machines {
            if !seen.insert(machine.name.as_str()) {
                anyhow::bail!("Duplicate machine: {}", machine.name);
            }
            machine_number(&machine.name)?;
        }

        if self.machine(&self.default_server).is_none() {
            anyhow::bail!("Default server {} is not a known machine", self.default_server);
        }

        Ok(())
    }

    /// Get configuration for a machine by name
    #[must_use]
    pub fn machine(&self, name: &str) -> Option<&MachineConfig> {
        self.machines.iter().find(|m| m.name == name)
    }
}

/// Number identifying a machine's subnet: the digits of its name, offset by
/// 10 for the `j` machines.
pub fn machine_number(name: &str) -> Result<u32> {
    let digits: String = name.chars().filter(char::is_ascii_digit).collect();
    let number: u32 = digits
        .parse()
        .with_context(|| format!("Machine name '{name}' contains no machine number"))?;

    let number = if name.starts_with('j') {
        number + 10
    } else {
        number
    };
    if number > 155 {
        anyhow::bail!("Machine number {number} of '{name}' is out of range");
    }
    Ok(number)
}

/// Address of the server side of a machine's link.
#[must_use]
pub fn server_ip(machine_number: u32) -> Ipv4Addr {
    Ipv4Addr::new(10, subnet(machine_number), 41, 1)
}

/// Address of the NIC under test on a machine's link.
#[must_use]
pub fn client_ip(machine_number: u32) -> Ipv4Addr {
    Ipv4Addr::new(10, subnet(machine_number), 41, 2)
}

fn subnet(machine_number: u32) -> u8 {
    u8::try_from(100 + machine_number).unwrap_or(u8::MAX)
}
