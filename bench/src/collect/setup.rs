//! Link and NIC preparation.
//!
//! The FPGA NIC comes back from a hot reset without a driver or an address,
//! so every FPGA run first resets the card, rebuilds and loads `mqnic`, and
//! brings up the interface. Commodity NICs only need their addresses.

use std::net::Ipv4Addr;

use log::{info, warn};
use nicbench_common::Mtu;

use super::{Host, Session};
use crate::{
    remote::RemoteShell,
    retry::retry,
    types::{BenchmarkError, BenchmarkResult},
};

/// Exit status of the last line is the script's status.
fn address_script(ip: Ipv4Addr, iface: &str, mtu: u32) -> String {
    format!(
        "sudo ip addr add {ip}/24 dev {iface}\n\
         sudo ip link set {iface} up\n\
         sudo ip link set {iface} mtu {mtu}"
    )
}

/// Assigns the host's address on the first interface that accepts it.
pub fn configure_address<S: RemoteShell>(
    shell: &S,
    host: &Host,
    mtu: Mtu,
) -> BenchmarkResult<()> {
    let mut last = None;
    for iface in host.ifaces() {
        let script = address_script(host.ip, iface, mtu.bytes());
        match shell.check(&host.name, &script) {
            Ok(_) => {
                info!("{} is up on {iface} ({})", host.name, host.ip);
                return Ok(());
            }
            Err(e) => last = Some(e),
        }
    }
    Err(last.unwrap_or_else(|| {
        BenchmarkError::Configuration(format!("No interface configured on {}", host.name))
    }))
}

impl<S: RemoteShell> Session<'_, S> {
    fn corundum(&self) -> &str {
        &self.paths.corundum
    }

    fn alveo_port(&self) -> BenchmarkResult<&str> {
        self.alveo_port.as_deref().ok_or_else(|| {
            BenchmarkError::Configuration(format!(
                "Machine {} has no 'alveo_port' configured",
                self.client.name
            ))
        })
    }

    /// Unloads the NIC driver; failure means it was not loaded.
    fn unload_driver(&self) -> BenchmarkResult<()> {
        self.shell.run(&self.client.name, "sudo rmmod mqnic").map(drop)
    }

    /// Builds and loads `mqnic`, waiting for the interface to appear.
    ///
    /// A failed load is only logged; bringing up the interface afterwards
    /// decides whether the step is retried.
    fn load_driver(&self) -> BenchmarkResult<()> {
        let corundum = self.corundum();
        let script = format!(
            "cd {corundum}/modules/mqnic\n\
             make\n\
             cd\n\
             sudo insmod ./{corundum}/modules/mqnic/mqnic.ko"
        );
        if self.shell.run(&self.client.name, &script)?.success() {
            self.cancel.sleep(self.timing.driver_load())?;
        } else {
            warn!("Loading mqnic on {} failed", self.client.name);
        }
        Ok(())
    }

    /// Brings up the server side of the link at MTU 9000.
    pub fn setup_server(&self) -> BenchmarkResult<()> {
        configure_address(self.shell, &self.server, Mtu::Jumbo)
    }

    /// Hot-resets the FPGA and reloads its driver until the client interface
    /// comes up.
    pub fn reset_fpga(&self, mtu: Mtu) -> BenchmarkResult<()> {
        let alveo_port = self.alveo_port()?.to_string();
        let host = &self.client.name;
        let reset = format!(
            "sudo ./{}/utils/mqnic-fw -d /sys/bus/pci/devices/{alveo_port}/resource0 -b",
            self.corundum()
        );

        retry(&self.policy, &self.cancel, "FPGA reset", |attempt| {
            info!("Hot reset of {host} (attempt {attempt})");
            self.unload_driver()?;
            self.shell.run(host, &reset)?;
            self.load_driver()?;
            configure_address(self.shell, &self.client, mtu)
        })
    }

    /// Checks the link with one ping in each direction.
    pub fn ping_both(&self) -> BenchmarkResult<()> {
        self.shell
            .check(&self.server.name, &format!("ping -c 1 {}", self.client.ip))?;
        self.shell
            .check(&self.client.name, &format!("ping -c 1 {}", self.server.ip))?;
        Ok(())
    }

    /// Full preparation of an FPGA run: server address, reset, ping.
    pub fn prepare_fpga(&self) -> BenchmarkResult<()> {
        self.setup_server()?;
        self.reset_fpga(Mtu::Jumbo)?;
        self.ping_both()
    }

    /// Preparation of a run between two commodity NICs.
    pub fn prepare_nic(&self) -> BenchmarkResult<()> {
        self.setup_server()?;
        configure_address(self.shell, &self.client, Mtu::Jumbo)?;
        self.ping_both()
    }

    /// Reloads the driver without a hot reset and brings the client up at
    /// `mtu`.
    pub fn setup_without_reset(&self, mtu: Mtu) -> BenchmarkResult<()> {
        self.setup_server()?;
        self.unload_driver()?;

        let corundum = self.corundum();
        if !self
            .shell
            .run(&self.client.name, &format!("test -d {corundum}"))?
            .success()
        {
            return Err(BenchmarkError::Configuration(format!(
                "No Corundum checkout at ~/{corundum} on {}",
                self.client.name
            )));
        }

        self.load_driver()?;
        configure_address(self.shell, &self.client, mtu)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        collect::tests::{fpga_session, testbed},
        retry::CancellationToken,
        testing::{failed, ScriptedShell},
    };

    #[test]
    fn test_prepare_fpga_sequence() {
        let shell = ScriptedShell::new();
        let session = fpga_session(&shell);
        session.prepare_fpga().unwrap();

        let calls = shell.calls.borrow();
        assert!(calls[0].starts_with("f00$ sudo ip addr add 10.103.41.1/24 dev enp65s0\n"));
        assert!(calls[0].ends_with("sudo ip link set enp65s0 mtu 9000"));
        assert_eq!(calls[1], "f03$ sudo rmmod mqnic");
        assert_eq!(
            calls[2],
            "f03$ sudo ./corundum/utils/mqnic-fw -d /sys/bus/pci/devices/0000:2d:00.0/resource0 -b"
        );
        assert!(calls[3].ends_with("sudo insmod ./corundum/modules/mqnic/mqnic.ko"));
        assert!(calls[4].starts_with("f03$ sudo ip addr add 10.103.41.2/24 dev eth0\n"));
        assert_eq!(calls[5], "f00$ ping -c 1 10.103.41.2");
        assert_eq!(calls[6], "f03$ ping -c 1 10.103.41.1");
    }

    #[test]
    fn test_reset_retries_until_interface_is_up() {
        let shell = ScriptedShell::new()
            .queue("dev eth0", failed(1))
            .queue("dev enp45s0", failed(1))
            .queue("dev eth0", failed(1));
        let session = fpga_session(&shell);
        session.reset_fpga(Mtu::Jumbo).unwrap();

        assert_eq!(shell.calls_matching("mqnic-fw").len(), 2);
        let addresses = shell.calls_matching("ip addr add");
        assert_eq!(addresses.len(), 4);
        assert!(addresses[3].contains("dev enp45s0\n"));
    }

    #[test]
    fn test_failed_driver_load_is_left_to_address_setup() {
        let shell = ScriptedShell::new().queue("insmod", failed(1));
        let session = fpga_session(&shell);
        session.reset_fpga(Mtu::Jumbo).unwrap();

        assert_eq!(shell.calls_matching("insmod").len(), 1);
        assert_eq!(shell.calls_matching("mqnic-fw").len(), 1);
        assert_eq!(shell.calls_matching("dev eth0\n").len(), 1);
    }

    #[test]
    fn test_reset_requires_alveo_port() {
        let shell = ScriptedShell::new();
        let mut config = testbed();
        config.machines[1].alveo_port = None;
        let session =
            Session::fpga(&shell, &config, "f03", None, None, CancellationToken::new()).unwrap();
        assert!(matches!(
            session.reset_fpga(Mtu::Jumbo),
            Err(BenchmarkError::Configuration(_))
        ));
        assert!(shell.calls.borrow().is_empty());
    }

    #[test]
    fn test_setup_without_checkout_fails() {
        let shell = ScriptedShell::new().respond("test -d", failed(1));
        let session = fpga_session(&shell);
        let err = session.setup_without_reset(Mtu::Jumbo).unwrap_err();
        assert!(err.to_string().contains("No Corundum checkout"));
        assert!(shell.calls_matching("insmod").is_empty());
    }
}
