//! Ethernet network interface state.
//!
//! All properties are reported by the controller and read-only on the wire;
//! the model is populated from query responses (client/proxy) or from
//! configuration (server).

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};
use crate::model::property::{Property, SetOutcome};

/// An EUI-48 (MAC) address.
///
/// Formats as six hyphen-separated uppercase hex octets, the way the
/// hardware reports it (`70-B3-D5-07-XX-XX`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Eui48([u8; 6]);

impl Eui48 {
    /// Creates an address from raw octets.
    #[must_use]
    pub fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    /// Returns the raw octets.
    #[must_use]
    pub fn octets(self) -> [u8; 6] {
        self.0
    }
}

impl fmt::Display for Eui48 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let o = &self.0;
        write!(
            f,
            "{:02X}-{:02X}-{:02X}-{:02X}-{:02X}-{:02X}",
            o[0], o[1], o[2], o[3], o[4], o[5]
        )
    }
}

impl FromStr for Eui48 {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut octets = [0u8; 6];
        let mut count = 0;
        for part in s.split('-') {
            if count == 6 || part.len() != 2 {
                return Err(ModelError::InvalidArgument(format!(
                    "EUI-48 address {s:?} is not six hyphen-separated octets"
                )));
            }
            octets[count] = u8::from_str_radix(part, 16).map_err(|_| {
                ModelError::InvalidArgument(format!("EUI-48 octet {part:?} is not hex"))
            })?;
            count += 1;
        }
        if count != 6 {
            return Err(ModelError::InvalidArgument(format!(
                "EUI-48 address {s:?} is not six hyphen-separated octets"
            )));
        }
        Ok(Self(octets))
    }
}

impl TryFrom<String> for Eui48 {
    type Error = ModelError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Eui48> for String {
    fn from(addr: Eui48) -> Self {
        addr.to_string()
    }
}

/// The Ethernet network interface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    dhcpv4_enabled: Property<bool>,
    sddp_enabled: Property<bool>,
    ethernet_eui48: Property<Eui48>,
    host_address: Property<IpAddr>,
    default_router_address: Property<IpAddr>,
    netmask: Property<IpAddr>,
}

impl Network {
    /// Creates an uninitialized network interface.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the DHCPv4 enabled flag.
    pub fn dhcpv4_enabled(&self) -> ModelResult<bool> {
        self.dhcpv4_enabled.get("network DHCPv4 enabled")
    }

    /// Sets the DHCPv4 enabled flag.
    pub fn set_dhcpv4_enabled(&mut self, enabled: bool) -> SetOutcome {
        self.dhcpv4_enabled.set(enabled)
    }

    /// Reads the Control4 SDDP enabled flag.
    pub fn sddp_enabled(&self) -> ModelResult<bool> {
        self.sddp_enabled.get("network SDDP enabled")
    }

    /// Sets the Control4 SDDP enabled flag.
    pub fn set_sddp_enabled(&mut self, enabled: bool) -> SetOutcome {
        self.sddp_enabled.set(enabled)
    }

    /// Reads the interface hardware address.
    pub fn ethernet_eui48(&self) -> ModelResult<Eui48> {
        self.ethernet_eui48.get("network EUI-48")
    }

    /// Sets the interface hardware address.
    pub fn set_ethernet_eui48(&mut self, address: Eui48) -> SetOutcome {
        self.ethernet_eui48.set(address)
    }

    /// Reads the host IP address.
    pub fn host_address(&self) -> ModelResult<IpAddr> {
        self.host_address.get("network host address")
    }

    /// Sets the host IP address.
    pub fn set_host_address(&mut self, address: IpAddr) -> SetOutcome {
        self.host_address.set(address)
    }

    /// Reads the default router address.
    pub fn default_router_address(&self) -> ModelResult<IpAddr> {
        self.default_router_address
            .get("network default router address")
    }

    /// Sets the default router address.
    pub fn set_default_router_address(&mut self, address: IpAddr) -> SetOutcome {
        self.default_router_address.set(address)
    }

    /// Reads the netmask.
    pub fn netmask(&self) -> ModelResult<IpAddr> {
        self.netmask.get("network netmask")
    }

    /// Sets the netmask.
    pub fn set_netmask(&mut self, netmask: IpAddr) -> SetOutcome {
        self.netmask.set(netmask)
    }
}
