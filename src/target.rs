//! Target host parsing. The address must be a dotted-quad IPv4 literal; any
//! other syntax is an invocation error and the run never starts.
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid target address {0:?}: expected four dot-separated octets (0-255)")]
    Malformed(String),
}

/// The host under test together with the directory domain used to derive a
/// search base when the server does not advertise one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub address: Ipv4Addr,
    pub domain: String,
}

impl Target {
    pub fn new(address: Ipv4Addr, domain: &str) -> Self {
        Self {
            address,
            domain: domain.trim().to_string(),
        }
    }

    pub fn parse(address: &str, domain: &str) -> Result<Self, AddressError> {
        Ok(Self::new(parse_ipv4(address)?, domain))
    }

    pub fn ip(&self) -> IpAddr {
        IpAddr::V4(self.address)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.address, self.domain)
    }
}

/// Strict dotted-quad parser: exactly four components, each made only of ASCII
/// digits and no larger than 255.
pub fn parse_ipv4(input: &str) -> Result<Ipv4Addr, AddressError> {
    let malformed = || AddressError::Malformed(input.to_string());
    let parts: Vec<&str> = input.split('.').collect();
    if parts.len() != 4 {
        return Err(malformed());
    }
    let mut octets = [0u8; 4];
    for (slot, part) in octets.iter_mut().zip(&parts) {
        if part.is_empty() || part.len() > 3 || !part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        let value: u16 = part.parse().map_err(|_| malformed())?;
        *slot = u8::try_from(value).map_err(|_| malformed())?;
    }
    Ok(Ipv4Addr::from(octets))
}
