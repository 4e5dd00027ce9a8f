use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::AddressError;

/// Subnet/device pair identifying a module on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeviceAddress {
    pub subnet: u8,
    pub device: u8,
}

impl DeviceAddress {
    /// Address every module on every subnet listens to
    pub const BROADCAST: Self = Self::new(0xFF, 0xFF);

    pub const fn new(subnet: u8, device: u8) -> Self {
        Self { subnet, device }
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.subnet, self.device)
    }
}

impl FromStr for DeviceAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (subnet, device) = s
            .trim()
            .split_once('.')
            .ok_or_else(|| AddressError(s.to_string()))?;

        let subnet = subnet.parse().map_err(|_| AddressError(s.to_string()))?;
        let device = device.parse().map_err(|_| AddressError(s.to_string()))?;

        Ok(Self { subnet, device })
    }
}

impl Serialize for DeviceAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DeviceAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address() {
        let address: DeviceAddress = "1.23".parse().unwrap();
        assert_eq!(address, DeviceAddress::new(1, 23));
        assert_eq!(address.to_string(), "1.23");
    }

    #[test]
    fn test_parse_invalid_address() {
        assert!("1".parse::<DeviceAddress>().is_err());
        assert!("1.256".parse::<DeviceAddress>().is_err());
        assert!("a.b".parse::<DeviceAddress>().is_err());
    }

    #[test]
    fn test_address_serde() {
        let address: DeviceAddress = serde_json::from_str("\"2.40\"").unwrap();
        assert_eq!(address, DeviceAddress::new(2, 40));
        assert_eq!(serde_json::to_string(&address).unwrap(), "\"2.40\"");
    }
}
