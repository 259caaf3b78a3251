// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! A total order over [`IpAddr`] in which the v4 and v6 address spaces never
//! interleave: every v4 key compares less than every v6 key, and same-family
//! keys compare by their big-endian integer value.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IpKey {
    V4(u32),
    V6(u128),
}

impl IpKey {
    pub fn from_addr(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(v4) => IpKey::V4(u32::from(v4)),
            IpAddr::V6(v6) => IpKey::V6(u128::from(v6)),
        }
    }

    pub fn to_addr(self) -> IpAddr {
        match self {
            IpKey::V4(bits) => IpAddr::V4(Ipv4Addr::from(bits)),
            IpKey::V6(bits) => IpAddr::V6(Ipv6Addr::from(bits)),
        }
    }
}

impl From<IpAddr> for IpKey {
    fn from(addr: IpAddr) -> Self {
        IpKey::from_addr(addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v4_always_sorts_before_v6() {
        let v4: IpKey = "255.255.255.255".parse::<IpAddr>().expect("valid").into();
        let v6: IpKey = "::".parse::<IpAddr>().expect("valid").into();
        assert!(v4 < v6);
    }

    #[test]
    fn same_family_orders_by_integer_value() {
        let a: IpKey = "10.0.0.1".parse::<IpAddr>().expect("valid").into();
        let b: IpKey = "10.0.0.2".parse::<IpAddr>().expect("valid").into();
        assert!(a < b);
    }
}
