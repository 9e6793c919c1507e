// Copyright (c) 2025 - Cowboy AI, Inc.
//! Address invariants

use bam_device_import::domain::{
    default_subnet, is_member_of_subnet, is_valid_ipv4, is_valid_subnet, Address,
};
use proptest::prelude::*;
use std::net::Ipv4Addr;

fn any_ipv4() -> impl Strategy<Value = Ipv4Addr> {
    any::<[u8; 4]>().prop_map(Ipv4Addr::from)
}

proptest! {
    /// Every address is a member of its own default /24
    #[test]
    fn prop_default_subnet_contains_address(ip in any_ipv4()) {
        let ip = ip.to_string();
        let subnet = default_subnet(&ip).unwrap();

        prop_assert!(is_valid_subnet(&subnet));
        prop_assert!(is_member_of_subnet(&ip, &subnet));
        prop_assert!(subnet.ends_with(".0/24"));
    }

    /// A created address keeps the exact IP and subnet it was given
    #[test]
    fn prop_address_preserves_input(ip in any_ipv4(), prefix in 0u8..=32) {
        let network = ipnetwork::Ipv4Network::new(ip, prefix).unwrap();
        let subnet = format!("{}/{}", network.network(), prefix);

        let address = Address::create(&ip.to_string(), &subnet, None).unwrap();

        prop_assert_eq!(address.ip(), ip);
        prop_assert_eq!(address.subnet(), subnet.as_str());
    }

    /// Addresses outside the subnet are always rejected
    #[test]
    fn prop_outside_subnet_rejected(ip in any_ipv4(), other in any_ipv4(), prefix in 1u8..=32) {
        let network = ipnetwork::Ipv4Network::new(other, prefix).unwrap();
        prop_assume!(!network.contains(ip));
        let subnet = format!("{}/{}", network.network(), prefix);

        prop_assert!(!is_member_of_subnet(&ip.to_string(), &subnet));
        prop_assert!(Address::create(&ip.to_string(), &subnet, None).is_err());
    }

    /// Octets above 255 never validate
    #[test]
    fn prop_out_of_range_octet_rejected(a in 256u32..100_000, b in any::<u8>(), c in any::<u8>(), d in any::<u8>()) {
        let ip = format!("{}.{}.{}.{}", a, b, c, d);
        prop_assert!(!is_valid_ipv4(&ip));
        prop_assert!(Address::with_default_subnet(&ip, None).is_err());
    }
}
