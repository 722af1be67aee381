use rand::Rng;

use crate::mac::{MacAddress, LOCALLY_ADMINISTERED_BIT, MULTICAST_BIT};

/// Random locally administered unicast address from the thread RNG.
pub fn generate_random_mac() -> MacAddress {
    generate_random_mac_with(&mut rand::thread_rng())
}

/// Draws six random octets, then forces the first one to be locally
/// administered and unicast. This is the usual randomization policy, not a
/// protocol requirement. Uniqueness on the link is not checked.
pub fn generate_random_mac_with<R: Rng + ?Sized>(rng: &mut R) -> MacAddress {
    let mut mac = [0u8; 6];

    rng.fill(&mut mac);

    mac[0] = (mac[0] & !MULTICAST_BIT) | LOCALLY_ADMINISTERED_BIT;

    MacAddress::from(mac)
}
