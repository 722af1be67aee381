pub mod cli;
mod command;
#[cfg(target_os = "linux")]
mod linux;
mod mac;
mod util;

use thiserror::Error;
use tracing::{debug, info};

pub use command::CommandBackend;
#[cfg(target_os = "linux")]
pub use linux::IoctlBackend;
pub use mac::{MacAddress, LOCALLY_ADMINISTERED_BIT, MULTICAST_BIT};
pub use util::{generate_random_mac, generate_random_mac_with};

#[derive(Error, Debug)]
pub enum MacchangerError {
    #[error("invalid MAC address `{address}`: {reason}")]
    InvalidAddress { address: String, reason: String },
    #[error("interface `{interface}` not found: {detail}")]
    InterfaceNotFound { interface: String, detail: String },
    #[error(
        "permission denied reconfiguring `{interface}`: {detail} \
         (re-run as root or with CAP_NET_ADMIN)"
    )]
    PermissionDenied { interface: String, detail: String },
    #[error("cannot determine the permanent MAC address of `{interface}`: {detail}")]
    UnsupportedInterface { interface: String, detail: String },
    #[error("usage error: {0}")]
    Usage(String),
    #[error("`{command}` failed: {detail}")]
    CommandFailed { command: String, detail: String },
    #[error("{context}")]
    System {
        context: String,
        #[source]
        source: std::io::Error,
    },
    #[error("This platform is not supported")]
    UnsupportedPlatform,
}

/// What a request does with the interface's address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Apply the given address, or a freshly generated one.
    Apply,
    /// Restore the address burned into the hardware.
    Reset,
}

/// Operating-system operations needed to change an interface's address.
///
/// Every method blocks until the OS has answered. Nothing is locked: two
/// processes reconfiguring the same interface race, and the last down/up
/// cycle wins.
pub trait InterfaceControl {
    /// Administratively bring the interface down.
    fn set_down(&self, interface: &str) -> Result<(), MacchangerError>;

    /// Program `mac` as the interface's hardware address.
    fn set_address(&self, interface: &str, mac: MacAddress) -> Result<(), MacchangerError>;

    /// Administratively bring the interface up.
    fn set_up(&self, interface: &str) -> Result<(), MacchangerError>;

    /// Factory-programmed address, as opposed to the configured one.
    ///
    /// Fails with [`MacchangerError::UnsupportedInterface`] whenever no valid
    /// answer can be obtained.
    fn permanent_address(&self, interface: &str) -> Result<MacAddress, MacchangerError>;
}

impl<T: InterfaceControl + ?Sized> InterfaceControl for Box<T> {
    fn set_down(&self, interface: &str) -> Result<(), MacchangerError> {
        (**self).set_down(interface)
    }

    fn set_address(&self, interface: &str, mac: MacAddress) -> Result<(), MacchangerError> {
        (**self).set_address(interface, mac)
    }

    fn set_up(&self, interface: &str) -> Result<(), MacchangerError> {
        (**self).set_up(interface)
    }

    fn permanent_address(&self, interface: &str) -> Result<MacAddress, MacchangerError> {
        (**self).permanent_address(interface)
    }
}

/// Change the address of `interface` and return the address that was applied.
///
/// In [`Mode::Apply`] a missing `mac` is replaced by one drawn from `rng`. In
/// [`Mode::Reset`] the permanent address is queried first and no link change
/// happens if that fails; passing a `mac` together with `Reset` is a usage
/// error.
///
/// The interface is brought down, readdressed, then brought up. The first
/// failing step aborts the sequence, so a failed readdress leaves the interface
/// down. Nothing is rolled back.
pub fn change_mac<C, R>(
    control: &C,
    rng: &mut R,
    interface: &str,
    mac: Option<MacAddress>,
    mode: Mode,
) -> Result<MacAddress, MacchangerError>
where
    C: InterfaceControl + ?Sized,
    R: rand::Rng + ?Sized,
{
    let mac = match (mode, mac) {
        (Mode::Apply, Some(mac)) => mac,
        (Mode::Apply, None) => {
            let mac = generate_random_mac_with(rng);
            debug!(%mac, "generated random address");
            mac
        }
        (Mode::Reset, None) => {
            let mac = control.permanent_address(interface)?;
            debug!(%mac, interface, "found permanent address");
            mac
        }
        (Mode::Reset, Some(_)) => {
            return Err(MacchangerError::Usage(
                "a MAC address cannot be combined with a reset".to_owned(),
            ))
        }
    };

    debug!(interface, "bringing interface down");
    control.set_down(interface)?;

    debug!(interface, %mac, "setting hardware address");
    control.set_address(interface, mac)?;

    debug!(interface, "bringing interface up");
    control.set_up(interface)?;

    info!(interface, %mac, ?mode, "MAC address changed");
    Ok(mac)
}

/// An interface carrying a link-layer address.
#[derive(Debug, Clone)]
pub struct Interface {
    pub name: String,
    pub mac: MacAddress,
    /// Adapter model from the PCI database, or a placeholder for virtual devices.
    pub adapter: String,
}

pub fn list_interfaces() -> Result<Vec<Interface>, MacchangerError> {
    #[cfg(target_os = "linux")]
    {
        linux::list_interfaces_linux()
    }

    #[cfg(not(target_os = "linux"))]
    {
        Err(MacchangerError::UnsupportedPlatform)
    }
}
