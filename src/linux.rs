use crate::{Interface, InterfaceControl, MacAddress, MacchangerError};
use nix::{
    errno::Errno,
    ifaddrs::{getifaddrs, InterfaceAddress},
    ioctl_read_bad, ioctl_readwrite_bad, ioctl_write_ptr_bad,
    libc::{
        self, c_char, c_short, sockaddr, ARPHRD_ETHER, IFF_UP, IFNAMSIZ, SIOCGIFFLAGS,
        SIOCSIFFLAGS, SIOCSIFHWADDR,
    },
    sys::socket::{socket, AddressFamily, SockFlag, SockProtocol, SockType},
};
use pci_ids::Device;
use std::{
    collections::BTreeMap,
    fs, io, mem,
    os::fd::{AsRawFd, OwnedFd},
    path::Path,
};
use tracing::debug;

const SIOCETHTOOL: libc::c_ulong = 0x8946;
const ETHTOOL_GPERMADDR: u32 = 0x20;
const MAX_ADDR_LEN: usize = 32;

ioctl_read_bad!(get_ifr_flags, SIOCGIFFLAGS, libc::ifreq);
ioctl_write_ptr_bad!(set_ifr_flags, SIOCSIFFLAGS, libc::ifreq);
ioctl_write_ptr_bad!(set_ifr_hwaddr, SIOCSIFHWADDR, libc::ifreq);
ioctl_readwrite_bad!(ethtool_request, SIOCETHTOOL, libc::ifreq);

/// `struct ethtool_perm_addr` with room for the largest hardware address.
#[allow(dead_code)]
#[repr(C)]
struct EthtoolPermAddr {
    cmd: u32,
    size: u32,
    data: [u8; MAX_ADDR_LEN],
}

/// Talks to the kernel through interface ioctls on a UDP control socket.
#[derive(Debug, Clone, Copy, Default)]
pub struct IoctlBackend;

impl IoctlBackend {
    fn change_interface_active(&self, interface: &str, active: bool) -> Result<(), MacchangerError> {
        let socket = get_socket()?;
        let mut req = ifreq_for(interface)?;

        // SAFETY: `req` is a zeroed ifreq carrying a NUL-terminated name.
        unsafe { get_ifr_flags(socket.as_raw_fd(), &mut req) }
            .map_err(|e| errno_error(e, interface, "SIOCGIFFLAGS"))?;

        // SAFETY: SIOCGIFFLAGS succeeded, so the flags member is initialised.
        let mut flags = unsafe { req.ifr_ifru.ifru_flags };
        match active {
            false => flags &= !(IFF_UP as c_short),
            true => flags |= IFF_UP as c_short,
        }
        req.ifr_ifru.ifru_flags = flags;

        debug!(interface, active, "SIOCSIFFLAGS");
        // SAFETY: `req` is a valid ifreq for the duration of the call.
        unsafe { set_ifr_flags(socket.as_raw_fd(), &req) }
            .map_err(|e| errno_error(e, interface, "SIOCSIFFLAGS"))?;
        Ok(())
    }
}

impl InterfaceControl for IoctlBackend {
    fn set_down(&self, interface: &str) -> Result<(), MacchangerError> {
        self.change_interface_active(interface, false)
    }

    fn set_address(&self, interface: &str, mac: MacAddress) -> Result<(), MacchangerError> {
        let socket = get_socket()?;
        let mut req = ifreq_for(interface)?;

        let mut sa_data = [0 as c_char; 14];
        for (dst, src) in sa_data.iter_mut().zip(mac.octets()) {
            *dst = src as c_char;
        }
        req.ifr_ifru.ifru_hwaddr = sockaddr {
            sa_family: ARPHRD_ETHER,
            sa_data,
        };

        debug!(interface, %mac, "SIOCSIFHWADDR");
        // SAFETY: `req` is a valid ifreq for the duration of the call.
        unsafe { set_ifr_hwaddr(socket.as_raw_fd(), &req) }.map_err(|e| match e {
            Errno::EADDRNOTAVAIL | Errno::EINVAL => MacchangerError::InvalidAddress {
                address: mac.to_string(),
                reason: format!("rejected by the kernel: {}", e.desc()),
            },
            e => errno_error(e, interface, "SIOCSIFHWADDR"),
        })?;
        Ok(())
    }

    fn set_up(&self, interface: &str) -> Result<(), MacchangerError> {
        self.change_interface_active(interface, true)
    }

    fn permanent_address(&self, interface: &str) -> Result<MacAddress, MacchangerError> {
        let unsupported = |detail: String| MacchangerError::UnsupportedInterface {
            interface: interface.to_owned(),
            detail,
        };

        let mut req = ifreq_for(interface).map_err(|e| unsupported(e.to_string()))?;
        let socket = get_socket().map_err(|e| unsupported(e.to_string()))?;
        let mut perm = EthtoolPermAddr {
            cmd: ETHTOOL_GPERMADDR,
            size: MAX_ADDR_LEN as u32,
            data: [0; MAX_ADDR_LEN],
        };
        req.ifr_ifru.ifru_data = (&mut perm as *mut EthtoolPermAddr).cast::<c_char>();

        debug!(interface, "SIOCETHTOOL ETHTOOL_GPERMADDR");
        // SAFETY: `ifru_data` points at `perm`, which outlives the call and
        // has room for MAX_ADDR_LEN bytes as announced in `size`.
        unsafe { ethtool_request(socket.as_raw_fd(), &mut req) }
            .map_err(|e| unsupported(format!("ETHTOOL_GPERMADDR: {}", e.desc())))?;

        if perm.size != 6 {
            return Err(unsupported(format!(
                "reports a {}-byte hardware address",
                perm.size
            )));
        }
        let mut octets = [0u8; 6];
        octets.copy_from_slice(&perm.data[..6]);
        let mac = MacAddress::from(octets);
        if mac.is_unspecified() {
            return Err(unsupported(
                "the interface reports no permanent address".to_owned(),
            ));
        }
        Ok(mac)
    }
}

fn ifreq_for(interface: &str) -> Result<libc::ifreq, MacchangerError> {
    if interface.is_empty() || interface.len() >= IFNAMSIZ || interface.contains('\0') {
        return Err(MacchangerError::InterfaceNotFound {
            interface: interface.to_owned(),
            detail: format!("not a valid interface name (1 to {} bytes)", IFNAMSIZ - 1),
        });
    }

    // SAFETY: ifreq is plain old data and all-zero is a valid value.
    let mut req: libc::ifreq = unsafe { mem::zeroed() };
    for (dst, src) in req.ifr_name.iter_mut().zip(interface.bytes()) {
        *dst = src as c_char;
    }
    Ok(req)
}

fn errno_error(errno: Errno, interface: &str, request: &str) -> MacchangerError {
    match errno {
        Errno::ENODEV | Errno::ENXIO => MacchangerError::InterfaceNotFound {
            interface: interface.to_owned(),
            detail: format!("{request}: {}", errno.desc()),
        },
        Errno::EPERM | Errno::EACCES => MacchangerError::PermissionDenied {
            interface: interface.to_owned(),
            detail: format!("{request}: {}", errno.desc()),
        },
        _ => MacchangerError::System {
            context: format!("{request} on `{interface}` failed"),
            source: io::Error::from(errno),
        },
    }
}

fn get_socket() -> Result<OwnedFd, MacchangerError> {
    socket(
        AddressFamily::Inet,
        SockType::Datagram,
        SockFlag::empty(),
        Some(SockProtocol::Udp),
    )
    .map_err(|e| MacchangerError::System {
        context: "cannot open a control socket".to_owned(),
        source: io::Error::from(e),
    })
}

/// Interfaces with a non-zero link-layer address, sorted by name.
pub fn list_interfaces_linux() -> Result<Vec<Interface>, MacchangerError> {
    let addrs = getifaddrs().map_err(|e| MacchangerError::System {
        context: "cannot enumerate network interfaces".to_owned(),
        source: io::Error::from(e),
    })?;

    let mut interfaces = BTreeMap::new();
    for addr in addrs {
        if let Some(interface) = link_interface(&addr) {
            interfaces.entry(interface.name.clone()).or_insert(interface);
        }
    }
    Ok(interfaces.into_values().collect())
}

fn link_interface(addr: &InterfaceAddress) -> Option<Interface> {
    let octets = addr.address.as_ref()?.as_link_addr()?.addr()?;
    if octets.iter().all(|b| *b == 0) {
        return None;
    }

    Some(Interface {
        name: addr.interface_name.clone(),
        mac: MacAddress::from(octets),
        adapter: adapter_name(&addr.interface_name),
    })
}

fn adapter_name(interface: &str) -> String {
    let device_dir = Path::new("/sys/class/net").join(interface).join("device");
    if !device_dir.exists() {
        return "Virtual adapter".to_owned();
    }

    let vendor_id = read_pci_id(&device_dir.join("vendor"));
    let device_id = read_pci_id(&device_dir.join("device"));
    match (vendor_id, device_id) {
        (Some(vendor_id), Some(device_id)) => Device::from_vid_pid(vendor_id, device_id)
            .map(|device| format!("{} {}", device.vendor().name(), device.name()))
            .unwrap_or_else(|| format!("Unknown adapter ({vendor_id:04x}:{device_id:04x})")),
        _ => "Unknown adapter".to_owned(),
    }
}

fn read_pci_id(path: &Path) -> Option<u16> {
    let raw = fs::read_to_string(path).ok()?;
    let raw = raw.trim_end();
    u16::from_str_radix(raw.strip_prefix("0x").unwrap_or(raw), 16).ok()
}
