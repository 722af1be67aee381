//! Command-line surface shared by the binary and its tests.

use std::io::Write;
use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};

use crate::{change_mac, CommandBackend, InterfaceControl, MacAddress, MacchangerError, Mode};

#[derive(Parser, Debug)]
#[command(name = "macchanger", version, about, long_about = None)]
pub struct Args {
    /// Network interface to reconfigure
    #[arg(short, long, required_unless_present = "list")]
    pub interface: Option<String>,

    /// MAC address to apply; a random local address is used when omitted
    #[arg(short, long, conflicts_with = "reset")]
    pub mac: Option<MacAddress>,

    /// Restore the permanent hardware address
    #[arg(short, long)]
    pub reset: bool,

    /// List interfaces and their current addresses
    #[arg(short, long, conflicts_with_all = ["interface", "mac", "reset"])]
    pub list: bool,

    /// How to talk to the operating system
    #[arg(long, value_enum, env = "MACCHANGER_BACKEND", default_value_t = Backend::Command)]
    pub backend: Backend,

    /// iproute2 `ip` binary used by the command backend
    #[arg(long, env = "MACCHANGER_IP", default_value = "ip")]
    pub ip_path: PathBuf,

    /// `ethtool` binary used by the command backend
    #[arg(long, env = "MACCHANGER_ETHTOOL", default_value = "ethtool")]
    pub ethtool_path: PathBuf,

    /// Increase verbosity (-v info, -vv debug, -vvv trace). Default is warn.
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Run `ip` and `ethtool`
    Command,
    /// Issue interface ioctls directly (Linux only)
    Ioctl,
}

impl Args {
    pub fn mode(&self) -> Mode {
        if self.reset {
            Mode::Reset
        } else {
            Mode::Apply
        }
    }

    /// Build the backend selected on the command line.
    pub fn control(&self) -> Result<Box<dyn InterfaceControl>, MacchangerError> {
        match self.backend {
            Backend::Command => Ok(Box::new(CommandBackend::new(
                self.ip_path.clone(),
                self.ethtool_path.clone(),
            ))),
            #[cfg(target_os = "linux")]
            Backend::Ioctl => Ok(Box::new(crate::IoctlBackend)),
            #[cfg(not(target_os = "linux"))]
            Backend::Ioctl => Err(MacchangerError::UnsupportedPlatform),
        }
    }
}

/// Carry out one change request and print the resulting address to `out`.
///
/// Nothing is written to `out` unless the whole sequence succeeded.
pub fn run<C, R, W>(
    args: &Args,
    control: &C,
    rng: &mut R,
    out: &mut W,
) -> Result<MacAddress, MacchangerError>
where
    C: InterfaceControl + ?Sized,
    R: rand::Rng + ?Sized,
    W: Write + ?Sized,
{
    let interface = args
        .interface
        .as_deref()
        .ok_or_else(|| MacchangerError::Usage("an interface is required".to_owned()))?;

    let mac = change_mac(control, rng, interface, args.mac, args.mode())?;

    writeln!(out, "{mac}").map_err(|e| MacchangerError::System {
        context: "cannot write to stdout".to_owned(),
        source: e,
    })?;
    Ok(mac)
}
