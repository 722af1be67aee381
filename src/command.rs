//! Backend that drives `ip` and `ethtool` as child processes.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tracing::debug;

use crate::{InterfaceControl, MacAddress, MacchangerError};

/// Runs iproute2 for link changes and ethtool for the permanent address.
#[derive(Debug, Clone)]
pub struct CommandBackend {
    ip: PathBuf,
    ethtool: PathBuf,
}

impl Default for CommandBackend {
    fn default() -> Self {
        CommandBackend::new("ip", "ethtool")
    }
}

impl CommandBackend {
    pub fn new(ip: impl Into<PathBuf>, ethtool: impl Into<PathBuf>) -> Self {
        CommandBackend {
            ip: ip.into(),
            ethtool: ethtool.into(),
        }
    }

    fn ip_link_set(&self, interface: &str, args: &[&str]) -> Result<(), MacchangerError> {
        let mut full = vec!["link", "set", "dev", interface];
        full.extend_from_slice(args);
        let command_line = describe(&self.ip, &full);

        let output = run(&self.ip, &full).map_err(|e| MacchangerError::CommandFailed {
            command: command_line.clone(),
            detail: e.to_string(),
        })?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(classify_failure(interface, &command_line, stderr.trim(), args))
    }
}

impl InterfaceControl for CommandBackend {
    fn set_down(&self, interface: &str) -> Result<(), MacchangerError> {
        self.ip_link_set(interface, &["down"])
    }

    fn set_address(&self, interface: &str, mac: MacAddress) -> Result<(), MacchangerError> {
        let mac = mac.to_string();
        self.ip_link_set(interface, &["address", mac.as_str()])
    }

    fn set_up(&self, interface: &str) -> Result<(), MacchangerError> {
        self.ip_link_set(interface, &["up"])
    }

    fn permanent_address(&self, interface: &str) -> Result<MacAddress, MacchangerError> {
        let unsupported = |detail: String| MacchangerError::UnsupportedInterface {
            interface: interface.to_owned(),
            detail,
        };
        let args = ["-P", interface];

        let output = run(&self.ethtool, &args).map_err(|e| {
            unsupported(format!("cannot run `{}`: {e}", describe(&self.ethtool, &args)))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(unsupported(stderr.trim().to_owned()));
        }

        parse_permanent_address(&String::from_utf8_lossy(&output.stdout)).map_err(unsupported)
    }
}

fn run(program: &Path, args: &[&str]) -> io::Result<Output> {
    debug!(command = %describe(program, args), "running");
    Command::new(program).args(args).output()
}

fn describe(program: &Path, args: &[&str]) -> String {
    format!("{} {}", program.display(), args.join(" "))
}

/// Map iproute2's stderr onto the error kinds callers can act on.
fn classify_failure(
    interface: &str,
    command_line: &str,
    stderr: &str,
    args: &[&str],
) -> MacchangerError {
    let detail = stderr.to_owned();

    if stderr.contains("Operation not permitted") || stderr.contains("Permission denied") {
        MacchangerError::PermissionDenied {
            interface: interface.to_owned(),
            detail,
        }
    } else if stderr.contains("Cannot find device")
        || stderr.contains("No such device")
        || stderr.contains("does not exist")
    {
        MacchangerError::InterfaceNotFound {
            interface: interface.to_owned(),
            detail,
        }
    } else if stderr.contains("Cannot assign requested address")
        || stderr.contains("invalid lladdr")
    {
        let address = match args {
            ["address", mac] => (*mac).to_owned(),
            _ => String::new(),
        };
        MacchangerError::InvalidAddress {
            address,
            reason: detail,
        }
    } else {
        MacchangerError::CommandFailed {
            command: command_line.to_owned(),
            detail,
        }
    }
}

/// Extract the address from `ethtool -P` output
/// (`Permanent address: 00:11:22:33:44:55`).
fn parse_permanent_address(stdout: &str) -> Result<MacAddress, String> {
    let value = stdout
        .lines()
        .find_map(|line| line.split_once("Permanent address:"))
        .map(|(_, value)| value.trim())
        .ok_or_else(|| format!("unexpected ethtool output `{}`", stdout.trim()))?;

    let mac = value.parse::<MacAddress>().map_err(|e| e.to_string())?;
    if mac.is_unspecified() {
        return Err("the interface reports no permanent address".to_owned());
    }
    Ok(mac)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ethtool_output() {
        let mac = parse_permanent_address("Permanent address: 3c:7c:3f:AA:10:02\n").unwrap();
        assert_eq!(mac.to_string(), "3c:7c:3f:aa:10:02");
    }

    #[test]
    fn all_zero_permanent_address_is_unsupported() {
        let err = parse_permanent_address("Permanent address: 00:00:00:00:00:00\n").unwrap_err();
        assert!(err.contains("no permanent address"));
    }

    #[test]
    fn unexpected_ethtool_output_is_rejected() {
        assert!(parse_permanent_address("").is_err());
        assert!(parse_permanent_address("Permanent address: 00:11:22").is_err());
        assert!(parse_permanent_address("Operation not supported").is_err());
    }

    #[test]
    fn classifies_permission_failures() {
        let err = classify_failure(
            "eth0",
            "ip link set dev eth0 down",
            "RTNETLINK answers: Operation not permitted",
            &["down"],
        );
        assert!(matches!(
            err,
            MacchangerError::PermissionDenied { ref interface, .. } if interface == "eth0"
        ));
        assert!(err.to_string().contains("re-run as root"));
    }

    #[test]
    fn classifies_missing_interfaces() {
        let err = classify_failure(
            "eth9",
            "ip link set dev eth9 down",
            "Cannot find device \"eth9\"",
            &["down"],
        );
        assert!(matches!(err, MacchangerError::InterfaceNotFound { .. }));
    }

    #[test]
    fn classifies_rejected_addresses() {
        let err = classify_failure(
            "eth0",
            "ip link set dev eth0 address 03:00:00:00:00:01",
            "RTNETLINK answers: Cannot assign requested address",
            &["address", "03:00:00:00:00:01"],
        );
        match err {
            MacchangerError::InvalidAddress { address, .. } => {
                assert_eq!(address, "03:00:00:00:00:01")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn other_failures_keep_the_command_and_stderr() {
        let err = classify_failure("eth0", "ip link set dev eth0 up", "boom", &["up"]);
        match err {
            MacchangerError::CommandFailed { command, detail } => {
                assert_eq!(command, "ip link set dev eth0 up");
                assert_eq!(detail, "boom");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn missing_ethtool_is_unsupported() {
        let backend = CommandBackend::new("/nonexistent/ip", "/nonexistent/ethtool");
        let err = backend.permanent_address("eth0").unwrap_err();
        assert!(matches!(err, MacchangerError::UnsupportedInterface { .. }));
    }

    #[test]
    fn failing_ethtool_is_unsupported() {
        let backend = CommandBackend::new("/nonexistent/ip", "/bin/false");
        let err = backend.permanent_address("eth0").unwrap_err();
        assert!(matches!(err, MacchangerError::UnsupportedInterface { .. }));
    }

    #[test]
    fn silent_ethtool_is_unsupported() {
        let backend = CommandBackend::new("/nonexistent/ip", "/bin/true");
        let err = backend.permanent_address("eth0").unwrap_err();
        assert!(matches!(err, MacchangerError::UnsupportedInterface { .. }));
    }

    #[test]
    fn missing_ip_is_a_command_failure() {
        let backend = CommandBackend::new("/nonexistent/ip", "/nonexistent/ethtool");
        let err = backend.set_down("eth0").unwrap_err();
        assert!(matches!(err, MacchangerError::CommandFailed { .. }));
    }
}
