//! Recording stand-in for the operating system.
#![allow(dead_code)]

use std::cell::RefCell;

use macchanger_lib::{InterfaceControl, MacAddress, MacchangerError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Down(String),
    SetAddress(String, MacAddress),
    Up(String),
    Permanent(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Down,
    SetAddress,
    Up,
}

#[derive(Default)]
pub struct FakeControl {
    pub calls: RefCell<Vec<Call>>,
    pub permanent: Option<MacAddress>,
    pub fail_at: Option<Step>,
}

impl FakeControl {
    pub fn with_permanent(mac: &str) -> Self {
        FakeControl {
            permanent: Some(mac.parse().unwrap()),
            ..Default::default()
        }
    }

    pub fn failing_at(step: Step) -> Self {
        FakeControl {
            fail_at: Some(step),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn mutations(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| !matches!(c, Call::Permanent(_)))
            .count()
    }

    fn record(&self, call: Call, step: Step, interface: &str) -> Result<(), MacchangerError> {
        self.calls.borrow_mut().push(call);
        if self.fail_at == Some(step) {
            return Err(MacchangerError::PermissionDenied {
                interface: interface.to_owned(),
                detail: "Operation not permitted".to_owned(),
            });
        }
        Ok(())
    }
}

impl InterfaceControl for FakeControl {
    fn set_down(&self, interface: &str) -> Result<(), MacchangerError> {
        self.record(Call::Down(interface.to_owned()), Step::Down, interface)
    }

    fn set_address(&self, interface: &str, mac: MacAddress) -> Result<(), MacchangerError> {
        self.record(
            Call::SetAddress(interface.to_owned(), mac),
            Step::SetAddress,
            interface,
        )
    }

    fn set_up(&self, interface: &str) -> Result<(), MacchangerError> {
        self.record(Call::Up(interface.to_owned()), Step::Up, interface)
    }

    fn permanent_address(&self, interface: &str) -> Result<MacAddress, MacchangerError> {
        self.calls
            .borrow_mut()
            .push(Call::Permanent(interface.to_owned()));
        self.permanent
            .ok_or_else(|| MacchangerError::UnsupportedInterface {
                interface: interface.to_owned(),
                detail: "Operation not supported".to_owned(),
            })
    }
}
