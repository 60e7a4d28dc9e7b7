//! This module provides ways to tweak in-memory collaborators, so that they can return errors on some tests

use crate::error::{Error, Result};

/// This stores some behaviour tweaks, that describe how a mocked instance will behave during a given test
///
/// So that a functions fails _n_ times after _m_ initial successes, set `(m, n)` for the suited parameter
#[derive(Default, Clone, Debug)]
pub struct MockBehaviour {
    /// If this is true, every action will be allowed
    pub is_suspended: bool,

    // From the RemoteStore trait
    pub get_behaviour: (u32, u32),
    pub set_behaviour: (u32, u32),
    pub update_behaviour: (u32, u32),
    pub subscribe_behaviour: (u32, u32),

    // From the AuthProvider trait
    pub sign_up_behaviour: (u32, u32),
    pub sign_in_behaviour: (u32, u32),
}

impl MockBehaviour {
    pub fn new() -> Self {
        Self::default()
    }

    /// All items will fail at once, for `n_fails` times
    pub fn fail_now(n_fails: u32) -> Self {
        Self {
            is_suspended: false,
            get_behaviour: (0, n_fails),
            set_behaviour: (0, n_fails),
            update_behaviour: (0, n_fails),
            subscribe_behaviour: (0, n_fails),
            sign_up_behaviour: (0, n_fails),
            sign_in_behaviour: (0, n_fails),
        }
    }

    /// Suspend this mock behaviour until you call `resume`
    pub fn suspend(&mut self) {
        self.is_suspended = true;
    }
    /// Make this behaviour active again
    pub fn resume(&mut self) {
        self.is_suspended = false;
    }

    pub fn can_get(&mut self) -> Result<()> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.get_behaviour, "get")
    }
    pub fn can_set(&mut self) -> Result<()> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.set_behaviour, "set")
    }
    pub fn can_update(&mut self) -> Result<()> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.update_behaviour, "update")
    }
    pub fn can_subscribe(&mut self) -> Result<()> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.subscribe_behaviour, "subscribe")
    }
    pub fn can_sign_up(&mut self) -> Result<()> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.sign_up_behaviour, "sign_up").map_err(|err| Error::Auth(err.to_string()))
    }
    pub fn can_sign_in(&mut self) -> Result<()> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.sign_in_behaviour, "sign_in").map_err(|err| Error::Auth(err.to_string()))
    }
}


/// Return Ok(()) in case the value is `(1+, _)` or `(_, 0)`, or return Err and decrement otherwise
fn decrement(value: &mut (u32, u32), descr: &str) -> Result<()> {
    let remaining_successes = value.0;
    let remaining_failures = value.1;

    if remaining_successes > 0 {
        value.0 -= 1;
        log::debug!("Mock behaviour: allowing a {} ({:?})", descr, value);
        Ok(())
    } else if remaining_failures > 0 {
        value.1 -= 1;
        log::debug!("Mock behaviour: failing a {} ({:?})", descr, value);
        Err(Error::Persistence(format!("Mocked behaviour requires this {} to fail this time. ({:?})", descr, value)))
    } else {
        log::debug!("Mock behaviour: allowing a {} ({:?})", descr, value);
        Ok(())
    }
}
