// In-memory relay boards standing in for libusb. A board answers the FTDI bit-bang requests
// and the HID relay feature reports, and keeps enough bookkeeping for tests to check the
// claim discipline.
use crate::device::base::{DeviceOpener, DeviceSession};
use parking_lot::Mutex;
use relay_types::DeviceIdentity;
use std::collections::HashMap;
use std::sync::Arc;
use std::thread::sleep;
use std::time::Duration;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BoardStats {
    pub opens: usize,
    pub claims: usize,
    pub busy_rejections: usize,
    pub releases: usize,
    pub closes: usize,
}

#[derive(Default)]
struct BoardState {
    port: u8,
    bitmode: Option<u16>,
    hid_relays: u8,
    claimed: bool,
    always_busy: bool,
    busy_for: usize,
    short_reports: bool,
    dropped_writes: bool,
    write_delay: Duration,
    fail_open: Option<rusb::Error>,
    fail_claim: Option<rusb::Error>,
    fail_release: Option<rusb::Error>,
    stats: BoardStats,
}

#[derive(Clone, Default)]
pub struct MockBoard {
    state: Arc<Mutex<BoardState>>,
}

impl MockBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn port(&self) -> u8 {
        self.state.lock().port
    }

    pub fn set_port(&self, value: u8) {
        self.state.lock().port = value;
    }

    pub fn bitmode(&self) -> Option<u16> {
        self.state.lock().bitmode
    }

    pub fn hid_relays(&self) -> u8 {
        self.state.lock().hid_relays
    }

    pub fn set_hid_relays(&self, value: u8) {
        self.state.lock().hid_relays = value;
    }

    /// Reject the next `count` claims with `Busy`.
    pub fn busy_for(&self, count: usize) {
        self.state.lock().busy_for = count;
    }

    pub fn always_busy(&self, busy: bool) {
        self.state.lock().always_busy = busy;
    }

    pub fn short_reports(&self, short: bool) {
        self.state.lock().short_reports = short;
    }

    /// Bulk writes are accepted but report zero bytes transferred.
    pub fn dropped_writes(&self, dropped: bool) {
        self.state.lock().dropped_writes = dropped;
    }

    pub fn write_delay(&self, delay: Duration) {
        self.state.lock().write_delay = delay;
    }

    pub fn fail_open_with(&self, error: rusb::Error) {
        self.state.lock().fail_open = Some(error);
    }

    pub fn fail_claim_with(&self, error: rusb::Error) {
        self.state.lock().fail_claim = Some(error);
    }

    pub fn fail_release_with(&self, error: rusb::Error) {
        self.state.lock().fail_release = Some(error);
    }

    pub fn is_claimed(&self) -> bool {
        self.state.lock().claimed
    }

    pub fn stats(&self) -> BoardStats {
        self.state.lock().stats
    }
}

#[derive(Default)]
pub struct MockBus {
    boards: Mutex<HashMap<DeviceIdentity, MockBoard>>,
}

impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&self, identity: DeviceIdentity) -> MockBoard {
        self.boards.lock().entry(identity).or_default().clone()
    }
}

impl DeviceOpener for MockBus {
    fn open(&self, identity: DeviceIdentity) -> rusb::Result<Box<dyn DeviceSession>> {
        let board = self
            .boards
            .lock()
            .get(&identity)
            .cloned()
            .ok_or(rusb::Error::NoDevice)?;

        {
            let mut state = board.state.lock();
            if let Some(error) = state.fail_open {
                return Err(error);
            }
            state.stats.opens += 1;
        }

        Ok(Box::new(MockSession {
            board,
            claimed: false,
        }))
    }
}

struct MockSession {
    board: MockBoard,
    claimed: bool,
}

impl MockSession {
    fn check_claimed(&self) -> rusb::Result<()> {
        match self.claimed {
            true => Ok(()),
            false => Err(rusb::Error::Access),
        }
    }
}

impl DeviceSession for MockSession {
    fn claim_interface(&mut self, _interface: u8) -> rusb::Result<()> {
        let mut state = self.board.state.lock();
        state.stats.claims += 1;

        if state.always_busy || state.busy_for > 0 || state.claimed {
            state.busy_for = state.busy_for.saturating_sub(1);
            state.stats.busy_rejections += 1;
            return Err(rusb::Error::Busy);
        }
        if let Some(error) = state.fail_claim {
            return Err(error);
        }

        state.claimed = true;
        self.claimed = true;
        Ok(())
    }

    fn release_interface(&mut self, _interface: u8) -> rusb::Result<()> {
        self.check_claimed()?;

        let mut state = self.board.state.lock();
        state.claimed = false;
        state.stats.releases += 1;
        self.claimed = false;

        match state.fail_release {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn read_control(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
        _index: u16,
        buf: &mut [u8],
        _timeout: Duration,
    ) -> rusb::Result<usize> {
        self.check_claimed()?;
        let state = self.board.state.lock();

        match (request_type, request) {
            // FTDI READ_PINS
            (0xc0, 0x0c) => {
                let byte = buf.first_mut().ok_or(rusb::Error::Overflow)?;
                *byte = state.port;
                Ok(1)
            }

            // HID GET_REPORT (feature)
            (0xa0, 0x01) if value == 0x0300 => {
                let length = match state.short_reports {
                    true => 4,
                    false => 8,
                }
                .min(buf.len());

                let mut report = [0u8; 8];
                report[7] = state.hid_relays;
                buf[..length].copy_from_slice(&report[..length]);
                Ok(length)
            }
            _ => Err(rusb::Error::NotSupported),
        }
    }

    fn write_control(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
        _index: u16,
        data: &[u8],
        _timeout: Duration,
    ) -> rusb::Result<usize> {
        self.check_claimed()?;
        let mut state = self.board.state.lock();

        match (request_type, request) {
            // FTDI SET_BITMODE
            (0x40, 0x0b) => {
                state.bitmode = Some(value);
                Ok(0)
            }

            // HID SET_REPORT (feature)
            (0x20, 0x09) if value == 0x0300 => {
                let (command, channel) = match data {
                    [command, channel, ..] => (*command, *channel),
                    _ => return Err(rusb::Error::InvalidParam),
                };
                if !(1..=8).contains(&channel) {
                    return Err(rusb::Error::InvalidParam);
                }

                let mask = 1 << (channel - 1);
                match command {
                    0xff => state.hid_relays |= mask,
                    0xfd => state.hid_relays &= !mask,
                    _ => return Err(rusb::Error::InvalidParam),
                }
                Ok(data.len())
            }
            _ => Err(rusb::Error::NotSupported),
        }
    }

    fn write_bulk(&mut self, endpoint: u8, data: &[u8], _timeout: Duration) -> rusb::Result<usize> {
        self.check_claimed()?;

        // Sleep outside the lock, a slow board must not stall its neighbours.
        let delay = self.board.state.lock().write_delay;
        if !delay.is_zero() {
            sleep(delay);
        }

        let mut state = self.board.state.lock();
        if endpoint != 0x02 {
            return Err(rusb::Error::NotFound);
        }
        if state.dropped_writes {
            return Ok(0);
        }
        if let Some(last) = data.last() {
            state.port = *last;
        }
        Ok(data.len())
    }
}

impl Drop for MockSession {
    fn drop(&mut self) {
        let mut state = self.board.state.lock();
        if self.claimed {
            // Closing a handle implicitly drops its claim, same as libusb.
            state.claimed = false;
        }
        state.stats.closes += 1;
    }
}
