//! Raw kernel input events as read from `/dev/input/event*`.
//!
//! The adjustment pipeline mutates these in place (including the timestamp
//! words), so the crate owns the struct layout instead of wrapping a
//! higher-level evdev type.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub const INPUT_EVENT_SIZE_32: usize = 16;
pub const INPUT_EVENT_SIZE_64: usize = 24;

pub const EV_SYN: u16 = 0x00;
pub const EV_KEY: u16 = 0x01;
pub const EV_ABS: u16 = 0x03;
pub const EV_MSC: u16 = 0x04;
pub const SYN_REPORT: u16 = 0;

pub const ABS_X: u16 = 0x00;
pub const ABS_Y: u16 = 0x01;
pub const ABS_PRESSURE: u16 = 0x18;
pub const ABS_MT_SLOT: u16 = 0x2f;
pub const ABS_MT_POSITION_X: u16 = 0x35;
pub const ABS_MT_POSITION_Y: u16 = 0x36;
pub const ABS_MT_TRACKING_ID: u16 = 0x39;

pub const MSC_RAW: u16 = 0x0a;

// Raw gravity-sensor codes reported by the NTX kernels in MSC_RAW events.
pub const MSC_RAW_GSENSOR_PORTRAIT_DOWN: i32 = 0x17;
pub const MSC_RAW_GSENSOR_PORTRAIT_UP: i32 = 0x18;
pub const MSC_RAW_GSENSOR_LANDSCAPE_RIGHT: i32 = 0x19;
pub const MSC_RAW_GSENSOR_LANDSCAPE_LEFT: i32 = 0x1a;
pub const MSC_RAW_GSENSOR_BACK: i32 = 0x1b;
pub const MSC_RAW_GSENSOR_FRONT: i32 = 0x1c;

/// Event timestamp, seconds + microseconds, as in `struct timeval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventTime {
    pub sec: i64,
    pub usec: i64,
}

impl EventTime {
    pub fn new(sec: i64, usec: i64) -> Self {
        Self { sec, usec }
    }

    /// Current wall-clock time.
    pub fn now() -> Self {
        Self::from_system(SystemTime::now())
    }

    pub fn from_system(t: SystemTime) -> Self {
        let d = t.duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO);
        Self {
            sec: d.as_secs() as i64,
            usec: d.subsec_micros() as i64,
        }
    }

    pub fn as_duration(&self) -> Duration {
        Duration::new(self.sec.max(0) as u64, (self.usec.max(0) as u32) * 1000)
    }
}

/// One kernel input event: type code, sub-code, value, timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawInputEvent {
    pub time: EventTime,
    pub ev_type: u16,
    pub code: u16,
    pub value: i32,
}

impl RawInputEvent {
    pub fn new(ev_type: u16, code: u16, value: i32) -> Self {
        Self {
            time: EventTime::default(),
            ev_type,
            code,
            value,
        }
    }

    pub fn at(mut self, time: EventTime) -> Self {
        self.time = time;
        self
    }

    pub fn is_syn_report(&self) -> bool {
        self.ev_type == EV_SYN && self.code == SYN_REPORT
    }
}

/// Parse a kernel `input_event` record from raw bytes (32-bit or 64-bit
/// layout, little-endian).
pub fn parse_input_event(buf: &[u8]) -> Option<RawInputEvent> {
    match buf.len() {
        INPUT_EVENT_SIZE_32 => parse_input_event_32(buf),
        INPUT_EVENT_SIZE_64 => parse_input_event_64(buf),
        len if len >= INPUT_EVENT_SIZE_64 => parse_input_event_64(buf),
        len if len >= INPUT_EVENT_SIZE_32 => parse_input_event_32(buf),
        _ => None,
    }
}

fn parse_input_event_32(buf: &[u8]) -> Option<RawInputEvent> {
    let sec = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as i64;
    let usec = u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]) as i64;
    let ev_type = u16::from_le_bytes([buf[8], buf[9]]);
    let code = u16::from_le_bytes([buf[10], buf[11]]);
    let value = i32::from_le_bytes([buf[12], buf[13], buf[14], buf[15]]);

    Some(RawInputEvent {
        time: EventTime::new(sec, usec),
        ev_type,
        code,
        value,
    })
}

fn parse_input_event_64(buf: &[u8]) -> Option<RawInputEvent> {
    let sec = i64::from_le_bytes([
        buf[0], buf[1], buf[2], buf[3], buf[4], buf[5], buf[6], buf[7],
    ]);
    let usec = i64::from_le_bytes([
        buf[8], buf[9], buf[10], buf[11], buf[12], buf[13], buf[14], buf[15],
    ]);
    let ev_type = u16::from_le_bytes([buf[16], buf[17]]);
    let code = u16::from_le_bytes([buf[18], buf[19]]);
    let value = i32::from_le_bytes([buf[20], buf[21], buf[22], buf[23]]);

    Some(RawInputEvent {
        time: EventTime::new(sec, usec),
        ev_type,
        code,
        value,
    })
}

/// Human-readable name for an event, for the dump tool.
pub fn code_name(ev_type: u16, code: u16) -> String {
    if ev_type == EV_SYN {
        return "SYN_REPORT".to_string();
    }
    if ev_type == EV_KEY {
        return format!("KEY/{}", code);
    }
    if ev_type == EV_MSC {
        return format!("MSC/{}", code);
    }
    if ev_type == EV_ABS {
        let abs = match code {
            ABS_X => "X",
            ABS_Y => "Y",
            ABS_PRESSURE => "PRESSURE",
            ABS_MT_SLOT => "MT_SLOT",
            ABS_MT_POSITION_X => "MT_POSITION_X",
            ABS_MT_POSITION_Y => "MT_POSITION_Y",
            ABS_MT_TRACKING_ID => "MT_TRACKING_ID",
            _ => "?",
        };
        return format!("ABS_{}({})", abs, code);
    }
    format!("type{} code{}", ev_type, code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_32bit_record() {
        let mut buf = [0u8; INPUT_EVENT_SIZE_32];
        buf[0..4].copy_from_slice(&1700000000u32.to_le_bytes());
        buf[4..8].copy_from_slice(&250000u32.to_le_bytes());
        buf[8..10].copy_from_slice(&EV_ABS.to_le_bytes());
        buf[10..12].copy_from_slice(&ABS_MT_POSITION_X.to_le_bytes());
        buf[12..16].copy_from_slice(&531i32.to_le_bytes());

        let ev = parse_input_event(&buf).unwrap();
        assert_eq!(ev.time, EventTime::new(1700000000, 250000));
        assert_eq!(ev.ev_type, EV_ABS);
        assert_eq!(ev.code, ABS_MT_POSITION_X);
        assert_eq!(ev.value, 531);
    }

    #[test]
    fn parse_64bit_record() {
        let mut buf = [0u8; INPUT_EVENT_SIZE_64];
        buf[0..8].copy_from_slice(&1700000001i64.to_le_bytes());
        buf[8..16].copy_from_slice(&999i64.to_le_bytes());
        buf[16..18].copy_from_slice(&EV_SYN.to_le_bytes());
        buf[18..20].copy_from_slice(&SYN_REPORT.to_le_bytes());
        buf[20..24].copy_from_slice(&0i32.to_le_bytes());

        let ev = parse_input_event(&buf).unwrap();
        assert_eq!(ev.time.sec, 1700000001);
        assert_eq!(ev.time.usec, 999);
        assert!(ev.is_syn_report());
    }

    #[test]
    fn short_buffer_rejected() {
        assert!(parse_input_event(&[0u8; 8]).is_none());
    }
}
