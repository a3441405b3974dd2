//! Kernel input event codes (`linux/input-event-codes.h`).
//!
//! Only the codes the engine decodes or classifies on are listed here; every
//! other code passes through the normalizer as a documented no-op.

// Event types.
pub const EV_SYN: u16 = 0x00;
pub const EV_KEY: u16 = 0x01;
pub const EV_REL: u16 = 0x02;
pub const EV_ABS: u16 = 0x03;
pub const EV_MSC: u16 = 0x04;
pub const EV_LED: u16 = 0x11;
pub const EV_MAX: u16 = 0x1f;
pub const EV_CNT: usize = EV_MAX as usize + 1;

// Synchronization.
pub const SYN_REPORT: u16 = 0;
pub const SYN_CONFIG: u16 = 1;
pub const SYN_MT_REPORT: u16 = 2;
pub const SYN_DROPPED: u16 = 3;

// Keys and buttons.
pub const KEY_ESC: u16 = 1;
pub const KEY_A: u16 = 30;
pub const KEY_B: u16 = 48;
pub const KEY_C: u16 = 46;
pub const KEY_LEFTSHIFT: u16 = 42;
pub const KEY_CAPSLOCK: u16 = 58;
pub const KEY_OK: u16 = 0x160;
pub const KEY_MAX: u16 = 0x2ff;
pub const KEY_CNT: usize = KEY_MAX as usize + 1;

pub const BTN_MISC: u16 = 0x100;
pub const BTN_LEFT: u16 = 0x110;
pub const BTN_RIGHT: u16 = 0x111;
pub const BTN_MIDDLE: u16 = 0x112;
pub const BTN_SIDE: u16 = 0x113;
pub const BTN_EXTRA: u16 = 0x114;
pub const BTN_FORWARD: u16 = 0x115;
pub const BTN_BACK: u16 = 0x116;
pub const BTN_TASK: u16 = 0x117;
pub const BTN_TOOL_PEN: u16 = 0x140;
pub const BTN_TOOL_FINGER: u16 = 0x145;
pub const BTN_TOUCH: u16 = 0x14a;

/// Key codes reported to the seat as pointer buttons rather than keys.
pub const POINTER_BUTTONS: [u16; 8] = [
    BTN_LEFT,
    BTN_RIGHT,
    BTN_MIDDLE,
    BTN_SIDE,
    BTN_EXTRA,
    BTN_FORWARD,
    BTN_BACK,
    BTN_TASK,
];

// Relative axes.
pub const REL_X: u16 = 0x00;
pub const REL_Y: u16 = 0x01;
pub const REL_HWHEEL: u16 = 0x06;
pub const REL_WHEEL: u16 = 0x08;
pub const REL_MAX: u16 = 0x0f;
pub const REL_CNT: usize = REL_MAX as usize + 1;

// Absolute axes.
pub const ABS_X: u16 = 0x00;
pub const ABS_Y: u16 = 0x01;
pub const ABS_PRESSURE: u16 = 0x18;
pub const ABS_MT_SLOT: u16 = 0x2f;
pub const ABS_MT_POSITION_X: u16 = 0x35;
pub const ABS_MT_POSITION_Y: u16 = 0x36;
pub const ABS_MT_TOOL_TYPE: u16 = 0x37;
pub const ABS_MT_TRACKING_ID: u16 = 0x39;
pub const ABS_MAX: u16 = 0x3f;
pub const ABS_CNT: usize = ABS_MAX as usize + 1;

// LEDs.
pub const LED_NUML: u16 = 0x00;
pub const LED_CAPSL: u16 = 0x01;
pub const LED_SCROLLL: u16 = 0x02;
pub const LED_MAX: u16 = 0x0f;
pub const LED_CNT: usize = LED_MAX as usize + 1;

/// Number of codes addressable for an event type, used to size bitmaps.
pub fn code_count(ev_type: u16) -> usize {
    match ev_type {
        EV_SYN => EV_CNT,
        EV_KEY => KEY_CNT,
        EV_REL => REL_CNT,
        EV_ABS => ABS_CNT,
        EV_LED => LED_CNT,
        _ => 0x100,
    }
}

/// `true` for records whose decoding only accumulates motion.
///
/// Any other record forces pending motion to be flushed first so that motion
/// and discrete events keep their relative order.
pub fn is_motion(kind: u16, code: u16) -> bool {
    match kind {
        EV_REL => matches!(code, REL_X | REL_Y),
        EV_ABS => matches!(
            code,
            ABS_X | ABS_Y | ABS_MT_POSITION_X | ABS_MT_POSITION_Y
        ),
        _ => false,
    }
}
