use evseat::backends::virtual_input::VirtualEvdev;
use evseat::codes::*;
use evseat::{DeviceManager, LogSink, NotificationLog, RawRecord, SeatConfig};

fn rec(kind: u16, code: u16, value: i32) -> RawRecord {
    RawRecord::new(kind, code, value)
}

fn main() {
    // RUST_LOG is not read here; everything at debug and above is shown
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let mut seat = DeviceManager::new(SeatConfig::default());

    let mouse = VirtualEvdev::builder("demo mouse")
        .keys([BTN_LEFT, BTN_RIGHT])
        .rel([REL_X, REL_Y, REL_WHEEL])
        .build();
    let touch = VirtualEvdev::builder("demo touchscreen")
        .abs(ABS_MT_SLOT, 0, 9)
        .abs(ABS_MT_TRACKING_ID, 0, 65535)
        .abs(ABS_MT_POSITION_X, 0, 4095)
        .abs(ABS_MT_POSITION_Y, 0, 4095)
        .build();

    let mouse_input = mouse.handle();
    let touch_input = touch.handle();
    let mouse_id = seat.admit(mouse, "virtual/mouse").id().expect("mouse admitted");
    let touch_id = seat.admit(touch, "virtual/touch").id().expect("touchscreen admitted");

    println!("Devices:");
    for (id, dev) in seat.devices() {
        println!("- {} {:?} {:?}", id, dev.meta().name, dev.caps());
    }

    mouse_input.push_records(&[
        rec(EV_REL, REL_X, 5),
        rec(EV_REL, REL_Y, -3),
        rec(EV_KEY, BTN_LEFT, 1),
        rec(EV_SYN, SYN_REPORT, 0),
        rec(EV_REL, REL_WHEEL, -1),
        rec(EV_KEY, BTN_LEFT, 0),
        rec(EV_SYN, SYN_REPORT, 0),
    ]);
    touch_input.push_records(&[
        rec(EV_ABS, ABS_MT_SLOT, 0),
        rec(EV_ABS, ABS_MT_TRACKING_ID, 1),
        rec(EV_ABS, ABS_MT_POSITION_X, 2048),
        rec(EV_ABS, ABS_MT_POSITION_Y, 1024),
        rec(EV_SYN, SYN_REPORT, 0),
        rec(EV_ABS, ABS_MT_TRACKING_ID, -1),
        rec(EV_SYN, SYN_REPORT, 0),
    ]);

    let mut sink = LogSink::new(NotificationLog::new());
    for id in [mouse_id, touch_id] {
        match seat.dispatch(id, &mut sink) {
            Ok(n) => println!("{id}: {n} record(s)"),
            Err(e) => {
                eprintln!("{id}: {e}");
                seat.remove(id);
            }
        }
    }

    let log = sink.into_inner();
    println!("{}", log.to_json().expect("serialize notifications"));
}
