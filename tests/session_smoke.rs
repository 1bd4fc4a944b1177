//! End-to-end session tests over a scripted in-memory transport

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use vcplink::{seal, Device, LineTransport, TelemetryError, TransportError};

/// What the fake wire does next
enum Event {
    Line(String),
    Fail,
}

#[derive(Clone, Default)]
struct Feed(Arc<Mutex<VecDeque<Event>>>);

impl Feed {
    fn push_line(&self, line: &str) {
        self.0.lock().push_back(Event::Line(line.to_string()));
    }

    fn push_failure(&self) {
        self.0.lock().push_back(Event::Fail);
    }
}

/// In-memory transport driven by a [`Feed`]. An empty feed behaves like a
/// quiet serial port: short poll interval, empty line returned.
struct MockTransport {
    feed: Feed,
    closed: Arc<AtomicBool>,
}

impl LineTransport for MockTransport {
    fn send_line(&mut self, _line: &str) -> Result<(), TransportError> {
        Ok(())
    }

    fn read_line(&mut self) -> Result<String, TransportError> {
        let next = self.feed.0.lock().pop_front();
        match next {
            Some(Event::Line(line)) => Ok(line),
            Some(Event::Fail) => Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "wire fault",
            ))),
            None => {
                thread::sleep(Duration::from_millis(5));
                Ok(String::new())
            }
        }
    }

    fn shutdown(&mut self) -> Result<(), TransportError> {
        self.closed.store(true, Ordering::Relaxed);
        Ok(())
    }

    fn connection_info(&self) -> String {
        "mock".to_string()
    }
}

fn session(product: Option<&str>, serial_id: Option<&str>) -> (Device, Feed, Arc<AtomicBool>) {
    let feed = Feed::default();
    let closed = Arc::new(AtomicBool::new(false));
    let transport = MockTransport {
        feed: feed.clone(),
        closed: closed.clone(),
    };
    let device = Device::with_transport(
        Box::new(transport),
        product.map(str::to_string),
        serial_id.map(str::to_string),
    );
    (device, feed, closed)
}

const SHORT: Duration = Duration::from_millis(100);
const LONG: Duration = Duration::from_secs(2);

#[test]
fn valid_frame_latches_present_channels_only() {
    let (device, feed, _) = session(None, None);
    feed.push_line(&seal("D,PTH420,12345,MSG,101325,Pa,23.45,C"));

    assert_eq!(device.pressure(LONG).unwrap(), 101_325);
    assert_eq!(device.temperature(LONG).unwrap(), 23.45);
    assert!(matches!(
        device.humidity(SHORT),
        Err(TelemetryError::Timeout)
    ));
    assert!(matches!(device.co2(SHORT), Err(TelemetryError::Timeout)));

    device.close().unwrap();
}

#[test]
fn corrupt_frame_leaves_state_unset() {
    let (device, feed, _) = session(None, None);
    feed.push_line("D,PTH420,12345,MSG,101325,Pa,23.45,C,*0000");

    assert!(matches!(
        device.pressure(SHORT),
        Err(TelemetryError::Timeout)
    ));
    assert!(matches!(
        device.temperature(SHORT),
        Err(TelemetryError::Timeout)
    ));

    device.close().unwrap();
}

#[test]
fn consumer_sees_latest_value() {
    let (device, feed, _) = session(None, None);
    feed.push_line(&seal("D,PTH420,12345,MSG,101325,Pa"));
    feed.push_line(&seal("D,PTH420,12345,MSG,101400,Pa"));

    // Wait until the first frame latched, then give the reader time to
    // apply the second before asserting on the latest value.
    device.pressure(LONG).unwrap();
    let deadline = Instant::now() + LONG;
    loop {
        let p = device.pressure(LONG).unwrap();
        if p == 101_400 {
            break;
        }
        assert_eq!(p, 101_325);
        assert!(Instant::now() < deadline, "second frame never applied");
        thread::sleep(Duration::from_millis(5));
    }

    device.close().unwrap();
}

#[test]
fn identity_mismatch_never_updates_state() {
    let (device, feed, _) = session(Some("PTH420"), Some("12345"));
    feed.push_line(&seal("D,DXC100,12345,MSG,101325,Pa"));
    feed.push_line(&seal("D,PTH420,99999,MSG,101325,Pa"));

    assert!(matches!(
        device.pressure(SHORT),
        Err(TelemetryError::Timeout)
    ));

    // A frame matching both filters still gets through.
    feed.push_line(&seal("D,PTH420,12345,MSG,101325,Pa"));
    assert_eq!(device.pressure(LONG).unwrap(), 101_325);

    device.close().unwrap();
}

#[test]
fn accessor_blocks_until_frame_arrives() {
    let (device, feed, _) = session(None, None);

    let writer = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        feed.push_line(&seal("D,PTH420,12345,MSG,55.5,%"));
    });

    let start = Instant::now();
    assert_eq!(device.humidity(LONG).unwrap(), 55.5);
    assert!(start.elapsed() >= Duration::from_millis(40));

    writer.join().unwrap();
    device.close().unwrap();
}

#[test]
fn accessor_timeout_is_not_early() {
    let (device, _feed, _) = session(None, None);

    let start = Instant::now();
    assert!(matches!(device.co2(SHORT), Err(TelemetryError::Timeout)));
    assert!(start.elapsed() >= SHORT);

    device.close().unwrap();
}

#[test]
fn close_stops_reader_and_shuts_transport_down() {
    let (device, _feed, closed) = session(None, None);
    device.close().unwrap();
    assert!(closed.load(Ordering::Relaxed));
}

#[test]
fn drop_tears_the_session_down() {
    let (device, _feed, closed) = session(None, None);
    drop(device);
    assert!(closed.load(Ordering::Relaxed));
}

#[test]
fn fatal_transport_error_surfaces() {
    let (device, feed, _) = session(None, None);
    feed.push_failure();

    // Give the reader a moment to hit the fault.
    thread::sleep(Duration::from_millis(50));
    assert!(matches!(
        device.pressure(SHORT),
        Err(TelemetryError::ReaderFailed(_))
    ));

    // The sticky error comes back out of close.
    assert!(device.close().is_err());
}

#[test]
fn noise_before_a_good_frame_is_tolerated() {
    let (device, feed, _) = session(None, None);
    feed.push_line("garbage");
    feed.push_line(&seal("X,PTH420,12345,MSG,101325,Pa"));
    feed.push_line("D,PTH420,12345,MSG,101325,Pa,*BEEF");
    feed.push_line(&seal("D,PTH420,12345,MSG,400.0,ppm"));

    assert_eq!(device.co2(LONG).unwrap(), 400.0);

    device.close().unwrap();
}
