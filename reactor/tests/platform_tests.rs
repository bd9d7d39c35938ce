//! Reactor tests against the real platform pollers

use reactor::{
    DescriptorSource, Disposition, IntervalTimer, PlatformPoller, PollPoller, Poller, Reactor,
    ReadyEvent, ReadyHandler,
};
use std::cell::Cell;
use std::io::{Read, Write};
use std::os::fd::AsRawFd;
use std::os::unix::net::UnixStream;
use std::rc::Rc;
use std::time::{Duration, Instant};

fn counting_handler(count: &Rc<Cell<usize>>) -> Box<dyn ReadyHandler> {
    let count = Rc::clone(count);
    Box::new(move |_event: ReadyEvent| {
        count.set(count.get() + 1);
        Disposition::Continue
    })
}

fn undrained_descriptor_fires_every_turn<P: Poller>(poller: P) {
    let mut reactor = Reactor::new(poller);
    let (mut tx, rx) = UnixStream::pair().unwrap();
    let count = Rc::new(Cell::new(0));
    reactor
        .add_source(
            Box::new(DescriptorSource::readable(rx.as_raw_fd())),
            counting_handler(&count),
        )
        .unwrap();

    assert_eq!(reactor.turn(Some(Duration::ZERO)).unwrap(), 0);

    tx.write_all(b"ping").unwrap();
    for expected in 1..=3 {
        reactor.turn(Some(Duration::from_secs(1))).unwrap();
        assert_eq!(count.get(), expected);
    }
}

#[test]
fn test_platform_poller_is_level_triggered() {
    undrained_descriptor_fires_every_turn(PlatformPoller::new().unwrap());
}

#[test]
fn test_poll_poller_is_level_triggered() {
    undrained_descriptor_fires_every_turn(PollPoller::new().unwrap());
}

#[test]
fn test_drained_descriptor_stops_firing() {
    let mut reactor = Reactor::new(PlatformPoller::new().unwrap());
    let (mut tx, rx) = UnixStream::pair().unwrap();
    rx.set_nonblocking(true).unwrap();
    let count = Rc::new(Cell::new(0));
    let count_in_handler = Rc::clone(&count);
    let mut reader = rx.try_clone().unwrap();
    reactor
        .add_source(
            Box::new(DescriptorSource::readable(rx.as_raw_fd())),
            Box::new(move |_event: ReadyEvent| {
                let mut buf = [0u8; 16];
                let _ = reader.read(&mut buf);
                count_in_handler.set(count_in_handler.get() + 1);
                Disposition::Continue
            }),
        )
        .unwrap();

    tx.write_all(b"x").unwrap();
    reactor.turn(Some(Duration::from_secs(1))).unwrap();
    reactor.turn(Some(Duration::from_millis(20))).unwrap();
    assert_eq!(count.get(), 1);
}

#[test]
fn test_interval_timer_fires_without_descriptor_activity() {
    let mut reactor = Reactor::new(PlatformPoller::new().unwrap());
    let count = Rc::new(Cell::new(0));
    reactor
        .add_source(
            Box::new(IntervalTimer::new(Duration::from_millis(10))),
            counting_handler(&count),
        )
        .unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    while count.get() < 3 {
        assert!(Instant::now() < deadline, "interval timer never fired");
        reactor.turn(None).unwrap();
    }
}

#[cfg(target_os = "linux")]
#[test]
fn test_timerfd_source_fires_and_acknowledges() {
    use reactor::TimerFd;

    let mut reactor = Reactor::new(PlatformPoller::new().unwrap());
    let acknowledged = Rc::new(Cell::new(0u64));
    let acknowledged_in_handler = Rc::clone(&acknowledged);
    reactor
        .add_source(
            Box::new(TimerFd::periodic(Duration::from_millis(10)).unwrap()),
            Box::new(move |event: ReadyEvent| {
                let expirations = event.acknowledgement.unwrap();
                acknowledged_in_handler.set(acknowledged_in_handler.get() + expirations);
                Disposition::Continue
            }),
        )
        .unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    while acknowledged.get() < 2 {
        assert!(Instant::now() < deadline, "timerfd never fired");
        reactor.turn(Some(Duration::from_secs(1))).unwrap();
    }
}
