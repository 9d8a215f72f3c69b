//! Debounced, per-pin interrupt callbacks.
//!
//! A [`PortEventListener`] runs two threads. The detector blocks on the
//! interrupt line, reads the port's interrupt flag and capture registers and
//! hands an [`InterruptEvent`] to the [`EventQueue`]. The queue drops events
//! nobody registered for or that arrive within the settle time, and forwards
//! the rest over a channel to the dispatcher, which calls the callbacks.

use crate::consts::{self, Port};
use crate::device::{get_bit_mask, get_bit_num, Mcp23s17};
use crate::error::{Error, Result};
use crate::interrupt::InterruptLineConfig;
use crate::spi::{SpiDevice, Transport};
use crate::waiter::{edge_waiter, EdgeWaiter, StopTrigger, Wakeup};
use log::{debug, error, trace, warn};
use parking_lot::RwLock;
use std::fmt;
use std::fs::File;
use std::io;
use std::os::fd::OwnedFd;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Level a pin changed to, taken from the capture register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventDirection {
    /// The pin now reads 0.
    Falling,
    /// The pin now reads 1.
    Rising,
}

/// Which directions a registration accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectionFilter {
    /// Only changes to 0.
    Falling,
    /// Only changes to 1.
    Rising,
    /// Any change.
    Either,
}

impl DirectionFilter {
    /// Whether a change in `direction` passes this filter.
    pub fn matches(self, direction: EventDirection) -> bool {
        match self {
            DirectionFilter::Either => true,
            DirectionFilter::Falling => direction == EventDirection::Falling,
            DirectionFilter::Rising => direction == EventDirection::Rising,
        }
    }
}

/// Callback invoked on the dispatcher thread.
pub type Callback<T = SpiDevice> = Arc<dyn Fn(&InterruptEvent<T>) + Send + Sync>;

/// One change on one port, as seen by the detector.
pub struct InterruptEvent<T: Transport = SpiDevice> {
    /// INTFx at the time of the interrupt.
    pub interrupt_flag: u8,
    /// INTCAPx at the time of the interrupt.
    pub interrupt_capture: u8,
    /// The chip that raised it.
    pub chip: Arc<Mcp23s17<T>>,
    pub timestamp: Instant,
}

impl<T: Transport> InterruptEvent<T> {
    pub fn new(
        interrupt_flag: u8,
        interrupt_capture: u8,
        chip: Arc<Mcp23s17<T>>,
        timestamp: Instant,
    ) -> Self {
        Self {
            interrupt_flag,
            interrupt_capture,
            chip,
            timestamp,
        }
    }

    /// The pin that caused the interrupt (lowest set flag bit).
    pub fn pin_num(&self) -> Option<u8> {
        get_bit_num(self.interrupt_flag)
    }

    /// The level captured at [`pin_num`](Self::pin_num).
    pub fn direction(&self) -> Option<EventDirection> {
        let pin = self.pin_num()?;
        if self.interrupt_capture & (1 << pin) == 0 {
            Some(EventDirection::Falling)
        } else {
            Some(EventDirection::Rising)
        }
    }
}

impl<T: Transport> Clone for InterruptEvent<T> {
    fn clone(&self) -> Self {
        Self {
            interrupt_flag: self.interrupt_flag,
            interrupt_capture: self.interrupt_capture,
            chip: Arc::clone(&self.chip),
            timestamp: self.timestamp,
        }
    }
}

impl<T: Transport> fmt::Debug for InterruptEvent<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterruptEvent")
            .field("interrupt_flag", &format_args!("{:#010b}", self.interrupt_flag))
            .field(
                "interrupt_capture",
                &format_args!("{:#010b}", self.interrupt_capture),
            )
            .field("chip", &self.chip.hardware_addr())
            .field("timestamp", &self.timestamp)
            .finish()
    }
}

/// A callback bound to one pin and direction.
pub struct PinRegistration<T: Transport = SpiDevice> {
    pub pin_num: u8,
    pub direction: DirectionFilter,
    pub callback: Callback<T>,
    /// Events on this pin closer than this to the previous accepted one are dropped.
    pub settle_time: Duration,
}

impl<T: Transport> PinRegistration<T> {
    /// Whether this registration wants `event`.
    pub fn matches(&self, event: &InterruptEvent<T>) -> bool {
        event.pin_num() == Some(self.pin_num)
            && event
                .direction()
                .is_some_and(|direction| self.direction.matches(direction))
    }
}

impl<T: Transport> Clone for PinRegistration<T> {
    fn clone(&self) -> Self {
        Self {
            pin_num: self.pin_num,
            direction: self.direction,
            callback: Arc::clone(&self.callback),
            settle_time: self.settle_time,
        }
    }
}

impl<T: Transport> fmt::Debug for PinRegistration<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PinRegistration")
            .field("pin_num", &self.pin_num)
            .field("direction", &self.direction)
            .field("settle_time", &self.settle_time)
            .finish_non_exhaustive()
    }
}

type Registrations<T> = Arc<RwLock<Vec<PinRegistration<T>>>>;

/// What travels from the queue to the dispatcher.
pub enum QueueMessage<T: Transport = SpiDevice> {
    Event(InterruptEvent<T>),
    /// Ends the dispatcher.
    Terminate,
}

impl<T: Transport> fmt::Debug for QueueMessage<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueMessage::Event(event) => f.debug_tuple("Event").field(event).finish(),
            QueueMessage::Terminate => f.write_str("Terminate"),
        }
    }
}

/// Filters and debounces events before they reach the dispatcher.
///
/// The first registration matching an event's pin and direction decides the
/// settle time. The debounce clock is kept per pin, so every direction filter
/// on the same pin shares it.
pub struct EventQueue<T: Transport = SpiDevice> {
    registrations: Registrations<T>,
    last_event_time: [Option<Instant>; 8],
    sender: Sender<QueueMessage<T>>,
}

impl<T: Transport> fmt::Debug for EventQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventQueue")
            .field("last_event_time", &self.last_event_time)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> EventQueue<T> {
    /// Creates a queue over `registrations` and the receiving end for the dispatcher.
    pub fn new(
        registrations: Arc<RwLock<Vec<PinRegistration<T>>>>,
    ) -> (Self, Receiver<QueueMessage<T>>) {
        let (sender, receiver) = mpsc::channel();
        let queue = Self {
            registrations,
            last_event_time: [None; 8],
            sender,
        };
        (queue, receiver)
    }

    /// Queues `event` unless it is unwanted or too soon after the last one
    /// on its pin. Returns whether it was queued.
    pub fn add_event(&mut self, event: InterruptEvent<T>) -> bool {
        let Some(pin) = event.pin_num() else {
            trace!("Dropping event without a flagged pin");
            return false;
        };
        let settle_time = {
            let registrations = self.registrations.read();
            match registrations.iter().find(|r| r.matches(&event)) {
                Some(registration) => registration.settle_time,
                None => {
                    trace!("No registration for pin {} {:?}", pin, event.direction());
                    return false;
                }
            }
        };

        let slot = &mut self.last_event_time[usize::from(pin)];
        if let Some(last) = *slot {
            // A threshold beyond the clock's range means the pin never settles.
            let settled = last
                .checked_add(settle_time)
                .is_some_and(|threshold| event.timestamp > threshold);
            if !settled {
                trace!("Debounced event on pin {}", pin);
                return false;
            }
        }
        *slot = Some(event.timestamp);
        self.sender.send(QueueMessage::Event(event)).is_ok()
    }

    /// Sends the sentinel that ends the dispatcher.
    pub fn terminate(&self) {
        if self.sender.send(QueueMessage::Terminate).is_err() {
            trace!("Dispatcher already gone");
        }
    }

    fn sender(&self) -> Sender<QueueMessage<T>> {
        self.sender.clone()
    }
}

/// Lifecycle of a [`PortEventListener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerState {
    /// Built, callbacks may be registered, no threads running.
    Created,
    /// Detector and dispatcher are running.
    Active,
    /// Deactivated for good; cannot be activated again.
    Terminated,
}

/// Listener settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListenerConfig {
    /// The interrupt line whose value file [`PortEventListener::activate`] opens.
    pub interrupt_line: InterruptLineConfig,
    /// End the detector when its wait is interrupted by a signal, instead of
    /// waiting again.
    pub exit_on_signal: bool,
}

struct Workers<T: Transport> {
    sender: Sender<QueueMessage<T>>,
    stop: StopTrigger,
    dispatcher: JoinHandle<()>,
    detector: JoinHandle<()>,
}

/// Calls registered functions when pins on one port of a chip change.
///
/// ```no_run
/// use mcp23s17_spi::{DirectionFilter, Mcp23s17, Port, PortEventListener, SpiConfig};
/// use std::sync::Arc;
///
/// let chip = Arc::new(Mcp23s17::open(0, &SpiConfig::default())?);
/// let mut listener = PortEventListener::new(Port::B, chip);
/// listener.register(0, DirectionFilter::Falling, |event| {
///     println!("pin {:?} pressed", event.pin_num());
/// })?;
/// listener.activate()?;
/// # Ok::<(), mcp23s17_spi::Error>(())
/// ```
pub struct PortEventListener<T: Transport + 'static = SpiDevice> {
    port: Port,
    chip: Arc<Mcp23s17<T>>,
    config: ListenerConfig,
    registrations: Registrations<T>,
    state: ListenerState,
    workers: Option<Workers<T>>,
}

impl<T: Transport + 'static> fmt::Debug for PortEventListener<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortEventListener")
            .field("port", &self.port)
            .field("chip", &self.chip)
            .field("state", &self.state)
            .field("registrations", &self.registrations.read().len())
            .finish()
    }
}

impl<T: Transport + 'static> PortEventListener<T> {
    /// A listener on `port` of `chip` with the default interrupt line (GPIO 25).
    pub fn new(port: Port, chip: Arc<Mcp23s17<T>>) -> Self {
        Self::with_config(port, chip, ListenerConfig::default())
    }

    pub fn with_config(port: Port, chip: Arc<Mcp23s17<T>>, config: ListenerConfig) -> Self {
        Self {
            port,
            chip,
            config,
            registrations: Arc::new(RwLock::new(Vec::new())),
            state: ListenerState::Created,
            workers: None,
        }
    }

    /// The port whose INTF/INTCAP registers are read.
    pub fn port(&self) -> Port {
        self.port
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ListenerState {
        self.state
    }

    /// Settings the listener was built with.
    pub fn config(&self) -> &ListenerConfig {
        &self.config
    }

    /// Number of registrations.
    pub fn registrations(&self) -> usize {
        self.registrations.read().len()
    }

    /// Registers `callback` for `pin_num` with the default settle time.
    pub fn register<F>(&self, pin_num: u8, direction: DirectionFilter, callback: F) -> Result<()>
    where
        F: Fn(&InterruptEvent<T>) + Send + Sync + 'static,
    {
        self.register_with_settle_time(
            pin_num,
            direction,
            callback,
            consts::DEFAULT_SETTLE_TIME,
        )
    }

    /// Registers `callback` for `pin_num` (0-7) and `direction`.
    ///
    /// Allowed before and after activation; registrations made while active
    /// apply from the next event on.
    pub fn register_with_settle_time<F>(
        &self,
        pin_num: u8,
        direction: DirectionFilter,
        callback: F,
        settle_time: Duration,
    ) -> Result<()>
    where
        F: Fn(&InterruptEvent<T>) + Send + Sync + 'static,
    {
        if self.state == ListenerState::Terminated {
            return Err(Error::ListenerState {
                operation: "register on",
                state: self.state,
            });
        }
        get_bit_mask(pin_num)?;
        debug!(
            "Registering pin {} {:?} on port {:?} (settle {:?})",
            pin_num, direction, self.port, settle_time
        );
        self.registrations.write().push(PinRegistration {
            pin_num,
            direction,
            callback: Arc::new(callback),
            settle_time,
        });
        Ok(())
    }

    /// Removes every registration matching `pin_num` and `direction`, where
    /// `None` matches anything. Returns how many were removed.
    pub fn deregister(&self, pin_num: Option<u8>, direction: Option<DirectionFilter>) -> usize {
        let mut registrations = self.registrations.write();
        let before = registrations.len();
        registrations.retain(|r| {
            !(pin_num.map_or(true, |p| p == r.pin_num)
                && direction.map_or(true, |d| d == r.direction))
        });
        let removed = before - registrations.len();
        debug!(
            "Deregistered {} callback(s) for pin {:?} {:?}",
            removed, pin_num, direction
        );
        removed
    }

    /// Opens the interrupt line's value file and starts listening.
    ///
    /// The line itself must already be enabled, see
    /// [`Mcp23s17::enable_interrupts`].
    pub fn activate(&mut self) -> Result<()> {
        self.expect_state("activate", ListenerState::Created)?;
        let value_file = File::open(self.config.interrupt_line.value_path())?;
        self.activate_with(OwnedFd::from(value_file))
    }

    /// Starts listening for edges on an already opened descriptor.
    pub fn activate_with(&mut self, value_fd: OwnedFd) -> Result<()> {
        self.expect_state("activate", ListenerState::Created)?;
        let (waiter, stop) = edge_waiter(value_fd)?;
        let (queue, receiver) = EventQueue::new(Arc::clone(&self.registrations));
        let sender = queue.sender();

        let registrations = Arc::clone(&self.registrations);
        let dispatcher = thread::Builder::new()
            .name("mcp23s17-dispatch".into())
            .spawn(move || dispatch(registrations, receiver))?;

        let detector = Detector {
            port: self.port,
            chip: Arc::clone(&self.chip),
            waiter,
            queue,
            exit_on_signal: self.config.exit_on_signal,
        };
        let detector = match thread::Builder::new()
            .name("mcp23s17-detect".into())
            .spawn(move || detector.run())
        {
            Ok(handle) => handle,
            Err(e) => {
                let _ = sender.send(QueueMessage::Terminate);
                let _ = dispatcher.join();
                return Err(e.into());
            }
        };

        debug!(
            "Listening for interrupts on port {:?} of {}",
            self.port,
            self.chip.hardware_addr()
        );
        self.workers = Some(Workers {
            sender,
            stop,
            dispatcher,
            detector,
        });
        self.state = ListenerState::Active;
        Ok(())
    }

    /// Stops both threads. Events already queued are dispatched first;
    /// anything the detector sees afterwards is lost.
    pub fn deactivate(&mut self) -> Result<()> {
        self.expect_state("deactivate", ListenerState::Active)?;
        self.state = ListenerState::Terminated;
        let Some(workers) = self.workers.take() else {
            return Ok(());
        };

        if workers.sender.send(QueueMessage::Terminate).is_err() {
            trace!("Dispatcher already gone");
        }
        if workers.dispatcher.join().is_err() {
            error!("Dispatcher thread panicked");
        }
        // A detector that already ended has closed its end of the stop pipe.
        let stopped = if workers.detector.is_finished() {
            trace!("Detector already stopped");
            Ok(())
        } else {
            match workers.stop.trigger() {
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
                other => other,
            }
        };
        if workers.detector.join().is_err() {
            error!("Detector thread panicked");
        }
        debug!("Stopped listening on port {:?}", self.port);
        stopped.map_err(Error::from)
    }

    fn expect_state(&self, operation: &'static str, expected: ListenerState) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(Error::ListenerState {
                operation,
                state: self.state,
            })
        }
    }
}

impl<T: Transport + 'static> Drop for PortEventListener<T> {
    fn drop(&mut self) {
        if self.state == ListenerState::Active {
            if let Err(e) = self.deactivate() {
                warn!("Failed to stop port event listener: {}", e);
            }
        }
    }
}

struct Detector<T: Transport> {
    port: Port,
    chip: Arc<Mcp23s17<T>>,
    waiter: EdgeWaiter,
    queue: EventQueue<T>,
    exit_on_signal: bool,
}

impl<T: Transport> Detector<T> {
    fn run(mut self) {
        loop {
            match self.waiter.wait() {
                Ok(Wakeup::Stop) => break,
                Ok(Wakeup::Edge) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                    if self.exit_on_signal {
                        debug!("Detector interrupted by a signal, exiting");
                        break;
                    }
                    continue;
                }
                Err(e) => {
                    error!("Waiting for interrupts failed: {}", e);
                    break;
                }
            }
            if let Err(e) = self.handle_edge() {
                error!("Reading interrupt registers failed: {}", e);
                break;
            }
        }
        trace!("Detector for port {:?} finished", self.port);
    }

    fn handle_edge(&mut self) -> Result<()> {
        let interrupt_flag = self.chip.read(self.port.interrupt_flag())?;
        if interrupt_flag == 0 {
            trace!("Spurious wake-up on port {:?}", self.port);
            return Ok(());
        }
        let interrupt_capture = self.chip.read(self.port.interrupt_capture())?;
        let event = InterruptEvent::new(
            interrupt_flag,
            interrupt_capture,
            Arc::clone(&self.chip),
            Instant::now(),
        );
        trace!("Detected {:?}", event);
        self.queue.add_event(event);
        Ok(())
    }
}

fn dispatch<T: Transport>(registrations: Registrations<T>, receiver: Receiver<QueueMessage<T>>) {
    while let Ok(QueueMessage::Event(event)) = receiver.recv() {
        // Callbacks may (de)register, so run them on a snapshot.
        let snapshot = registrations.read().clone();
        for registration in snapshot.iter().filter(|r| r.matches(&event)) {
            (registration.callback)(&event);
        }
    }
    trace!("Dispatcher finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Registers([u8; 0x16]);

    impl Transport for Registers {
        fn transfer(&mut self, tx: &[u8]) -> Result<Vec<u8>> {
            Ok(vec![0, 0, self.0[usize::from(tx[1])]])
        }

        fn close(&mut self) {}
    }

    fn chip() -> Arc<Mcp23s17<Registers>> {
        Arc::new(Mcp23s17::new(0, Registers([0; 0x16])).unwrap())
    }

    fn registration(
        pin_num: u8,
        direction: DirectionFilter,
        settle_time: Duration,
    ) -> PinRegistration<Registers> {
        PinRegistration {
            pin_num,
            direction,
            callback: Arc::new(|_: &InterruptEvent<Registers>| {}),
            settle_time,
        }
    }

    fn queue_with(
        registrations: Vec<PinRegistration<Registers>>,
    ) -> (EventQueue<Registers>, Receiver<QueueMessage<Registers>>) {
        EventQueue::new(Arc::new(RwLock::new(registrations)))
    }

    #[test]
    fn test_event_pin_and_direction() {
        let chip = chip();
        let now = Instant::now();
        let event = InterruptEvent::new(0b0000_1000, 0b1111_0111, chip.clone(), now);
        assert_eq!(event.pin_num(), Some(3));
        assert_eq!(event.direction(), Some(EventDirection::Falling));

        let event = InterruptEvent::new(0b0000_1000, 0b0000_1000, chip.clone(), now);
        assert_eq!(event.direction(), Some(EventDirection::Rising));

        let event = InterruptEvent::new(0, 0xFF, chip, now);
        assert_eq!(event.pin_num(), None);
        assert_eq!(event.direction(), None);
    }

    #[test]
    fn test_debounce_window() {
        let chip = chip();
        let (mut queue, receiver) = queue_with(vec![registration(
            0,
            DirectionFilter::Falling,
            Duration::from_millis(20),
        )]);
        let t0 = Instant::now();

        assert!(queue.add_event(InterruptEvent::new(1, 0, chip.clone(), t0)));
        assert!(!queue.add_event(InterruptEvent::new(
            1,
            0,
            chip.clone(),
            t0 + Duration::from_millis(10)
        )));
        // Exactly on the threshold still counts as a bounce.
        assert!(!queue.add_event(InterruptEvent::new(
            1,
            0,
            chip.clone(),
            t0 + Duration::from_millis(20)
        )));
        assert!(queue.add_event(InterruptEvent::new(
            1,
            0,
            chip,
            t0 + Duration::from_millis(50)
        )));

        assert_eq!(receiver.try_iter().count(), 2);
    }

    #[test]
    fn test_unbounded_settle_time_delivers_once() {
        let chip = chip();
        let (mut queue, receiver) = queue_with(vec![registration(
            0,
            DirectionFilter::Either,
            Duration::MAX,
        )]);
        let t0 = Instant::now();

        assert!(queue.add_event(InterruptEvent::new(1, 0, chip.clone(), t0)));
        assert!(!queue.add_event(InterruptEvent::new(
            1,
            1,
            chip.clone(),
            t0 + Duration::from_millis(5)
        )));
        assert!(!queue.add_event(InterruptEvent::new(
            1,
            0,
            chip,
            t0 + Duration::from_secs(3600)
        )));
        assert_eq!(receiver.try_iter().count(), 1);
    }

    #[test]
    fn test_unregistered_events_are_dropped() {
        let chip = chip();
        let (mut queue, receiver) = queue_with(vec![registration(
            2,
            DirectionFilter::Rising,
            Duration::ZERO,
        )]);
        let now = Instant::now();

        // Wrong direction, wrong pin, no pin at all.
        assert!(!queue.add_event(InterruptEvent::new(0b100, 0b000, chip.clone(), now)));
        assert!(!queue.add_event(InterruptEvent::new(0b010, 0b010, chip.clone(), now)));
        assert!(!queue.add_event(InterruptEvent::new(0, 0xFF, chip.clone(), now)));
        assert!(queue.add_event(InterruptEvent::new(0b100, 0b100, chip, now)));
        assert_eq!(receiver.try_iter().count(), 1);
    }

    #[test]
    fn test_debounce_clock_is_per_pin() {
        let chip = chip();
        let settle = Duration::from_millis(20);
        let (mut queue, _receiver) = queue_with(vec![
            registration(1, DirectionFilter::Either, settle),
            registration(2, DirectionFilter::Either, settle),
        ]);
        let t0 = Instant::now();
        let t1 = t0 + Duration::from_millis(5);

        assert!(queue.add_event(InterruptEvent::new(0b010, 0, chip.clone(), t0)));
        assert!(queue.add_event(InterruptEvent::new(0b100, 0, chip.clone(), t1)));
        // Same pin, other direction: shares the clock.
        assert!(!queue.add_event(InterruptEvent::new(0b010, 0b010, chip, t1)));
    }

    #[test]
    fn test_terminate_after_events() {
        let chip = chip();
        let (mut queue, receiver) = queue_with(vec![registration(
            0,
            DirectionFilter::Either,
            Duration::ZERO,
        )]);
        queue.add_event(InterruptEvent::new(1, 1, chip, Instant::now()));
        queue.terminate();

        assert!(matches!(receiver.recv().unwrap(), QueueMessage::Event(_)));
        assert!(matches!(receiver.recv().unwrap(), QueueMessage::Terminate));
    }

    #[test]
    fn test_register_and_deregister() {
        let listener = PortEventListener::new(Port::A, chip());
        listener.register(3, DirectionFilter::Falling, |_| {}).unwrap();
        listener.register(3, DirectionFilter::Rising, |_| {}).unwrap();
        listener.register(4, DirectionFilter::Falling, |_| {}).unwrap();
        assert!(matches!(
            listener.register(8, DirectionFilter::Falling, |_| {}),
            Err(Error::Range { value: 8, .. })
        ));
        assert_eq!(listener.registrations(), 3);

        assert_eq!(listener.deregister(Some(3), Some(DirectionFilter::Rising)), 1);
        assert_eq!(listener.deregister(Some(3), None), 1);
        assert_eq!(listener.registrations(), 1);
        assert_eq!(listener.deregister(None, None), 1);
        assert_eq!(listener.registrations(), 0);
    }

    #[test]
    fn test_dispatch_calls_matches_in_order() {
        let chip = chip();
        let calls = Arc::new(AtomicUsize::new(0));
        let first = Arc::clone(&calls);
        let second = Arc::clone(&calls);
        let registrations: Registrations<Registers> = Arc::new(RwLock::new(vec![
            PinRegistration {
                pin_num: 5,
                direction: DirectionFilter::Either,
                callback: Arc::new(move |_: &InterruptEvent<Registers>| {
                    assert_eq!(first.fetch_add(1, Ordering::SeqCst), 0);
                }),
                settle_time: Duration::ZERO,
            },
            PinRegistration {
                pin_num: 5,
                direction: DirectionFilter::Rising,
                callback: Arc::new(move |_: &InterruptEvent<Registers>| {
                    assert_eq!(second.fetch_add(1, Ordering::SeqCst), 1);
                }),
                settle_time: Duration::ZERO,
            },
        ]));
        let (sender, receiver) = mpsc::channel();
        sender
            .send(QueueMessage::Event(InterruptEvent::new(
                0b0010_0000,
                0b0010_0000,
                chip,
                Instant::now(),
            )))
            .unwrap();
        sender.send(QueueMessage::Terminate).unwrap();

        dispatch(registrations, receiver);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_lifecycle_errors() {
        let mut listener = PortEventListener::new(Port::A, chip());
        assert!(matches!(
            listener.deactivate(),
            Err(Error::ListenerState {
                state: ListenerState::Created,
                ..
            })
        ));
        assert_eq!(listener.state(), ListenerState::Created);
    }
}
