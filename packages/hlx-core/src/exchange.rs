//! The request/response exchange queue.
//!
//! Every client-initiated operation is an exchange: an outbound frame
//! paired with a predicate over inbound [`Report`]s that recognizes its
//! response. Exchanges queue per connection in FIFO order, at most one is
//! in flight, and completion happens strictly in submission order. A
//! report that does not satisfy the head-of-queue predicate is an
//! unsolicited notification and takes the report path instead.
//!
//! The queue itself is synchronous state; the connection task drives it
//! (sending frames, arming the timeout, feeding inbound reports).

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::error::{ConnectionError, HlxError, HlxResult};
use crate::protocol::parse::Report;

/// Recognizes the response that completes one exchange.
pub type ResponseMatcher = Box<dyn Fn(&Report) -> bool + Send>;

/// One queued operation.
pub struct Exchange {
    /// Outbound frame payload, brackets excluded.
    pub frame: String,
    /// Predicate over inbound reports.
    pub matches: ResponseMatcher,
    /// Per-exchange timeout; `None` uses the connection default.
    pub timeout: Option<Duration>,
}

impl Exchange {
    /// Creates an exchange with the connection's default timeout.
    #[must_use]
    pub fn new(frame: String, matches: ResponseMatcher) -> Self {
        Self {
            frame,
            matches,
            timeout: None,
        }
    }

    /// Overrides the timeout for this exchange alone.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Completion side of an exchange.
pub type Completion = oneshot::Sender<HlxResult<Report>>;

struct Pending {
    exchange: Exchange,
    done: Completion,
    /// Set once the frame is on the wire.
    deadline: Option<Instant>,
}

/// Per-connection FIFO of pending exchanges.
pub struct ExchangeQueue {
    queue: VecDeque<Pending>,
    default_timeout: Duration,
}

impl ExchangeQueue {
    /// Creates an empty queue with the given default timeout.
    #[must_use]
    pub fn new(default_timeout: Duration) -> Self {
        Self {
            queue: VecDeque::new(),
            default_timeout,
        }
    }

    /// Number of queued exchanges, the in-flight one included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// True when nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Appends an exchange.
    pub fn push(&mut self, exchange: Exchange, done: Completion) {
        self.queue.push_back(Pending {
            exchange,
            done,
            deadline: None,
        });
    }

    /// Returns the head frame if it has not been sent yet, arming its
    /// timeout. The connection task calls this whenever the queue may have
    /// a new head.
    pub fn take_sendable(&mut self) -> Option<String> {
        let default_timeout = self.default_timeout;
        let head = self.queue.front_mut()?;
        if head.deadline.is_some() {
            return None;
        }
        let timeout = head.exchange.timeout.unwrap_or(default_timeout);
        head.deadline = Some(Instant::now() + timeout);
        Some(head.exchange.frame.clone())
    }

    /// The armed deadline of the in-flight exchange, if any.
    #[must_use]
    pub fn head_deadline(&self) -> Option<Instant> {
        self.queue.front().and_then(|p| p.deadline)
    }

    /// Feeds an inbound report. Returns true if it completed the in-flight
    /// exchange; false means the report is unsolicited.
    pub fn on_report(&mut self, report: &Report) -> bool {
        let completes = matches!(
            self.queue.front(),
            Some(head) if head.deadline.is_some() && (head.exchange.matches)(report)
        );
        if completes {
            let head = self.queue.pop_front().expect("head checked above");
            let _ = head.done.send(Ok(report.clone()));
        }
        completes
    }

    /// Fails the in-flight exchange (timeout, malformed response). The
    /// queue advances; no retry is attempted.
    pub fn fail_head(&mut self, error: HlxError) {
        if matches!(self.queue.front(), Some(head) if head.deadline.is_some()) {
            let head = self.queue.pop_front().expect("head checked above");
            let _ = head.done.send(Err(error));
        }
    }

    /// Fails every queued and in-flight exchange. Used on disconnect
    /// (`Cancelled`) and on transport failure (`TransportError`).
    pub fn drain(&mut self, error: &ConnectionError) {
        for pending in self.queue.drain(..) {
            let _ = pending.done.send(Err(error.clone().into()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ids::ZoneId;

    fn volume_matcher(zone: u8) -> ResponseMatcher {
        Box::new(move |report| {
            matches!(report, Report::ZoneVolume { zone: z, .. } if z.get() == zone)
        })
    }

    fn volume_report(zone: u8, level: i8) -> Report {
        Report::ZoneVolume {
            zone: ZoneId::new(zone).unwrap(),
            level,
        }
    }

    fn submit(queue: &mut ExchangeQueue, frame: &str, zone: u8) -> oneshot::Receiver<HlxResult<Report>> {
        let (tx, rx) = oneshot::channel();
        queue.push(Exchange::new(frame.to_string(), volume_matcher(zone)), tx);
        rx
    }

    #[tokio::test]
    async fn completes_in_submission_order() {
        let mut queue = ExchangeQueue::new(Duration::from_secs(1));
        let rx1 = submit(&mut queue, "VO1R-10", 1);
        let rx2 = submit(&mut queue, "VO2R-20", 2);

        // Only the head goes on the wire.
        assert_eq!(queue.take_sendable().as_deref(), Some("VO1R-10"));
        assert_eq!(queue.take_sendable(), None);

        assert!(queue.on_report(&volume_report(1, -10)));
        assert!(matches!(
            rx1.await.unwrap(),
            Ok(Report::ZoneVolume { level: -10, .. })
        ));

        // The next head becomes sendable only after the first completes.
        assert_eq!(queue.take_sendable().as_deref(), Some("VO2R-20"));
        assert!(queue.on_report(&volume_report(2, -20)));
        assert!(rx2.await.unwrap().is_ok());
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn non_matching_report_is_unsolicited() {
        let mut queue = ExchangeQueue::new(Duration::from_secs(1));
        let _rx = submit(&mut queue, "VO1R-10", 1);
        queue.take_sendable();

        // A report for another zone does not complete the exchange.
        assert!(!queue.on_report(&volume_report(2, -20)));
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn report_before_send_never_completes() {
        let mut queue = ExchangeQueue::new(Duration::from_secs(1));
        let _rx = submit(&mut queue, "VO1R-10", 1);

        // Nothing is in flight yet, so even a matching report is
        // unsolicited.
        assert!(!queue.on_report(&volume_report(1, -10)));
    }

    #[tokio::test]
    async fn drain_cancels_everything() {
        let mut queue = ExchangeQueue::new(Duration::from_secs(1));
        let rx1 = submit(&mut queue, "VO1R-10", 1);
        let rx2 = submit(&mut queue, "VO2R-20", 2);
        queue.take_sendable();

        queue.drain(&ConnectionError::Cancelled);
        assert!(matches!(
            rx1.await.unwrap(),
            Err(HlxError::Connection(ConnectionError::Cancelled))
        ));
        assert!(matches!(
            rx2.await.unwrap(),
            Err(HlxError::Connection(ConnectionError::Cancelled))
        ));
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn fail_head_advances_the_queue() {
        let mut queue = ExchangeQueue::new(Duration::from_secs(1));
        let rx1 = submit(&mut queue, "VO1R-10", 1);
        let _rx2 = submit(&mut queue, "VO2R-20", 2);
        queue.take_sendable();

        queue.fail_head(ConnectionError::Timeout.into());
        assert!(matches!(
            rx1.await.unwrap(),
            Err(HlxError::Connection(ConnectionError::Timeout))
        ));
        assert_eq!(queue.take_sendable().as_deref(), Some("VO2R-20"));
    }

    #[tokio::test]
    async fn per_exchange_timeout_overrides_default() {
        tokio::time::pause();
        let mut queue = ExchangeQueue::new(Duration::from_secs(10));
        let (tx, _rx) = oneshot::channel();
        queue.push(
            Exchange::new("QO1".to_string(), volume_matcher(1))
                .with_timeout(Duration::from_millis(500)),
            tx,
        );
        let before = Instant::now();
        queue.take_sendable();
        let deadline = queue.head_deadline().unwrap();
        let delta = deadline - before;
        assert!(delta >= Duration::from_millis(500) && delta < Duration::from_secs(1));
    }
}
