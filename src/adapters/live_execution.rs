//! Live execution adapter: broker delegation behind a timeout.
//!
//! Wraps any [`BrokerPort`] in the execution contract. The broker call runs
//! on a helper thread; if it does not answer within the caller-supplied
//! timeout the order is treated as `Rejected(Timeout)` and is never retried
//! in place: an in-flight order that might still land must not be
//! resubmitted by this core, so retry policy stays with the caller.

use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use tracing::warn;

use crate::domain::execution::{ExecutionPort, Order, RejectReason, Submission};
use crate::ports::broker_port::BrokerPort;

pub struct LiveExecution<B: BrokerPort + Send + 'static> {
    broker: Arc<Mutex<B>>,
    timeout: Duration,
}

impl<B: BrokerPort + Send + 'static> LiveExecution<B> {
    pub fn new(broker: B, timeout: Duration) -> Self {
        LiveExecution {
            broker: Arc::new(Mutex::new(broker)),
            timeout,
        }
    }

    pub fn broker(&self) -> Arc<Mutex<B>> {
        Arc::clone(&self.broker)
    }
}

impl<B: BrokerPort + Send + 'static> ExecutionPort for LiveExecution<B> {
    fn submit(&mut self, order: &Order) -> Submission {
        let (tx, rx) = mpsc::channel();
        let broker = Arc::clone(&self.broker);
        let order = order.clone();

        thread::spawn(move || {
            let submission = match broker.lock() {
                Ok(mut broker) => broker.submit(&order),
                Err(_) => Submission::Rejected(RejectReason::Broker(
                    "broker state poisoned".into(),
                )),
            };
            // The receiver may have given up already; nothing to do then.
            let _ = tx.send(submission);
        });

        match rx.recv_timeout(self.timeout) {
            Ok(submission) => submission,
            Err(_) => {
                warn!(timeout_ms = self.timeout.as_millis() as u64, "order timed out");
                Submission::Rejected(RejectReason::Timeout)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::KvantError;
    use crate::domain::execution::{Fill, OrderSide};
    use crate::ports::broker_port::BrokerPosition;
    use chrono::NaiveDate;

    struct FakeBroker {
        delay: Duration,
        response: Submission,
        submissions: usize,
    }

    impl BrokerPort for FakeBroker {
        fn submit(&mut self, _order: &Order) -> Submission {
            self.submissions += 1;
            thread::sleep(self.delay);
            self.response.clone()
        }

        fn open_positions(&self) -> Result<Vec<BrokerPosition>, KvantError> {
            Ok(Vec::new())
        }
    }

    fn order() -> Order {
        Order {
            symbol: "SBER".into(),
            side: OrderSide::Buy,
            notional: 45000.0,
            price: 270.0,
            ts: NaiveDate::from_ymd_opt(2024, 1, 15)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        }
    }

    fn fill() -> Submission {
        Submission::Filled(Fill {
            price: 270.0,
            commission: 135.0,
            ts: NaiveDate::from_ymd_opt(2024, 1, 15)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        })
    }

    #[test]
    fn prompt_broker_response_passes_through() {
        let broker = FakeBroker {
            delay: Duration::ZERO,
            response: fill(),
            submissions: 0,
        };
        let mut exec = LiveExecution::new(broker, Duration::from_secs(1));

        assert_eq!(exec.submit(&order()), fill());
    }

    #[test]
    fn broker_rejection_passes_through() {
        let broker = FakeBroker {
            delay: Duration::ZERO,
            response: Submission::Rejected(RejectReason::Broker("insufficient margin".into())),
            submissions: 0,
        };
        let mut exec = LiveExecution::new(broker, Duration::from_secs(1));

        assert_eq!(
            exec.submit(&order()),
            Submission::Rejected(RejectReason::Broker("insufficient margin".into()))
        );
    }

    #[test]
    fn slow_broker_times_out_without_resubmit() {
        let broker = FakeBroker {
            delay: Duration::from_millis(200),
            response: fill(),
            submissions: 0,
        };
        let mut exec = LiveExecution::new(broker, Duration::from_millis(10));

        assert_eq!(
            exec.submit(&order()),
            Submission::Rejected(RejectReason::Timeout)
        );

        // Exactly one submission reached the broker.
        thread::sleep(Duration::from_millis(300));
        let shared = exec.broker();
        let broker = shared.lock().unwrap();
        assert_eq!(broker.submissions, 1);
    }
}
