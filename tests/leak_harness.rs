#[cfg(test)]
mod tests {

    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use crossbeam_channel::bounded;
    use parking_lot::Mutex;

    use leakwatch::leak::{
        run_harness, run_worker, Arm, Completion, HarnessError, Lane, LeakConfig, Violation,
    };
    use leakwatch::Signal;

    fn fast_config() -> LeakConfig {
        LeakConfig {
            worker_delay: Duration::from_millis(100),
            race_timeout: Duration::from_millis(30),
            observation: Duration::from_millis(300),
        }
    }

    #[test]
    fn test_default_timing() {
        let report = run_harness(&LeakConfig::default()).expect("Harness should hold");

        assert_eq!(report.winner, Arm::Timer, "Timer should win the first race");
        assert!(report.completion.buffered, "Buffered worker should finish");
        assert!(
            !report.completion.unbuffered,
            "Unbuffered worker should never finish"
        );
        assert_eq!(report.leaked.lane(), Lane::Unbuffered);
        assert!(
            report.leaked.is_blocked(),
            "Unbuffered worker should still be parked in its send"
        );
    }

    #[test]
    fn test_repeated_runs() {
        for run in 0..3 {
            let report = run_harness(&fast_config())
                .unwrap_or_else(|err| panic!("Run {run} should hold: {err}"));
            assert_eq!(report.winner, Arm::Timer);
            assert_eq!(
                report.completion,
                Completion {
                    buffered: true,
                    unbuffered: false
                }
            );
            assert!(report.leaked.is_blocked());
            report.leaked.abandon();
        }
    }

    #[test]
    fn test_invalid_timing() {
        let mut config = LeakConfig::default();
        config.race_timeout = config.worker_delay;
        assert!(matches!(
            run_harness(&config),
            Err(HarnessError::InvalidTiming { .. })
        ));

        let mut config = LeakConfig::default();
        config.observation = config.worker_delay;
        assert!(matches!(
            config.validate(),
            Err(HarnessError::InvalidTiming { .. })
        ));

        assert!(LeakConfig::default().validate().is_ok());
    }

    #[test]
    fn test_violation_is_unreachable() {
        let err = HarnessError::from(Violation::RaceLost(Lane::Buffered));
        assert_eq!(
            err.to_string(),
            "reached unreachable code: buffered channel won the race against the timer"
        );
    }

    #[test]
    fn test_buffered_worker_finishes() {
        let completion = Arc::new(Mutex::new(Completion::default()));
        let (tx, rx) = bounded(Lane::Buffered.capacity());

        let handle = thread::spawn({
            let completion = Arc::clone(&completion);
            move || run_worker(Lane::Buffered, Duration::from_millis(10), tx, completion)
        });
        assert!(
            handle.join().is_ok(),
            "Buffered worker should have ended peacefully"
        );

        assert!(completion.lock().buffered);
        assert_eq!(rx.try_recv(), Ok(Signal), "The slot should hold the signal");
    }

    #[test]
    fn test_unbuffered_worker_blocks_until_receivers_gone() {
        let completion = Arc::new(Mutex::new(Completion::default()));
        let (tx, rx) = bounded::<Signal>(Lane::Unbuffered.capacity());

        let handle = thread::spawn({
            let completion = Arc::clone(&completion);
            move || run_worker(Lane::Unbuffered, Duration::from_millis(10), tx, completion)
        });

        thread::sleep(Duration::from_millis(200));
        assert!(!handle.is_finished(), "Worker should be blocked in its send");
        assert!(!completion.lock().unbuffered);

        // Without receivers the send fails instead of blocking.
        drop(rx);
        assert!(handle.join().is_ok());
        assert!(
            !completion.lock().unbuffered,
            "An abandoned send must not flip the flag"
        );
    }
}
