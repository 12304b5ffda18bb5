//! Tests for both scheduler models.

use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use std::time::Duration;

use camino::Utf8PathBuf;
use rstest::rstest;
use serde_json::{Value, json};

use cadlink_config::EngineKind;

use super::*;
use crate::kernel::AnalyticKernel;

const WORKERS: usize = 8;
const TICK: Duration = Duration::from_millis(5);

fn session() -> EngineSession {
    EngineSession::new(
        EngineKind::Mesh,
        Arc::new(AnalyticKernel::new()),
        Utf8PathBuf::from("."),
    )
}

fn job<F>(work: F) -> JobRequest
where
    F: FnOnce(&mut EngineSession) -> Result<Value, HandlerError> + Send + 'static,
{
    JobRequest::new("test", 0, Box::new(work))
}

/// Reads the revision, yields, then writes it back incremented. Lost updates
/// would show up as a final revision below the number of jobs.
fn read_sleep_write(session: &mut EngineSession) -> Result<Value, HandlerError> {
    let seen = session.revision();
    thread::sleep(Duration::from_millis(2));
    while session.revision() == seen {
        session.touch();
    }
    Ok(json!(seen))
}

fn hammer(scheduler: &Arc<dyn Scheduler>) {
    let barrier = Arc::new(Barrier::new(WORKERS));
    let workers: Vec<_> = (0..WORKERS)
        .map(|_| {
            let scheduler = Arc::clone(scheduler);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                scheduler.execute(job(read_sleep_write)).expect("job result")
            })
        })
        .collect();
    for worker in workers {
        worker.join().expect("worker thread");
    }
}

#[rstest]
fn lock_scheduler_never_overlaps_jobs() {
    let scheduler = Arc::new(LockScheduler::new(session()));
    let shared: Arc<dyn Scheduler> = scheduler.clone();
    hammer(&shared);
    drop(shared);

    let scheduler = Arc::try_unwrap(scheduler).expect("sole owner");
    let session = scheduler.into_session().expect("session");
    assert_eq!(session.revision(), WORKERS as u64);
}

#[rstest]
fn main_loop_never_overlaps_jobs() {
    let (scheduler, main_loop) = main_loop(session());
    let runner = thread::spawn(move || main_loop.run(TICK));
    let scheduler: Arc<dyn Scheduler> = Arc::new(scheduler);

    hammer(&scheduler);
    scheduler.close();

    let session = runner.join().expect("main loop thread");
    assert_eq!(session.revision(), WORKERS as u64);
}

#[rstest]
fn main_loop_runs_jobs_in_submission_order() {
    let (scheduler, main_loop) = main_loop(session());
    let runner = thread::spawn(move || main_loop.run(TICK));
    let order = Arc::new(Mutex::new(Vec::new()));

    for index in 0..20 {
        let order = Arc::clone(&order);
        scheduler
            .execute(job(move |_| {
                order.lock().expect("order lock").push(index);
                Ok(Value::Null)
            }))
            .expect("job result");
    }
    scheduler.close();
    runner.join().expect("main loop thread");

    let order = order.lock().expect("order lock").clone();
    assert_eq!(order, (0..20).collect::<Vec<_>>());
}

#[rstest]
fn tick_drains_everything_queued() {
    let (scheduler, mut main_loop) = main_loop(session());
    let scheduler = Arc::new(scheduler);
    let submitters: Vec<_> = (0..3)
        .map(|_| {
            let scheduler = Arc::clone(&scheduler);
            thread::spawn(move || scheduler.execute(job(|session| {
                session.touch();
                Ok(Value::Null)
            })))
        })
        .collect();

    let mut executed = 0;
    while executed < 3 {
        executed += main_loop.tick().executed;
        thread::sleep(Duration::from_millis(1));
    }
    for submitter in submitters {
        submitter
            .join()
            .expect("submitter thread")
            .expect("job result");
    }
    assert_eq!(main_loop.session().revision(), 3);

    scheduler.close();
    assert!(main_loop.tick().finished);
}

#[rstest]
#[case::main_loop(true)]
#[case::lock(false)]
fn a_panicking_job_does_not_poison_later_jobs(#[case] use_main_loop: bool) {
    let (scheduler, runner): (Arc<dyn Scheduler>, Option<thread::JoinHandle<EngineSession>>) =
        if use_main_loop {
            let (scheduler, main_loop) = main_loop(session());
            (
                Arc::new(scheduler),
                Some(thread::spawn(move || main_loop.run(TICK))),
            )
        } else {
            (Arc::new(LockScheduler::new(session())), None)
        };

    let error = scheduler
        .execute(job(|_| panic!("boom")))
        .expect_err("panic must be reported");
    assert!(matches!(&error, ExecutionError::Panicked { message } if message == "boom"));

    let value = scheduler
        .execute(job(|session| {
            session.touch();
            Ok(json!(session.revision()))
        }))
        .expect("later job succeeds");
    assert_eq!(value, json!(1));

    scheduler.close();
    if let Some(runner) = runner {
        runner.join().expect("main loop thread");
    }
}

#[rstest]
#[case::main_loop(true)]
#[case::lock(false)]
fn closed_schedulers_refuse_new_jobs(#[case] use_main_loop: bool) {
    let scheduler: Arc<dyn Scheduler> = if use_main_loop {
        Arc::new(main_loop(session()).0)
    } else {
        Arc::new(LockScheduler::new(session()))
    };
    scheduler.close();
    let error = scheduler
        .execute(job(|_| Ok(Value::Null)))
        .expect_err("closed scheduler");
    assert!(matches!(error, ExecutionError::ShuttingDown));
}

#[rstest]
fn accepted_jobs_complete_after_close() {
    let (scheduler, main_loop) = main_loop(session());
    let scheduler = Arc::new(scheduler);
    let pending: Vec<_> = (0..4)
        .map(|_| {
            let scheduler = Arc::clone(&scheduler);
            thread::spawn(move || scheduler.execute(job(|session| {
                session.touch();
                Ok(Value::Null)
            })))
        })
        .collect();

    // Give the submitters time to enqueue before closing, then start the loop.
    while main_loop.pending() < 4 {
        thread::sleep(Duration::from_millis(1));
    }
    scheduler.close();
    let session = main_loop.run(TICK);

    assert_eq!(session.revision(), 4);
    for submitter in pending {
        assert!(submitter.join().expect("submitter thread").is_ok());
    }
}

#[rstest]
fn handler_errors_pass_through() {
    let scheduler = LockScheduler::new(session());
    let error = scheduler
        .execute(job(|_| Err(HandlerError::validation("bad"))))
        .expect_err("handler error");
    assert!(matches!(error, ExecutionError::Handler(HandlerError::Fault { .. })));
    assert_eq!(scheduler.model(), ExecutionModel::Lock);
}
