use treadle::{Fault, Resolution, Resume, Runtime, Scope, Step};

use std::cell::RefCell;
use std::rc::Rc;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn lookup_failure_is_delivered_as_a_value() {
    init_logging();

    let outcome: Rc<RefCell<Vec<Result<Resolution, String>>>> = Rc::new(RefCell::new(Vec::new()));
    let mut rt = Runtime::new().expect("runtime should build");

    let sink = outcome.clone();
    rt.attach(
        move |scope: &mut Scope<'_>, input: Resume| -> Result<Step, Fault> {
            match input {
                Resume::Start(_) => Ok(Step::Wait(
                    scope.resolve("nonexistent-host.invalid", Some("80")),
                )),
                Resume::Resolved(result) => {
                    sink.borrow_mut().push(result);
                    Ok(Step::Done(Vec::new()))
                }
                _ => unreachable!("task only resolves"),
            }
        },
        Vec::new(),
    );

    rt.run().expect("a failed lookup must not abort the loop");

    let outcome = outcome.borrow();
    assert_eq!(outcome.len(), 1, "exactly one completion is delivered");
    let err = outcome[0]
        .as_ref()
        .expect_err("a reserved .invalid name cannot resolve");
    assert!(!err.is_empty(), "the OS error string is passed through");

    assert_eq!(rt.pending_resolutions(), 0);
}

#[test]
fn localhost_lookup_resumes_with_one_result() {
    init_logging();

    let outcome: Rc<RefCell<Vec<Result<Resolution, String>>>> = Rc::new(RefCell::new(Vec::new()));
    let mut rt = Runtime::new().expect("runtime should build");

    let sink = outcome.clone();
    rt.attach(
        move |scope: &mut Scope<'_>, input: Resume| -> Result<Step, Fault> {
            match input {
                Resume::Start(_) => Ok(Step::Wait(scope.resolve("localhost", Some("80")))),
                Resume::Resolved(result) => {
                    sink.borrow_mut().push(result);
                    Ok(Step::Done(Vec::new()))
                }
                _ => unreachable!("task only resolves"),
            }
        },
        Vec::new(),
    );

    rt.run().expect("loop should drain");

    let outcome = outcome.borrow();
    assert_eq!(outcome.len(), 1, "exactly one completion is delivered");

    // Hermetic environments may refuse even loopback lookups; when the
    // lookup succeeds, the record must be populated.
    if let Ok(resolution) = &outcome[0] {
        assert!(
            resolution.family == libc::AF_INET || resolution.family == libc::AF_INET6,
            "unexpected address family {}",
            resolution.family
        );
        assert!(!resolution.addr.is_empty(), "raw sockaddr bytes present");
    }

    assert_eq!(rt.pending_resolutions(), 0);
}

#[test]
fn concurrent_lookups_share_one_completion_channel() {
    init_logging();

    let completions = Rc::new(RefCell::new(0usize));
    let mut rt = Runtime::new().expect("runtime should build");

    for host in ["localhost", "one.nonexistent.invalid", "two.nonexistent.invalid"] {
        let sink = completions.clone();
        rt.attach(
            move |scope: &mut Scope<'_>, input: Resume| -> Result<Step, Fault> {
                match input {
                    Resume::Start(_) => Ok(Step::Wait(scope.resolve(host, None))),
                    Resume::Resolved(_) => {
                        *sink.borrow_mut() += 1;
                        Ok(Step::Done(Vec::new()))
                    }
                    _ => unreachable!("task only resolves"),
                }
            },
            Vec::new(),
        );
    }

    rt.run().expect("loop should drain");

    assert_eq!(*completions.borrow(), 3, "each task resumes exactly once");
    assert_eq!(rt.pending_resolutions(), 0);
}
