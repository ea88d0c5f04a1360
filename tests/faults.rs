use treadle::{Error, Fault, Resume, Runtime, RuntimeBuilder, Scope, State, Step, Wait};

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

#[test]
fn malformed_wait_discards_only_the_offender() {
    let resumed = Rc::new(RefCell::new(false));
    let mut rt = Runtime::new().expect("runtime should build");

    let offender = rt.attach(
        |_: &mut Scope<'_>, _: Resume| -> Result<Step, Fault> {
            Ok(Step::Wait(Wait::Read(-1)))
        },
        Vec::new(),
    );

    let sink = resumed.clone();
    let sibling = rt.attach(
        move |_: &mut Scope<'_>, input: Resume| -> Result<Step, Fault> {
            match input {
                Resume::Start(_) => Ok(Step::Wait(Wait::Timeout(Duration::from_millis(10)))),
                _ => {
                    *sink.borrow_mut() = true;
                    Ok(Step::Done(Vec::new()))
                }
            }
        },
        Vec::new(),
    );

    rt.run()
        .expect("a protocol violation must not abort the loop");

    assert_eq!(rt.state(offender), State::Finished);
    assert_eq!(rt.state(sibling), State::Finished);
    assert!(*resumed.borrow(), "valid waits still complete");
}

#[test]
fn task_fault_aborts_the_loop_by_default() {
    let mut rt = Runtime::new().expect("runtime should build");

    rt.attach(
        |_: &mut Scope<'_>, _: Resume| -> Result<Step, Fault> { Err("boom".into()) },
        Vec::new(),
    );

    let err = rt.run().expect_err("the fault must propagate");
    assert!(matches!(err, Error::Task(_)), "unexpected error: {err}");
}

#[test]
fn isolated_fault_keeps_other_tasks_running() {
    let resumed = Rc::new(RefCell::new(false));
    let mut rt = RuntimeBuilder::new()
        .isolate_faults(true)
        .build()
        .expect("runtime should build");

    let faulty = rt.attach(
        |_: &mut Scope<'_>, _: Resume| -> Result<Step, Fault> { Err("boom".into()) },
        Vec::new(),
    );

    let sink = resumed.clone();
    rt.attach(
        move |_: &mut Scope<'_>, input: Resume| -> Result<Step, Fault> {
            match input {
                Resume::Start(_) => Ok(Step::Wait(Wait::Timeout(Duration::from_millis(10)))),
                _ => {
                    *sink.borrow_mut() = true;
                    Ok(Step::Done(Vec::new()))
                }
            }
        },
        Vec::new(),
    );

    rt.run().expect("isolated faults must not abort the loop");

    assert_eq!(rt.state(faulty), State::Finished);
    assert!(*resumed.borrow());
}
