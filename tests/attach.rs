use treadle::{Fault, Resume, Runtime, Scope, State, Step, Wait};

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

#[test]
fn immediate_task_finishes_after_one_run() {
    let mut rt = Runtime::new().expect("runtime should build");

    let id = rt.attach(
        |_: &mut Scope<'_>, _: Resume| -> Result<Step, Fault> {
            Ok(Step::Done(vec![Box::new(42i32) as Box<dyn Any>]))
        },
        Vec::new(),
    );

    assert_eq!(rt.state(id), State::NotStarted);
    assert_eq!(rt.task_count(), 1);

    rt.run().expect("loop should drain");

    assert_eq!(rt.state(id), State::Finished);
    assert_eq!(rt.task_count(), 0, "a finished task leaves the registry");
}

#[test]
fn start_arguments_are_delivered_in_order() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let mut rt = Runtime::new().expect("runtime should build");

    let sink = seen.clone();
    rt.attach(
        move |_: &mut Scope<'_>, input: Resume| -> Result<Step, Fault> {
            if let Resume::Start(args) = input {
                for arg in args {
                    sink.borrow_mut()
                        .push(*arg.downcast::<i32>().expect("i32 argument"));
                }
            }
            Ok(Step::Done(Vec::new()))
        },
        vec![
            Box::new(1i32) as Box<dyn Any>,
            Box::new(2i32),
            Box::new(3i32),
        ],
    );

    rt.run().expect("loop should drain");
    assert_eq!(*seen.borrow(), vec![1, 2, 3]);
}

#[test]
fn pre_attached_tasks_start_before_any_event_callback() {
    let log: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));
    let mut rt = Runtime::new().expect("runtime should build");

    let log_a = log.clone();
    rt.attach(
        move |_: &mut Scope<'_>, input: Resume| -> Result<Step, Fault> {
            match input {
                Resume::Start(_) => {
                    log_a.borrow_mut().push("a-start");
                    Ok(Step::Wait(Wait::Timeout(Duration::from_millis(1))))
                }
                _ => {
                    log_a.borrow_mut().push("a-resumed");
                    Ok(Step::Done(Vec::new()))
                }
            }
        },
        Vec::new(),
    );

    let log_b = log.clone();
    rt.attach(
        move |_: &mut Scope<'_>, _: Resume| -> Result<Step, Fault> {
            log_b.borrow_mut().push("b-start");
            Ok(Step::Done(Vec::new()))
        },
        Vec::new(),
    );

    rt.run().expect("loop should drain");

    // Both tasks run to their first yield or completion before the
    // timer callback fires.
    assert_eq!(*log.borrow(), vec!["a-start", "b-start", "a-resumed"]);
}

#[test]
fn task_attached_during_start_pass_runs_on_the_next_pass() {
    let log: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));
    let mut rt = Runtime::new().expect("runtime should build");

    let log_a = log.clone();
    rt.attach(
        move |scope: &mut Scope<'_>, _: Resume| -> Result<Step, Fault> {
            let sink = log_a.clone();
            scope.attach(
                move |_: &mut Scope<'_>, _: Resume| -> Result<Step, Fault> {
                    sink.borrow_mut().push("c");
                    Ok(Step::Done(Vec::new()))
                },
                Vec::new(),
            );
            log_a.borrow_mut().push("a");
            Ok(Step::Done(Vec::new()))
        },
        Vec::new(),
    );

    let log_b = log.clone();
    rt.attach(
        move |_: &mut Scope<'_>, _: Resume| -> Result<Step, Fault> {
            log_b.borrow_mut().push("b");
            Ok(Step::Done(Vec::new()))
        },
        Vec::new(),
    );

    rt.run().expect("loop should drain");

    // "c" is attached while the first snapshot is running, so it starts
    // strictly after the snapshot is exhausted.
    assert_eq!(*log.borrow(), vec!["a", "b", "c"]);
}

#[test]
fn poll_once_reports_remaining_work() {
    let mut rt = Runtime::new().expect("runtime should build");

    let waiting = rt.attach(
        |_: &mut Scope<'_>, input: Resume| -> Result<Step, Fault> {
            match input {
                Resume::Start(_) => Ok(Step::Wait(Wait::Timeout(Duration::from_secs(60)))),
                _ => Ok(Step::Done(Vec::new())),
            }
        },
        Vec::new(),
    );

    let remaining = rt.poll_once().expect("poll should succeed");
    assert!(remaining, "a timer watch is still outstanding");
    assert_eq!(rt.state(waiting), State::Waiting);
}

#[test]
fn multiplexer_name_is_reported() {
    let rt = Runtime::new().expect("runtime should build");
    assert_eq!(rt.backend_name(), "epoll");
}
