use treadle::{Fault, Resume, Runtime, Scope, State, Step, Wait};

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

fn pair_child(_: &mut Scope<'_>, _: Resume) -> Result<Step, Fault> {
    Ok(Step::Done(vec![
        Box::new(1i32) as Box<dyn Any>,
        Box::new(2i32),
    ]))
}

#[test]
fn attach_wait_delivers_child_values_once_in_order() {
    let deliveries: Rc<RefCell<Vec<(i32, i32)>>> = Rc::new(RefCell::new(Vec::new()));
    let mut rt = Runtime::new().expect("runtime should build");

    let sink = deliveries.clone();
    let parent = rt.attach(
        move |scope: &mut Scope<'_>, input: Resume| -> Result<Step, Fault> {
            match input {
                Resume::Start(_) => Ok(Step::Wait(scope.attach_wait(pair_child, Vec::new()))),
                Resume::Joined(values) => {
                    let mut values = values.into_iter();
                    let first = *values
                        .next()
                        .and_then(|v| v.downcast::<i32>().ok())
                        .expect("first value");
                    let second = *values
                        .next()
                        .and_then(|v| v.downcast::<i32>().ok())
                        .expect("second value");
                    sink.borrow_mut().push((first, second));
                    Ok(Step::Done(Vec::new()))
                }
                _ => unreachable!("parent only joins"),
            }
        },
        Vec::new(),
    );

    rt.run().expect("loop should drain");

    assert_eq!(*deliveries.borrow(), vec![(1, 2)]);
    assert_eq!(rt.state(parent), State::Finished);
}

#[test]
fn joined_values_propagate_through_a_chain() {
    let seen: Rc<RefCell<Vec<i32>>> = Rc::new(RefCell::new(Vec::new()));
    let mut rt = Runtime::new().expect("runtime should build");

    fn leaf(_: &mut Scope<'_>, _: Resume) -> Result<Step, Fault> {
        Ok(Step::Done(vec![Box::new(7i32) as Box<dyn Any>]))
    }

    fn middle(scope: &mut Scope<'_>, input: Resume) -> Result<Step, Fault> {
        match input {
            Resume::Start(_) => Ok(Step::Wait(scope.attach_wait(leaf, Vec::new()))),
            // Forward the leaf's values unchanged.
            Resume::Joined(values) => Ok(Step::Done(values)),
            _ => unreachable!("middle only joins"),
        }
    }

    let sink = seen.clone();
    rt.attach(
        move |scope: &mut Scope<'_>, input: Resume| -> Result<Step, Fault> {
            match input {
                Resume::Start(_) => Ok(Step::Wait(scope.attach_wait(middle, Vec::new()))),
                Resume::Joined(values) => {
                    for value in values {
                        sink.borrow_mut()
                            .push(*value.downcast::<i32>().expect("i32 value"));
                    }
                    Ok(Step::Done(Vec::new()))
                }
                _ => unreachable!("root only joins"),
            }
        },
        Vec::new(),
    );

    rt.run().expect("loop should drain");
    assert_eq!(*seen.borrow(), vec![7]);
}

#[test]
fn join_wait_deferred_past_its_resumption_is_a_usage_error() {
    let mut rt = Runtime::new().expect("runtime should build");

    // Records the join, parks on a timer instead, and only yields the
    // stashed join one resumption later. By then the child has finished
    // and the recording has expired, so the yield must fail rather than
    // park the parent forever.
    let mut stashed: Option<Wait> = None;
    let parent = rt.attach(
        move |scope: &mut Scope<'_>, input: Resume| -> Result<Step, Fault> {
            match input {
                Resume::Start(_) => {
                    stashed = Some(scope.attach_wait(pair_child, Vec::new()));
                    Ok(Step::Wait(Wait::Timeout(Duration::from_millis(5))))
                }
                _ => Ok(Step::Wait(stashed.take().expect("stashed join"))),
            }
        },
        Vec::new(),
    );

    rt.run().expect("loop should drain");

    assert_eq!(
        rt.state(parent),
        State::Finished,
        "the parent must be discarded, not left waiting"
    );
}

#[test]
fn forged_join_wait_discards_only_the_forger() {
    let resumed = Rc::new(RefCell::new(0u32));
    let mut rt = Runtime::new().expect("runtime should build");

    let sink = resumed.clone();
    let victim = rt.attach(
        move |_: &mut Scope<'_>, input: Resume| -> Result<Step, Fault> {
            match input {
                Resume::Start(_) => Ok(Step::Wait(Wait::Timeout(Duration::from_millis(5)))),
                _ => {
                    *sink.borrow_mut() += 1;
                    Ok(Step::Done(Vec::new()))
                }
            }
        },
        Vec::new(),
    );

    // Yields a join wait that attach_wait never produced.
    let forger = rt.attach(
        move |_: &mut Scope<'_>, _: Resume| -> Result<Step, Fault> {
            Ok(Step::Wait(Wait::Join(victim)))
        },
        Vec::new(),
    );

    rt.run().expect("loop should drain");

    assert_eq!(rt.state(forger), State::Finished);
    assert_eq!(*resumed.borrow(), 1, "the victim still completes its wait");
}
