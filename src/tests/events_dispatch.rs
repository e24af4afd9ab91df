use std::cell::RefCell;
use std::rc::Rc;

use crate::*;

fn recording_listener(log: &Rc<RefCell<Vec<&'static str>>>, label: &'static str) -> ListenerCallback {
    let log = Rc::clone(log);
    listener(move |_, _| {
        log.borrow_mut().push(label);
        Ok(())
    })
}

#[test]
fn listeners_fire_synchronously_in_registration_order() -> Result<()> {
    let mut rt = Runtime::new();
    let node = rt.create_node(NodeKind::Box);
    let log = Rc::new(RefCell::new(Vec::new()));
    rt.add_event_listener(node, "click", recording_listener(&log, "L1"))?;
    rt.add_event_listener(node, "click", recording_listener(&log, "L2"))?;
    let event = rt.dispatch_event(node, "click")?;
    assert_eq!(*log.borrow(), vec!["L1", "L2"]);
    assert_eq!(event.listeners_invoked, 2);
    assert_eq!(event.event_type, "click");
    assert_eq!(event.target, node);
    Ok(())
}

#[test]
fn listener_added_mid_dispatch_misses_the_current_dispatch() -> Result<()> {
    let mut rt = Runtime::new();
    let node = rt.create_node(NodeKind::Box);
    let log = Rc::new(RefCell::new(Vec::new()));
    let late = recording_listener(&log, "late");
    let adder = {
        let log = Rc::clone(&log);
        let late = Rc::clone(&late);
        listener(move |rt, event| {
            log.borrow_mut().push("adder");
            rt.add_event_listener(event.target, "click", Rc::clone(&late))?;
            Ok(())
        })
    };
    rt.add_event_listener(node, "click", adder)?;
    rt.dispatch_event(node, "click")?;
    assert_eq!(*log.borrow(), vec!["adder"]);
    rt.dispatch_event(node, "click")?;
    assert_eq!(*log.borrow(), vec!["adder", "adder", "late"]);
    Ok(())
}

#[test]
fn listener_removed_mid_dispatch_still_runs_in_current_snapshot() -> Result<()> {
    let mut rt = Runtime::new();
    let node = rt.create_node(NodeKind::Box);
    let log = Rc::new(RefCell::new(Vec::new()));
    let second = recording_listener(&log, "second");
    let remover = {
        let log = Rc::clone(&log);
        let second = Rc::clone(&second);
        listener(move |rt, event| {
            log.borrow_mut().push("remover");
            rt.remove_event_listener(event.target, "click", &second);
            Ok(())
        })
    };
    rt.add_event_listener(node, "click", remover)?;
    rt.add_event_listener(node, "click", second)?;
    rt.dispatch_event(node, "click")?;
    assert_eq!(*log.borrow(), vec!["remover", "second"]);
    rt.dispatch_event(node, "click")?;
    assert_eq!(*log.borrow(), vec!["remover", "second", "remover"]);
    Ok(())
}

#[test]
fn remove_event_listener_matches_by_identity() -> Result<()> {
    let mut rt = Runtime::new();
    let node = rt.create_node(NodeKind::Box);
    let other = rt.create_node(NodeKind::Box);
    let log = Rc::new(RefCell::new(Vec::new()));
    let callback = recording_listener(&log, "cb");
    rt.add_event_listener(node, "click", Rc::clone(&callback))?;
    assert!(!rt.remove_event_listener(node, "hover", &callback));
    assert!(!rt.remove_event_listener(other, "click", &callback));
    assert!(rt.remove_event_listener(node, "click", &callback));
    assert!(!rt.remove_event_listener(node, "click", &callback));
    rt.dispatch_event(node, "click")?;
    assert!(log.borrow().is_empty());
    Ok(())
}

#[test]
fn same_callback_registered_twice_fires_twice() -> Result<()> {
    let mut rt = Runtime::new();
    let node = rt.create_node(NodeKind::Box);
    let log = Rc::new(RefCell::new(Vec::new()));
    let callback = recording_listener(&log, "cb");
    rt.add_event_listener(node, "click", Rc::clone(&callback))?;
    rt.add_event_listener(node, "click", Rc::clone(&callback))?;
    rt.dispatch_event(node, "click")?;
    assert_eq!(*log.borrow(), vec!["cb", "cb"]);
    assert!(rt.remove_event_listener(node, "click", &callback));
    rt.dispatch_event(node, "click")?;
    assert_eq!(*log.borrow(), vec!["cb", "cb", "cb"]);
    Ok(())
}

#[test]
fn dispatch_without_listeners_invokes_nothing() -> Result<()> {
    let mut rt = Runtime::new();
    let node = rt.create_node(NodeKind::Box);
    let event = rt.dispatch_event(node, "click")?;
    assert_eq!(event.listeners_invoked, 0);
    Ok(())
}

#[test]
fn dispatch_targets_exactly_the_named_node() -> Result<()> {
    let mut rt = Runtime::new();
    let root = rt.root();
    let parent = rt.create_node(NodeKind::Box);
    let child = rt.create_node(NodeKind::Box);
    rt.append_child(root, parent)?;
    rt.append_child(parent, child)?;
    let log = Rc::new(RefCell::new(Vec::new()));
    rt.add_event_listener(parent, "click", recording_listener(&log, "parent"))?;
    rt.add_event_listener(child, "click", recording_listener(&log, "child"))?;
    // No bubbling: the parent's listener must not see the child's event.
    rt.dispatch_event(child, "click")?;
    assert_eq!(*log.borrow(), vec!["child"]);
    Ok(())
}

#[test]
fn dispatch_to_unknown_node_fails() {
    let mut rt = Runtime::new();
    assert!(matches!(
        rt.dispatch_event(NodeId(999), "click"),
        Err(Error::UnknownNode(_))
    ));
}

#[test]
fn unknown_node_registration_fails_but_removal_is_a_silent_miss() {
    let mut rt = Runtime::new();
    let callback = listener(|_, _| Ok(()));
    assert!(matches!(
        rt.add_event_listener(NodeId(999), "click", Rc::clone(&callback)),
        Err(Error::UnknownNode(_))
    ));
    assert!(!rt.remove_event_listener(NodeId(999), "click", &callback));
}

#[test]
fn event_timestamp_is_the_logical_clock() -> Result<()> {
    let mut rt = Runtime::new();
    let node = rt.create_node(NodeKind::Box);
    let stamp = Rc::new(RefCell::new(None));
    {
        let stamp = Rc::clone(&stamp);
        rt.add_event_listener(
            node,
            "ping",
            listener(move |_, event| {
                *stamp.borrow_mut() = Some(event.time_stamp_ms);
                Ok(())
            }),
        )?;
    }
    rt.register_timer(250, false, move |rt| {
        rt.dispatch_event(node, "ping")?;
        Ok(())
    })?;
    rt.run()?;
    assert_eq!(*stamp.borrow(), Some(250));
    Ok(())
}

#[test]
fn listener_mutations_of_the_tree_apply_immediately() -> Result<()> {
    let mut rt = Runtime::new();
    let root = rt.root();
    let node = rt.create_node(NodeKind::Box);
    rt.append_child(root, node)?;
    rt.add_event_listener(
        node,
        "grow",
        listener(|rt, event| {
            let child = rt.create_node(NodeKind::Box);
            rt.append_child(event.target, child)?;
            Ok(())
        }),
    )?;
    rt.dispatch_event(node, "grow")?;
    assert_eq!(rt.children(node).len(), 1);
    rt.dispatch_event(node, "grow")?;
    assert_eq!(rt.children(node).len(), 2);
    Ok(())
}

#[test]
fn listener_error_propagates_and_skips_later_listeners() -> Result<()> {
    let mut rt = Runtime::new();
    let node = rt.create_node(NodeKind::Box);
    let log = Rc::new(RefCell::new(Vec::new()));
    rt.add_event_listener(node, "click", listener(|_, _| Err(Error::script("bad"))))?;
    rt.add_event_listener(node, "click", recording_listener(&log, "after"))?;
    assert!(rt.dispatch_event(node, "click").is_err());
    assert!(log.borrow().is_empty());
    Ok(())
}

#[test]
fn listener_error_inside_timer_becomes_callback_failure() -> Result<()> {
    let mut rt = Runtime::new();
    let node = rt.create_node(NodeKind::Box);
    rt.add_event_listener(node, "click", listener(|_, _| Err(Error::script("bad"))))?;
    rt.register_timer(10, false, move |rt| {
        rt.dispatch_event(node, "click")?;
        Ok(())
    })?;
    rt.register_timer(20, false, |rt| {
        rt.print("still running");
        Ok(())
    })?;
    rt.run()?;
    assert_eq!(rt.take_output(), vec!["still running"]);
    assert_eq!(rt.take_callback_failures().len(), 1);
    Ok(())
}
