use std::cell::{Cell, RefCell};
use std::rc::Rc;

use scene_host::{listener, Color, NodeKind, Result, Runtime, TimerHandle};

#[test]
fn deferred_work_beats_every_timer_and_ties_break_by_registration() -> Result<()> {
    let mut rt = Runtime::new();

    // Registered first but due last.
    rt.register_timer(2000, false, |rt| {
        rt.print("T1");
        Ok(())
    })?;

    rt.enqueue_deferred(|rt| {
        rt.print("continuation");
        Ok(())
    });

    let handle = Rc::new(Cell::new(None::<TimerHandle>));
    let ticks = Rc::new(Cell::new(0u32));
    let registered = {
        let handle = Rc::clone(&handle);
        let ticks = Rc::clone(&ticks);
        rt.register_timer(500, true, move |rt| {
            ticks.set(ticks.get() + 1);
            let now = rt.now_ms();
            rt.print(format!("T2@{now}"));
            if ticks.get() >= 3 {
                if let Some(handle) = handle.get() {
                    rt.cancel_timer(handle);
                }
            }
            Ok(())
        })?
    };
    handle.set(Some(registered));

    rt.run()?;
    assert_eq!(
        rt.take_output(),
        vec!["continuation", "T2@500", "T2@1000", "T2@1500", "T1"]
    );
    assert_eq!(rt.now_ms(), 2000);
    assert!(rt.pending_timers().is_empty());
    Ok(())
}

#[test]
fn timer_driven_tree_build_feeds_the_next_layout_pass() -> Result<()> {
    let mut rt = Runtime::new();
    let panel_slot = Rc::new(Cell::new(None));
    {
        let panel_slot = Rc::clone(&panel_slot);
        rt.register_timer(500, false, move |rt| {
            let root = rt.root();
            let panel = rt.create_node(NodeKind::Box);
            rt.append_child(root, panel)?;
            rt.set_attribute(panel, "backgroundColor", "#FF0000")?;
            rt.set_attribute(panel, "margin", 10.0)?;
            let label = rt.create_text_node("hello");
            rt.append_child(panel, label)?;
            panel_slot.set(Some(panel));
            Ok(())
        })?;
    }
    rt.run()?;

    let panel = panel_slot.get().ok_or_else(|| {
        scene_host::Error::script("panel was never built")
    })?;
    assert!(rt.is_attached(panel));
    assert_eq!(rt.background_color(panel), Some(Color::new(255, 0, 0, 255)));

    rt.update_layout();
    let rect = rt.layout_of(panel).ok_or_else(|| {
        scene_host::Error::script("panel missing from layout")
    })?;
    assert_eq!(
        (rect.x, rect.y, rect.width, rect.height),
        (10.0, 10.0, 980.0, 580.0)
    );
    Ok(())
}

#[test]
fn click_listeners_run_in_registration_order_with_the_logical_timestamp() -> Result<()> {
    let mut rt = Runtime::new();
    let root = rt.root();
    let button = rt.create_node(NodeKind::Box);
    rt.append_child(root, button)?;

    let log = Rc::new(RefCell::new(Vec::new()));
    for label in ["first", "second"] {
        let log = Rc::clone(&log);
        rt.add_event_listener(
            button,
            "click",
            listener(move |_, event| {
                log.borrow_mut().push(format!("{label}@{}", event.time_stamp_ms));
                Ok(())
            }),
        )?;
    }

    rt.advance_time(750)?;
    rt.update_layout();
    let event = rt.click_at(500.0, 300.0)?;
    assert_eq!(event.map(|event| event.listeners_invoked), Some(2));
    assert_eq!(*log.borrow(), vec!["first@750", "second@750"]);
    Ok(())
}

// A full application-shaped run: synchronous setup output first, then the
// scheduler interleaves intervals, cancellations, and deferred continuations.
#[test]
fn mixed_timer_interval_and_deferred_script_runs_to_completion() -> Result<()> {
    let mut rt = Runtime::new();
    rt.print("Main script executed");

    let doomed = rt.register_timer(2000, false, |rt| {
        rt.print("doomed fired");
        Ok(())
    })?;

    let interval_handle = Rc::new(Cell::new(None::<TimerHandle>));
    let interval_ticks = Rc::new(Cell::new(0u32));
    let registered = {
        let interval_handle = Rc::clone(&interval_handle);
        let interval_ticks = Rc::clone(&interval_ticks);
        rt.register_timer(500, true, move |rt| {
            interval_ticks.set(interval_ticks.get() + 1);
            rt.print(format!("interval {}", interval_ticks.get()));
            if interval_ticks.get() >= 3 {
                if let Some(handle) = interval_handle.get() {
                    rt.cancel_timer(handle);
                }
            }
            Ok(())
        })?
    };
    interval_handle.set(Some(registered));

    rt.register_timer(1000, false, move |rt| {
        rt.print("b fired");
        rt.cancel_timer(doomed);
        rt.enqueue_deferred(|rt| {
            rt.print("deferred from b");
            Ok(())
        });
        Ok(())
    })?;

    rt.register_timer(1000, false, |rt| {
        rt.print("c fired");
        Ok(())
    })?;

    rt.enqueue_deferred(|rt| {
        rt.print("immediate deferred");
        Ok(())
    });

    rt.run()?;
    assert_eq!(
        rt.take_output(),
        vec![
            "Main script executed",
            "immediate deferred",
            "interval 1",
            "b fired",
            "deferred from b",
            "c fired",
            "interval 2",
            "interval 3",
        ]
    );
    assert_eq!(rt.now_ms(), 1500);
    assert!(rt.take_callback_failures().is_empty());
    Ok(())
}

#[test]
fn stepping_api_observes_intermediate_states_of_the_same_script() -> Result<()> {
    let mut rt = Runtime::new();
    rt.register_timer(100, false, |rt| {
        rt.print("first");
        Ok(())
    })?;
    rt.register_timer(300, false, |rt| {
        rt.print("second");
        Ok(())
    })?;

    rt.advance_time(100)?;
    assert_eq!(rt.take_output(), vec!["first"]);
    assert_eq!(rt.pending_timers().len(), 1);

    rt.advance_time(100)?;
    assert!(rt.take_output().is_empty());

    rt.flush()?;
    assert_eq!(rt.take_output(), vec!["second"]);
    assert_eq!(rt.now_ms(), 300);
    Ok(())
}
