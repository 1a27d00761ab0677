//! Example: Slot distribution and event retargeting
//!
//! Run with `RUST_LOG=fos_shadow=debug` to see every distribution pass.

use fos_shadow::{AssignedNodesOptions, Event, EventInit, Listener, ShadowTree};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut tree = ShadowTree::new();
    println!("fOS Shadow v{}", fos_shadow::VERSION);

    // <x-card> with a named title slot and a default slot
    let card = tree.create_element("x-card");
    tree.append_child(tree.document(), card)?;
    let root = tree.attach_shadow(card)?;
    let header = tree.create_element("header");
    let title_slot = tree.create_element("slot");
    tree.set_attribute(title_slot, "name", "title")?;
    tree.append_child(header, title_slot)?;
    let body_slot = tree.create_element("slot");
    tree.append(root, vec![header.into(), body_slot.into()])?;

    let title = tree.create_element("h2");
    tree.set_slot(title, "title")?;
    tree.append(title, vec!["Shadow trees".into()])?;
    tree.append(card, vec![title.into(), "Light content".into()])?;

    let flat = AssignedNodesOptions::default();
    println!("title slot:   {:?}", tree.assigned_nodes(title_slot, flat));
    println!("default slot: {:?}", tree.assigned_nodes(body_slot, flat));
    println!("rendered:     {:?}", tree.composed_text_content(card));

    let report = Listener::new(|_, event| {
        println!("document saw {} at {:?}", event.event_type(), event.target());
    });
    tree.add_event_listener(tree.document(), "click", &report, false);

    let button = tree.create_element("button");
    tree.append_child(root, button)?;
    let init = EventInit { bubbles: true, ..Default::default() };
    tree.dispatch_event(button.into(), &mut Event::new("click", init));

    Ok(())
}
