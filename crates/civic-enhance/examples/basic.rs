//! Example: enhance a modal dialog and walk it through its lifecycle
//!
//! Run with `RUST_LOG=civic_enhance=debug` to see each stage.

use civic_enhance::behaviors::ModalBehavior;
use civic_enhance::dom::KeyboardEvent;
use civic_enhance::{ComponentDefinition, Config, Page};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut page = Page::new(Config::default(), "https://designsystem.digital.gov/components/modal/?civic-debug");
    page.define("usa-modal", ComponentDefinition::new("modal").with_behavior(ModalBehavior::shared()))?;

    let doc = page.document_mut();
    let body = doc.body();
    let modal = doc.tree_mut().create_element("usa-modal");
    let close = doc.tree_mut().create_element("button");
    let confirm = doc.tree_mut().create_element("button");
    doc.tree_mut().set_attr(modal, "hidden", "")?;
    doc.tree_mut().append_child(modal, close)?;
    doc.tree_mut().append_child(modal, confirm)?;
    doc.tree_mut().append_child(body, modal)?;

    page.connect(modal)?;
    let ran = page.run_until_idle();
    println!("Civic Enhance v{}: ran {ran} scheduled tasks", civic_enhance::VERSION);
    println!("focused: {:?}", page.document().active_element());

    page.document_mut().dispatch_keydown(&mut KeyboardEvent::new("Escape"));
    println!("hidden after Escape: {}", page.document().tree().has_attr(modal, "hidden"));

    page.disconnect(modal);
    println!("{}", page.snapshot().to_json()?);
    Ok(())
}
