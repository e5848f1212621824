//! Tree and document tests for civic-dom
//!
//! Identity across destroy/reuse, selector queries and keydown routing.

use std::cell::RefCell;
use std::rc::Rc;

use civic_dom::{Document, DomError, KeyboardEvent, ListenerTarget, NodeId, SelectorList};

fn mount(doc: &mut Document, parent: NodeId, tag: &str) -> NodeId {
    let node = doc.tree_mut().create_element(tag);
    doc.tree_mut().append_child(parent, node).unwrap();
    node
}

#[test]
fn test_document_skeleton() {
    let doc = Document::new("https://designsystem.digital.gov/");
    let tree = doc.tree();
    assert_eq!(tree.tag_name(doc.document_element()), Some("html"));
    assert_eq!(tree.tag_name(doc.head()), Some("head"));
    assert_eq!(tree.tag_name(doc.body()), Some("body"));
    assert!(tree.is_connected(doc.body()));
    assert_eq!(doc.url(), "https://designsystem.digital.gov/");
}

#[test]
fn test_documents_have_distinct_ids() {
    let a = Document::default();
    let b = Document::default();
    assert_ne!(a.id(), b.id());
}

#[test]
fn test_query_selector_all_in_document_order() {
    let mut doc = Document::default();
    let body = doc.body();
    let accordion = mount(&mut doc, body, "usa-accordion");
    let first = mount(&mut doc, accordion, "button");
    let panel = mount(&mut doc, accordion, "div");
    let second = mount(&mut doc, panel, "button");
    doc.tree_mut().set_attr(first, "class", "usa-accordion__button").unwrap();
    doc.tree_mut().set_attr(second, "class", "usa-accordion__button other").unwrap();
    doc.tree_mut().set_attr(second, "aria-controls", "panel-2").unwrap();

    let all = SelectorList::parse(".usa-accordion__button").unwrap();
    assert_eq!(doc.tree().query_selector_all(accordion, &all), vec![first, second]);

    let controlled = SelectorList::parse("button[aria-controls='panel-2']").unwrap();
    assert_eq!(doc.tree().query_selector(accordion, &controlled), Some(second));

    // The root itself is not part of its own query
    let tag = SelectorList::parse("usa-accordion").unwrap();
    assert_eq!(doc.tree().query_selector(accordion, &tag), None);
}

#[test]
fn test_invalid_selectors() {
    for source in ["", "div > p", "a b", "[", "#a#b", ".", "button:hover"] {
        assert!(
            matches!(SelectorList::parse(source), Err(DomError::InvalidSelector(_))),
            "{source:?} should be rejected",
        );
    }
}

#[test]
fn test_destroyed_node_rejects_mutation() {
    let mut doc = Document::default();
    let body = doc.body();
    let node = mount(&mut doc, body, "usa-modal");
    doc.tree_mut().destroy(node).unwrap();

    assert!(matches!(
        doc.tree_mut().set_attr(node, "hidden", ""),
        Err(DomError::StaleNode(n)) if n == node
    ));
    assert!(!doc.focus(node));
}

#[test]
fn test_keydown_bubbles_to_document() {
    let mut doc = Document::default();
    let body = doc.body();
    let dialog = mount(&mut doc, body, "div");
    let button = mount(&mut doc, dialog, "button");
    let seen = Rc::new(RefCell::new(Vec::new()));

    for (label, target) in [("dialog", ListenerTarget::Node(dialog)), ("document", ListenerTarget::Document)] {
        let seen = Rc::clone(&seen);
        doc.add_keydown_listener(
            target,
            Rc::new(move |_: &mut Document, _: &mut KeyboardEvent| seen.borrow_mut().push(label)),
        );
    }

    assert!(doc.focus(button));
    assert!(doc.dispatch_keydown(&mut KeyboardEvent::new("Tab")));
    assert_eq!(*seen.borrow(), ["dialog", "document"]);
}

#[test]
fn test_stop_propagation() {
    let mut doc = Document::default();
    let body = doc.body();
    let dialog = mount(&mut doc, body, "div");
    let calls = Rc::new(RefCell::new(0));

    doc.add_keydown_listener(
        ListenerTarget::Node(dialog),
        Rc::new(|_: &mut Document, event: &mut KeyboardEvent| event.stop_propagation()),
    );
    let counter = Rc::clone(&calls);
    doc.add_keydown_listener(
        ListenerTarget::Document,
        Rc::new(move |_: &mut Document, _: &mut KeyboardEvent| *counter.borrow_mut() += 1),
    );

    doc.dispatch_keydown(&mut KeyboardEvent::new("Escape").with_target(dialog));
    assert_eq!(*calls.borrow(), 0);
}

#[test]
fn test_listener_survives_target_removal() {
    let mut doc = Document::default();
    let body = doc.body();
    let dialog = mount(&mut doc, body, "div");
    let id = doc.add_keydown_listener(
        ListenerTarget::Node(dialog),
        Rc::new(|_: &mut Document, _: &mut KeyboardEvent| {}),
    );
    doc.tree_mut().destroy(dialog).unwrap();

    assert!(doc.remove_listener(id));
    assert!(!doc.remove_listener(id));
    assert_eq!(doc.listener_count(), 0);
}
