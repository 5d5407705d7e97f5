use sapling::{
	attr, children, element,
	memory::{DomError, Stats},
	on, on_handler, reconcile, text, value, Event, Handler, Node, Options, Platform, Reconciler,
};
use std::{cell::Cell, rc::Rc};

mod common;
use common::document;

fn counter_label(count: i32) -> Node {
	element("div", vec![attr("class", "counter")], children![format!("Count: {}", count)])
}

#[test]
fn identical_rerender_is_a_no_op() {
	let (document, root) = document();
	let clicked = Handler::new(|_| ());
	let tree = element(
		"div",
		vec![attr("id", "app"), on_handler("click", &clicked)],
		children![
			element("h1", vec![], children!["Hello!"]),
			element("input", vec![attr("type", "text"), value("typed")], children![]),
			"trailing text",
		],
	);

	let live = reconcile(&document, &tree, None, &root).unwrap();
	document.reset_stats();

	let again = reconcile(&document, &tree.clone(), Some(&tree), &root).unwrap();
	assert_eq!(again, live);
	assert_eq!(document.stats(), Stats::default());
}

#[test]
fn type_change_replaces_the_root() {
	let (document, root) = document();
	let old = element("div", vec![], children!["content"]);
	let old_live = reconcile(&document, &old, None, &root).unwrap();
	document.reset_stats();

	let new = element("span", vec![], children!["content"]);
	let new_live = reconcile(&document, &new, Some(&old), &root).unwrap();

	assert_ne!(new_live, old_live);
	assert_eq!(document.tag(new_live).as_deref(), Some("span"));
	assert_eq!(document.children(root), [new_live]);
	assert_eq!(document.parent(old_live), None);
	assert_eq!(document.stats().children_replaced, 1);
	assert_eq!(document.stats().children_appended, 1, "only the new text child is appended");
}

#[test]
fn removed_attribute_is_removed_once() {
	let (document, root) = document();
	let old = element("div", vec![attr("id", "a"), attr("class", "b")], children![]);
	let live = reconcile(&document, &old, None, &root).unwrap();
	document.reset_stats();

	let new = element("div", vec![attr("id", "a")], children![]);
	reconcile(&document, &new, Some(&old), &root).unwrap();

	let stats = document.stats();
	assert_eq!(stats.attributes_removed, 1);
	assert_eq!(stats.attributes_set, 0);
	assert_eq!(document.attribute(live, "class"), None);
	assert_eq!(document.attribute(live, "id").as_deref(), Some("a"));
}

#[test]
fn changed_attribute_is_set_once() {
	let (document, root) = document();
	let old = element("div", vec![attr("id", "a")], children![]);
	let live = reconcile(&document, &old, None, &root).unwrap();
	document.reset_stats();

	let new = element("div", vec![attr("id", "z")], children![]);
	reconcile(&document, &new, Some(&old), &root).unwrap();

	let stats = document.stats();
	assert_eq!(stats.attributes_set, 1);
	assert_eq!(stats.attributes_removed, 0);
	assert_eq!(document.attribute(live, "id").as_deref(), Some("z"));
}

#[test]
fn text_is_updated_in_place() {
	let (document, root) = document();
	let old = counter_label(0);
	let live = reconcile(&document, &old, None, &root).unwrap();
	let text_node = document.children(live)[0];
	document.reset_stats();

	let new = counter_label(1);
	assert_eq!(reconcile(&document, &new, Some(&old), &root).unwrap(), live);

	assert_eq!(document.children(live), [text_node]);
	assert_eq!(document.text(text_node).as_deref(), Some("Count: 1"));
	assert_eq!(
		document.stats(),
		Stats {
			texts_updated: 1,
			..Stats::default()
		}
	);
}

#[test]
fn changed_handler_is_rebound_once() {
	let (document, root) = document();
	let old = element("button", vec![on("click", |_| ())], children!["+"]);
	let live = reconcile(&document, &old, None, &root).unwrap();
	document.reset_stats();

	let new = element("button", vec![on("click", |_| ())], children!["+"]);
	reconcile(&document, &new, Some(&old), &root).unwrap();

	let stats = document.stats();
	assert_eq!(stats.listeners_removed, 1);
	assert_eq!(stats.listeners_added, 1);
	assert_eq!(document.listener_count(live, "click"), 1);
}

#[test]
fn identical_handler_is_left_alone() {
	let (document, root) = document();
	let handler = Handler::new(|_| ());
	let old = element("button", vec![on_handler("click", &handler), attr("id", "a")], children![]);
	reconcile(&document, &old, None, &root).unwrap();
	document.reset_stats();

	let new = element("button", vec![on_handler("click", &handler), attr("id", "b")], children![]);
	reconcile(&document, &new, Some(&old), &root).unwrap();

	let stats = document.stats();
	assert_eq!(stats.listeners_removed, 0);
	assert_eq!(stats.listeners_added, 0);
	assert_eq!(stats.attributes_set, 1);
}

#[test]
fn removed_handler_is_unregistered() {
	let (document, root) = document();
	let old = element("button", vec![on("click", |_| ())], children![]);
	let live = reconcile(&document, &old, None, &root).unwrap();
	document.reset_stats();

	let new = element("button", vec![], children![]);
	reconcile(&document, &new, Some(&old), &root).unwrap();

	assert_eq!(document.stats().listeners_removed, 1);
	assert_eq!(document.listener_count(live, "click"), 0);
}

#[test]
fn controlled_value_updates_the_field() {
	let (document, root) = document();
	let old = element("input", vec![value("a")], children![]);
	let live = reconcile(&document, &old, None, &root).unwrap();
	assert_eq!(document.field_value(live).as_deref(), Some("a"));
	document.reset_stats();

	let new = element("input", vec![value("b")], children![]);
	reconcile(&document, &new, Some(&old), &root).unwrap();

	assert_eq!(document.field_value(live).as_deref(), Some("b"));
	assert_eq!(document.attribute(live, "value"), None);
	assert_eq!(document.stats().field_values_set, 1);
	assert_eq!(document.stats().attributes_set, 0);
}

#[test]
fn value_prop_and_value_attribute_share_a_key() {
	let (document, root) = document();
	let old = element("div", vec![value("x")], children![]);
	let live = reconcile(&document, &old, None, &root).unwrap();
	document.reset_stats();

	let new = element("div", vec![attr("value", "y")], children![]);
	reconcile(&document, &new, Some(&old), &root).unwrap();
	assert_eq!(document.attribute(live, "value").as_deref(), Some("y"));
	assert_eq!(document.stats().attributes_set, 1);
	assert_eq!(document.stats().attributes_removed, 0);

	reconcile(&document, &old, Some(&new), &root).unwrap();
	assert_eq!(document.attribute(live, "value").as_deref(), Some("x"));
	assert_eq!(document.stats().attributes_removed, 0);
}

#[test]
fn field_value_and_value_attribute_stay_apart_on_inputs() {
	let (document, root) = document();
	let old = element("input", vec![value("typed")], children![]);
	let live = reconcile(&document, &old, None, &root).unwrap();

	let new = element("input", vec![attr("value", "default")], children![]);
	reconcile(&document, &new, Some(&old), &root).unwrap();
	assert_eq!(document.attribute(live, "value").as_deref(), Some("default"));
	assert_eq!(document.field_value(live).as_deref(), Some("typed"));
}

#[test]
fn duplicate_handlers_resolve_to_the_last() {
	let (document, root) = document();
	let hits = Rc::new(Cell::new(0));
	let counting = |n: u32| {
		let hits = Rc::clone(&hits);
		Handler::new(move |_| hits.set(hits.get() + n))
	};
	let (a, a2, b) = (counting(1), counting(10), counting(100));

	let old = element("button", vec![on_handler("click", &a), on_handler("click", &b)], children![]);
	let live = reconcile(&document, &old, None, &root).unwrap();
	assert_eq!(document.listener_count(live, "click"), 1);

	let new = element("button", vec![on_handler("click", &a2), on_handler("click", &b)], children![]);
	reconcile(&document, &new, Some(&old), &root).unwrap();
	assert_eq!(document.listener_count(live, "click"), 1);
	assert_eq!(document.dispatch(live, &Event::new("click")), 1);
	assert_eq!(hits.get(), 100);
}

#[test]
fn missing_live_node_is_recreated() {
	let (document, root) = document();
	let old = element("p", vec![], children!["a"]);
	let stale = reconcile(&document, &old, None, &root).unwrap();
	document.remove_child(&root, &stale).unwrap();

	let options = Options::default();
	let mut reconciler = Reconciler::new(&document, &options);
	let live = reconciler.reconcile(&element("p", vec![], children!["b"]), Some(&old), &root, 0).unwrap();

	assert_ne!(live, stale);
	assert_eq!(reconciler.stats().created, 1);
	assert_eq!(document.children(root), [live]);
	assert_eq!(document.text_content(live), "b");
}

#[test]
fn growing_children_are_appended() {
	let (document, root) = document();
	let old = element("ul", vec![], children![element("li", vec![], children!["a"])]);
	let live = reconcile(&document, &old, None, &root).unwrap();
	let first = document.children(live)[0];
	document.reset_stats();

	let new = element("ul", vec![], children![element("li", vec![], children!["a"]), element("li", vec![], children!["b"]), "c"]);
	reconcile(&document, &new, Some(&old), &root).unwrap();

	let children = document.children(live);
	assert_eq!(children.len(), 3);
	assert_eq!(children[0], first);
	assert_eq!(document.text_content(live), "abc");
	assert_eq!(document.stats().children_appended, 3, "two children of <ul>, one text inside the new <li>");
}

#[test]
fn excess_children_are_pruned() {
	let (document, root) = document();
	let old = element(
		"ul",
		vec![],
		children![
			element("li", vec![], children!["a"]),
			element("li", vec![on("click", |_| ())], children!["b"]),
			"c",
		],
	);
	let live = reconcile(&document, &old, None, &root).unwrap();
	document.reset_stats();

	let new = element("ul", vec![], children![element("li", vec![], children!["a"])]);
	reconcile(&document, &new, Some(&old), &root).unwrap();

	assert_eq!(document.children(live).len(), 1);
	assert_eq!(document.text_content(live), "a");
	let stats = document.stats();
	assert_eq!(stats.children_removed, 2);
	assert_eq!(stats.listeners_removed, 1);
}

#[test]
fn excess_children_can_be_left_in_place() {
	let (document, root) = document();
	let options = Options {
		prune_excess: false,
		..Options::default()
	};
	let old = element("p", vec![], children!["a", "b"]);
	let live = Reconciler::new(&document, &options).reconcile(&old, None, &root, 0).unwrap();

	let new = element("p", vec![], children!["a"]);
	Reconciler::new(&document, &options).reconcile(&new, Some(&old), &root, 0).unwrap();

	assert_eq!(document.text_content(live), "ab");
}

#[test]
fn reordering_patches_every_position() {
	let (document, root) = document();
	let item = |t: &str| element("li", vec![], children![t]);
	let old = element("ul", vec![], children![item("a"), item("b")]);
	let live = reconcile(&document, &old, None, &root).unwrap();
	let items = document.children(live);
	document.reset_stats();

	let new = element("ul", vec![], children![item("b"), item("a")]);
	reconcile(&document, &new, Some(&old), &root).unwrap();

	assert_eq!(document.children(live), items);
	assert_eq!(document.text_content(live), "ba");
	assert_eq!(
		document.stats(),
		Stats {
			texts_updated: 2,
			..Stats::default()
		}
	);
}

#[test]
fn element_and_text_replace_each_other() {
	let (document, root) = document();
	let old = element("div", vec![], children![element("b", vec![on("click", |_| ())], children!["bold"])]);
	let live = reconcile(&document, &old, None, &root).unwrap();
	document.reset_stats();

	let new = element("div", vec![], children![text("plain")]);
	reconcile(&document, &new, Some(&old), &root).unwrap();
	assert_eq!(document.markup(live), "<div>plain</div>");
	assert_eq!(document.stats().children_replaced, 1);
	assert_eq!(document.stats().listeners_removed, 1);

	document.reset_stats();
	reconcile(&document, &old, Some(&new), &root).unwrap();
	assert_eq!(document.markup(live), "<div><b @click>bold</b></div>");
	assert_eq!(document.stats().children_replaced, 1);
}

#[test]
fn replacement_unbinds_discarded_listeners() {
	let (document, root) = document();
	let old = element("form", vec![on("submit", |_| ())], children![element("button", vec![on("click", |_| ())], children![])]);
	let old_live = reconcile(&document, &old, None, &root).unwrap();
	let button = document.children(old_live)[0];
	document.reset_stats();

	let new = element("section", vec![], children![]);
	reconcile(&document, &new, Some(&old), &root).unwrap();

	assert_eq!(document.stats().listeners_removed, 2);
	assert_eq!(document.listener_count(old_live, "submit"), 0);
	assert_eq!(document.listener_count(button, "click"), 0);
}

#[test]
fn depth_limit_stops_descent() {
	let (document, root) = document();
	let options = Options {
		depth_limit: 1,
		..Options::default()
	};
	let tree = |t: &str| element("div", vec![], children![element("p", vec![], children![t])]);
	let old = tree("a");
	let live = reconcile(&document, &old, None, &root).unwrap();

	Reconciler::new(&document, &options).reconcile(&tree("b"), Some(&old), &root, 0).unwrap();
	assert_eq!(document.text_content(live), "a");
}

#[test]
fn depth_limit_stops_creation() {
	let (document, root) = document();
	let options = Options {
		depth_limit: 1,
		..Options::default()
	};
	let tree = element("div", vec![], children![element("p", vec![], children!["deep"])]);
	let live = Reconciler::new(&document, &options).reconcile(&tree, None, &root, 0).unwrap();
	assert_eq!(document.markup(live), "<div><p></p></div>");

	let replacement = element("section", vec![], children![element("p", vec![], children!["deep"])]);
	let live = Reconciler::new(&document, &options).reconcile(&replacement, Some(&tree), &root, 0).unwrap();
	assert_eq!(document.markup(live), "<section><p></p></section>");
}

#[test]
fn platform_errors_propagate() {
	let (document, root) = document();
	assert_eq!(
		reconcile(&document, &element("not a tag", vec![], children![]), None, &root),
		Err(DomError::InvalidTagName("not a tag".to_owned()))
	);

	let text_node = document.create_text("leaf").unwrap();
	assert_eq!(
		reconcile(&document, &text("x"), None, &text_node),
		Err(DomError::NotAnElement(text_node))
	);
}

#[test]
fn pass_stats_are_counted() {
	let (document, root) = document();
	let options = Options::default();
	let old = element("div", vec![], children!["a", element("p", vec![], children![]), "c"]);
	let mut reconciler = Reconciler::new(&document, &options);
	reconciler.reconcile(&old, None, &root, 0).unwrap();
	assert_eq!(reconciler.stats().created, 1);

	let new = element("div", vec![], children!["b", element("span", vec![], children![])]);
	let mut reconciler = Reconciler::new(&document, &options);
	reconciler.reconcile(&new, Some(&old), &root, 0).unwrap();
	let stats = reconciler.stats();
	assert_eq!(stats.texts_updated, 1);
	assert_eq!(stats.replaced, 1);
	assert_eq!(stats.removed, 1);
	assert_eq!(stats.patched, 1);
}
