use sapling::memory::{Document, NodeId};
use std::sync::Once;

static LOG_INITIALIZED: Once = Once::new();

/// Installs a global subscriber once per test binary. Filter with `RUST_LOG`.
pub fn init_logging() {
	LOG_INITIALIZED.call_once(|| {
		// Another subscriber may already be installed.
		let _ = tracing_subscriber::fmt()
			.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
			.with_test_writer()
			.try_init();
	});
}

/// A fresh document with a `<div id="root">` container.
pub fn document() -> (Document, NodeId) {
	init_logging();
	let document = Document::new();
	let root = document.create_root("div").unwrap();
	(document, root)
}
