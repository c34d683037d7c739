#[macro_export]
macro_rules! debug_log {
	($($arg:tt)*) => {{
		#[cfg(debug_assertions)]
		{
			eprintln!($($arg)*);
		}
	}};
}

/// Non-fatal warning with a timestamp. Used for per-file failures that must
/// never abort a walk, cache build, or pack.
#[macro_export]
macro_rules! warn_log {
	($($arg:tt)*) => {{
		eprintln!(
			"[promptpack] {} WARN: {}",
			::chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
			format!($($arg)*)
		);
	}};
}

pub mod batcher;
pub mod cache;
pub mod config;
pub mod ignore_rules;
pub mod language;
pub mod render;
pub mod tokenizer;
pub mod walker;
pub mod watcher;
