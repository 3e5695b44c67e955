//! `wrec keys` – list the accepted control values.

use wrec_core::filter::{MatchMode, MIME_FILTERS};
use wrec_core::sort::SortKey;

pub fn run_keys() {
    println!("Sort keys:");
    for key in SortKey::ALL {
        println!("  {:<10} {}", key.as_str(), key.display_name());
    }
    println!();
    println!("Match modes:");
    for mode in MatchMode::ALL {
        println!("  {}", mode);
    }
    println!();
    println!("Media types (--type):");
    for preset in MIME_FILTERS {
        let filter = if preset.filter.is_empty() { "(any)" } else { preset.filter };
        println!("  {:<12} {}", preset.name, filter);
    }
}
