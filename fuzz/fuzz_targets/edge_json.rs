#![no_main]

use genealogy_core::{EdgeTable, GenealogyConfig, Pipeline};
use libfuzzer_sys::fuzz_target;

// Arbitrary JSON must either be rejected or run through every stage
// without panicking; a pruned graph must prune to itself.
fuzz_target!(|data: &[u8]| {
    let Ok(table) = EdgeTable::from_json_reader(data).map(|t| t.scoped("fuzz")) else {
        return;
    };
    let config = GenealogyConfig::default();
    let removal = config.removal_status;
    if let Ok(out) = Pipeline::new(config).run(&table, "fuzz") {
        let mut again = out.graph.clone();
        assert!(again.prune_removed(removal).is_noop());
        assert!(out.info.len() <= out.graph.node_count());
    }
});
