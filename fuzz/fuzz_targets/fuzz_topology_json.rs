#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    // Parse arbitrary JSON as a group tree. This tests:
    // - serde_json deserialization robustness
    // - Cycle and orphan rejection in tree validation
    // - Root detection with duplicate or missing groups
    if let Ok(topology) = canopy_topology::from_json(text) {
        // Anything that validated must be a connected rooted tree:
        // every group is reachable from the root.
        let root = topology.root();
        for group in topology.groups() {
            if group != root {
                topology.find_path(root, group).unwrap();
            }
        }
    }
});
